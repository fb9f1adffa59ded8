// tests/integration_tests.rs
//
// End-to-end tests for the public batch API: decode sources, run the full
// pipeline, and read the resulting archive back to verify its contents.

use bulk_resizer::{
    resize_batch, BackgroundStyle, BatchOptions, FitMode, FolderStrategy, JobStatus, OutputFormat,
    SizeSpec, Source,
};
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::io::{Cursor, Read};

fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba(pixel)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn archive_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

fn archive_entry(archive: &[u8], name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
    let mut file = zip.by_name(name).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    bytes
}

#[test]
fn two_sources_two_sizes_yield_four_entries() {
    let sources = vec![
        Source::decode("src-a", "A.png", &png_bytes(1000, 1000, [10, 20, 30, 255])).unwrap(),
        Source::decode("src-b", "B.png", &png_bytes(2000, 1000, [40, 50, 60, 255])).unwrap(),
    ];
    let sizes = vec![SizeSpec::custom(500, 500), SizeSpec::custom(800, 400)];
    let options = BatchOptions {
        folder_strategy: FolderStrategy::Flat,
        ..BatchOptions::default()
    };

    let output = resize_batch(&sources, &sizes, &options).unwrap();

    assert_eq!(output.jobs.len(), 4);
    assert!(output.jobs.iter().all(|j| j.status == JobStatus::Done));

    let mut names = archive_names(&output.archive);
    names.sort();
    assert_eq!(
        names,
        vec![
            "A_500x500.png",
            "A_800x400.png",
            "B_500x500.png",
            "B_800x400.png",
        ]
    );
}

#[test]
fn by_size_layout_groups_entries_under_dimension_folders() {
    let sources =
        vec![Source::decode("a", "art.png", &png_bytes(64, 64, [1, 2, 3, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(32, 32), SizeSpec::custom(16, 48)];

    let output = resize_batch(&sources, &sizes, &BatchOptions::default()).unwrap();
    let mut names = archive_names(&output.archive);
    names.sort();
    assert_eq!(names, vec!["16x48/art_16x48.png", "32x32/art_32x32.png"]);
}

#[test]
fn archive_entries_decode_to_target_dimensions() {
    let sources =
        vec![Source::decode("a", "photo.png", &png_bytes(120, 80, [200, 10, 10, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(60, 60)];
    let options = BatchOptions {
        folder_strategy: FolderStrategy::Flat,
        mode: FitMode::Stretch,
        ..BatchOptions::default()
    };

    let output = resize_batch(&sources, &sizes, &options).unwrap();
    let entry = archive_entry(&output.archive, "photo_60x60.png");
    let decoded = image::load_from_memory(&entry).unwrap();
    assert_eq!(decoded.dimensions(), (60, 60));
}

#[test]
fn png_outputs_carry_a_phys_chunk_at_requested_dpi() {
    let sources =
        vec![Source::decode("a", "a.png", &png_bytes(50, 50, [0, 0, 0, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(25, 25)];
    let options = BatchOptions {
        folder_strategy: FolderStrategy::Flat,
        dpi: Some(300),
        ..BatchOptions::default()
    };

    let output = resize_batch(&sources, &sizes, &options).unwrap();
    let entry = archive_entry(&output.archive, "a_25x25.png");

    let pos = entry
        .windows(4)
        .position(|w| w == b"pHYs")
        .expect("pHYs chunk present");
    let ppm = u32::from_be_bytes(entry[pos + 4..pos + 8].try_into().unwrap());
    assert_eq!(ppm, 11811); // 300 DPI
    assert_eq!(entry[pos + 12], 1); // meters
}

#[test]
fn jpeg_batch_produces_jfif_tagged_jpg_entries() {
    let sources =
        vec![Source::decode("a", "a.png", &png_bytes(40, 40, [128, 64, 32, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(20, 20)];
    let options = BatchOptions {
        folder_strategy: FolderStrategy::Flat,
        format: OutputFormat::Jpeg { quality: 90 },
        dpi: Some(150),
        ..BatchOptions::default()
    };

    let output = resize_batch(&sources, &sizes, &options).unwrap();
    let entry = archive_entry(&output.archive, "a_20x20.jpg");
    assert_eq!(&entry[..2], [0xFF, 0xD8]);
}

#[test]
fn custom_pattern_and_profile_are_rendered() {
    let sources =
        vec![Source::decode("a", "mug.png", &png_bytes(30, 30, [7, 7, 7, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(10, 10)];
    let options = BatchOptions {
        folder_strategy: FolderStrategy::Flat,
        filename_pattern: "{profile}-{basename}-{width}".to_string(),
        profile: "summer".to_string(),
        ..BatchOptions::default()
    };

    let output = resize_batch(&sources, &sizes, &options).unwrap();
    assert_eq!(archive_names(&output.archive), vec!["summer-mug-10.png"]);
}

#[test]
fn identical_batches_produce_identical_archives() {
    let sources =
        vec![Source::decode("a", "a.png", &png_bytes(48, 48, [90, 90, 90, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(24, 24), SizeSpec::custom(12, 36)];

    let options = BatchOptions::default();
    let first = resize_batch(&sources, &sizes, &options).unwrap();
    let second = resize_batch(&sources, &sizes, &options).unwrap();
    assert_eq!(first.archive, second.archive);
}

#[test]
fn contain_margins_are_filled_when_jpeg_forces_opacity() {
    // A wide red image contained into a square with a solid blue background.
    let sources =
        vec![Source::decode("a", "wide.png", &png_bytes(100, 20, [255, 0, 0, 255])).unwrap()];
    let sizes = vec![SizeSpec::custom(50, 50)];
    let options = BatchOptions {
        folder_strategy: FolderStrategy::Flat,
        format: OutputFormat::Jpeg { quality: 95 },
        background: BackgroundStyle::Solid([0, 0, 255]),
        dpi: None,
        ..BatchOptions::default()
    };

    let output = resize_batch(&sources, &sizes, &options).unwrap();
    let entry = archive_entry(&output.archive, "wide_50x50.jpg");
    let decoded = image::load_from_memory(&entry).unwrap().to_rgb8();
    // Top margin pixel should be (approximately) blue.
    let top = decoded.get_pixel(25, 2);
    assert!(top[2] > 200 && top[0] < 60, "margin pixel was {:?}", top);
}
