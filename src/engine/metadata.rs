// src/engine/metadata.rs
//
// Print-resolution tagging by direct container rewriting.
//
// PNG: walk the chunk stream, overwrite an existing pHYs chunk in place or
// splice a fresh one directly after IHDR, recomputing the chunk CRC.
// JPEG: overwrite the density fields of the JFIF APP0 segment.
//
// Both paths are deterministic and total: bytes that do not match the
// expected container shape are returned unchanged.

use crate::ops::OutputFormat;
use tracing::warn;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const PHYS_TYPE: [u8; 4] = *b"pHYs";
const METERS_PER_INCH: f64 = 0.0254;

/// Convert DPI to the pHYs pixels-per-meter value.
///
/// Rounding choice: `round(dpi / 0.0254)`; 300 DPI -> 11811. The alternative
/// `round(dpi * 39.3701)` agrees within 1 for standard DPI values.
pub fn pixels_per_meter(dpi: u16) -> u32 {
    (dpi as f64 / METERS_PER_INCH).round() as u32
}

/// Standard reflected CRC-32 as specified by the PNG standard
/// (polynomial 0xEDB88320, initial value all-ones, final XOR all-ones).
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut c: u32 = !0;
    for &byte in bytes {
        c ^= byte as u32;
        for _ in 0..8 {
            c = (c >> 1) ^ (0xEDB8_8320 & (c & 1).wrapping_neg());
        }
    }
    !c
}

/// Rewrite or insert print-resolution metadata in an encoded image.
///
/// Byte-exact and deterministic. Inputs that lack the expected container
/// structure (bad PNG signature, JPEG without a JFIF APP0 segment) are
/// returned unchanged; the JFIF case logs a warning since the caller asked
/// for a tag that cannot be applied.
pub fn tag_resolution(bytes: Vec<u8>, format: OutputFormat, dpi: u16) -> Vec<u8> {
    match format {
        OutputFormat::Png => tag_png(bytes, dpi),
        OutputFormat::Jpeg { .. } => tag_jpeg(bytes, dpi),
    }
}

/// The 9 pHYs data bytes: X ppm, Y ppm (big-endian u32 each), unit byte 1 (meter).
fn phys_payload(dpi: u16) -> [u8; 9] {
    let ppm = pixels_per_meter(dpi).to_be_bytes();
    let mut data = [0u8; 9];
    data[0..4].copy_from_slice(&ppm);
    data[4..8].copy_from_slice(&ppm);
    data[8] = 1;
    data
}

fn tag_png(mut bytes: Vec<u8>, dpi: u16) -> Vec<u8> {
    if bytes.len() < PNG_SIGNATURE.len() || bytes[..8] != PNG_SIGNATURE {
        return bytes;
    }

    let payload = phys_payload(dpi);

    // Walk chunks: [4-byte BE length][4-byte type][data][4-byte CRC].
    let mut offset = PNG_SIGNATURE.len();
    let mut after_ihdr: Option<usize> = None;
    while offset + 8 <= bytes.len() {
        let length = u32::from_be_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]) as usize;
        let chunk_type = &bytes[offset + 4..offset + 8];
        let total = match length.checked_add(12) {
            Some(t) if offset + t <= bytes.len() => t,
            // Truncated or corrupt chunk: leave the stream untouched.
            _ => return bytes,
        };

        if chunk_type == b"IHDR" {
            after_ihdr = Some(offset + total);
        }

        if chunk_type == PHYS_TYPE {
            // A malformed pHYs (wrong length) is left alone rather than
            // shadowed by a spliced duplicate.
            if length != 9 {
                return bytes;
            }
            // Overwrite the 9 data bytes in place and recompute the CRC over
            // type + data.
            let data_start = offset + 8;
            bytes[data_start..data_start + 9].copy_from_slice(&payload);
            let crc = crc32(&bytes[offset + 4..data_start + 9]);
            bytes[data_start + 9..data_start + 13].copy_from_slice(&crc.to_be_bytes());
            return bytes;
        }

        offset += total;
    }

    // No pHYs chunk: synthesize one and splice it directly after IHDR.
    let Some(insert_at) = after_ihdr else {
        return bytes;
    };

    let mut chunk = [0u8; 21];
    chunk[0..4].copy_from_slice(&9u32.to_be_bytes());
    chunk[4..8].copy_from_slice(&PHYS_TYPE);
    chunk[8..17].copy_from_slice(&payload);
    let crc = crc32(&chunk[4..17]);
    chunk[17..21].copy_from_slice(&crc.to_be_bytes());

    let mut out = Vec::with_capacity(bytes.len() + chunk.len());
    out.extend_from_slice(&bytes[..insert_at]);
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&bytes[insert_at..]);
    out
}

fn tag_jpeg(mut bytes: Vec<u8>, dpi: u16) -> Vec<u8> {
    // SOI marker
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return bytes;
    }

    let mut offset = 2;
    while offset + 4 <= bytes.len() {
        if bytes[offset] != 0xFF {
            break;
        }
        // Fill bytes before a marker are legal.
        while offset + 1 < bytes.len() && bytes[offset + 1] == 0xFF {
            offset += 1;
        }
        let marker = bytes[offset + 1];
        match marker {
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD7 => {
                offset += 2;
                continue;
            }
            // Entropy-coded data follows SOS; a JFIF segment must precede it.
            0xDA | 0xD9 => break,
            _ => {}
        }

        if offset + 4 > bytes.len() {
            break;
        }
        let length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        if length < 2 || offset + 2 + length > bytes.len() {
            break;
        }

        // APP0 with the "JFIF\0" identifier carries the density fields:
        // [identifier:5][version:2][units:1][x-density:2][y-density:2].
        if marker == 0xE0 && length >= 14 && &bytes[offset + 4..offset + 9] == b"JFIF\0" {
            let density = dpi.to_be_bytes();
            bytes[offset + 11] = 1; // dots per inch
            bytes[offset + 12..offset + 14].copy_from_slice(&density);
            bytes[offset + 14..offset + 16].copy_from_slice(&density);
            return bytes;
        }

        offset += 2 + length;
    }

    // Known limitation, not corruption: a JPEG without a JFIF APP0 segment
    // is passed through unchanged.
    warn!("jpeg has no JFIF APP0 segment; dpi tag skipped");
    bytes
}
