// src/ops.rs
//
// Pipeline option types.
// These are cheap to create and store - the expensive work happens in the engine.

use crate::error::{ResizerError, Result};
use std::borrow::Cow;

/// Geometric policy governing how a source maps into the target rectangle.
///
/// Design principle: every mode yields a buffer of exactly the target
/// dimensions; only the drawn region differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitMode {
    /// Scale uniformly so the source fits entirely inside the target, centered.
    /// The uncovered margin stays transparent (or takes the background color
    /// when the output cannot carry transparency).
    Contain,

    /// Scale uniformly so the source fully covers the target, centered,
    /// cropping overflow.
    Cover,

    /// Draw across the full target rectangle, ignoring aspect ratio.
    Stretch,

    /// Same geometry as Contain, but the margin is always filled with the
    /// explicit background color.
    Pad,
}

impl Default for FitMode {
    fn default() -> Self {
        // Print workflows want the full artwork visible; see DESIGN.md.
        FitMode::Contain
    }
}

/// Output container format, consumed exhaustively by the encoder and the
/// metadata codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpeg",
        }
    }

    /// PNG carries an alpha channel; JPEG does not.
    pub fn supports_transparency(&self) -> bool {
        matches!(self, Self::Png)
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Png
    }
}

/// Margin fill for Contain and flattening color for formats without alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundStyle {
    /// Leave uncovered pixels transparent when the format allows it.
    Transparent,
    /// Fill with a solid RGB color.
    Solid([u8; 3]),
}

impl BackgroundStyle {
    pub const WHITE: BackgroundStyle = BackgroundStyle::Solid([255, 255, 255]);

    /// The concrete fill color, substituting white when a solid color is
    /// required but none was chosen.
    pub fn solid_or_white(&self) -> [u8; 3] {
        match self {
            Self::Solid(rgb) => *rgb,
            Self::Transparent => [255, 255, 255],
        }
    }
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        BackgroundStyle::Transparent
    }
}

/// Whether a size came from the built-in catalog or was user-added.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeOrigin {
    Preset,
    Custom,
}

/// One target pixel size. Ids are unique within a catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizeSpec {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub label: Option<Cow<'static, str>>,
    pub origin: SizeOrigin,
}

impl SizeSpec {
    pub fn preset(id: &'static str, width: u32, height: u32, label: &'static str) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            label: Some(Cow::Borrowed(label)),
            origin: SizeOrigin::Preset,
        }
    }

    pub fn custom(width: u32, height: u32) -> Self {
        Self {
            id: format!("custom-{width}x{height}"),
            width,
            height,
            label: Some(Cow::Borrowed("Custom")),
            origin: SizeOrigin::Custom,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ResizerError::invalid_size(self.width, self.height));
        }
        crate::engine::check_dimensions(self.width, self.height)
    }
}

/// Built-in size presets plus user-added custom sizes; pure data.
#[derive(Clone, Debug)]
pub struct SizeCatalog {
    sizes: Vec<SizeSpec>,
}

impl SizeCatalog {
    /// Catalog pre-loaded with the print-on-demand presets.
    pub fn with_presets() -> Self {
        Self {
            sizes: vec![
                SizeSpec::preset("pod-default-4500x5400", 4500, 5400, "POD Default"),
                SizeSpec::preset("tumbler-wrap-2790x2460", 2790, 2460, "Tumbler Wrap"),
                SizeSpec::preset("square-1024x1024", 1024, 1024, "Square"),
                SizeSpec::preset("standard-mockup-2000x1500", 2000, 1500, "Standard Mockup"),
                SizeSpec::preset("mug-swiftpod-2625x1050", 2625, 1050, "11oz Mug (SwiftPOD)"),
                SizeSpec::preset("mug-district-2475x1156", 2475, 1156, "11oz Mug (District)"),
            ],
        }
    }

    pub fn empty() -> Self {
        Self { sizes: Vec::new() }
    }

    pub fn sizes(&self) -> &[SizeSpec] {
        &self.sizes
    }

    pub fn get(&self, id: &str) -> Option<&SizeSpec> {
        self.sizes.iter().find(|s| s.id == id)
    }

    /// Add a user-defined size. Rejects zero or oversized dimensions and
    /// duplicate ids.
    pub fn add_custom(&mut self, width: u32, height: u32) -> Result<&SizeSpec> {
        let spec = SizeSpec::custom(width, height);
        spec.validate()?;
        if self.get(&spec.id).is_some() {
            return Err(ResizerError::duplicate_size_id(spec.id.clone()));
        }
        self.sizes.push(spec);
        Ok(self.sizes.last().expect("just pushed"))
    }

    /// Resolve a selection of ids into specs, preserving selection order and
    /// skipping unknown ids.
    pub fn select(&self, ids: &[String]) -> Vec<SizeSpec> {
        ids.iter()
            .filter_map(|id| self.get(id))
            .cloned()
            .collect()
    }
}

impl Default for SizeCatalog {
    fn default() -> Self {
        Self::with_presets()
    }
}

/// Concurrency tier for the scheduler's worker pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConcurrencyTier {
    /// Single worker.
    Safe,
    /// Good default for interactive use.
    Balanced,
    /// Maximum built-in parallelism.
    Turbo,
    /// Explicit worker count (clamped to at least 1).
    Custom(usize),
}

impl ConcurrencyTier {
    /// Worker count for this tier, before clamping to the job count.
    pub fn worker_count(&self) -> usize {
        match self {
            Self::Safe => 1,
            Self::Balanced => 3,
            Self::Turbo => 6,
            Self::Custom(n) => (*n).max(1),
        }
    }
}

impl Default for ConcurrencyTier {
    fn default() -> Self {
        ConcurrencyTier::Balanced
    }
}

/// Where each entry lands inside the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderStrategy {
    /// "{W}x{H}/{name}.{ext}"
    BySize,
    /// "{basename}/{name}.{ext}"
    ByImage,
    /// No subfolder.
    Flat,
}

impl Default for FolderStrategy {
    fn default() -> Self {
        FolderStrategy::BySize
    }
}

/// Default filename pattern applied when the caller does not supply one.
pub const DEFAULT_FILENAME_PATTERN: &str = "{basename}_{width}x{height}";
