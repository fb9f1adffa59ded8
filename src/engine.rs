// src/engine.rs
//
// The core of bulk-resizer. A batch pipeline that:
// 1. Expands sources x sizes into an explicit job list
// 2. Drains the jobs on a bounded worker pool (resample -> encode -> tag)
// 3. Packs every successful render into one deterministic ZIP
//
// This file is a facade that delegates to the decomposed modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Sources and target sizes larger than 32768x32768 are rejected to prevent
/// decompression bombs. This is the same limit used by libvips/sharp.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

/// Reject dimensions beyond the decompression-bomb limits above.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ResizerError::size_too_large(width, height));
    }
    if u64::from(width).saturating_mul(u64::from(height)) > MAX_PIXELS {
        return Err(ResizerError::size_too_large(width, height));
    }
    Ok(())
}

mod archive;
mod encoder;
mod metadata;
mod planner;
mod progress;
mod resample;
mod scheduler;

pub use archive::{entry_path, render_filename, validate_pattern, ArchiveBuilder};
pub use encoder::encode;
pub use metadata::{pixels_per_meter, tag_resolution};
pub use planner::{plan_jobs, Job, JobResult, JobStatus, Source, SourceRegistry};
pub use progress::{ProgressReporter, ProgressSnapshot};
pub use resample::{resample, FitGeometry};
pub use scheduler::{
    CancelToken, JobContext, JobObserver, JobOutcome, JobUpdate, NullObserver, Scheduler,
};

use crate::error::{Result, ResizerError};
use crate::ops::{
    BackgroundStyle, ConcurrencyTier, FitMode, FolderStrategy, OutputFormat,
    DEFAULT_FILENAME_PATTERN,
};
use tracing::info;

/// Rendering and packaging options for one batch run.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub mode: FitMode,
    pub background: BackgroundStyle,
    pub format: OutputFormat,
    /// Print resolution stamped into each output; `None` leaves files untagged.
    pub dpi: Option<u16>,
    pub concurrency: ConcurrencyTier,
    pub filename_pattern: String,
    pub folder_strategy: FolderStrategy,
    /// Free-form label substituted for `{profile}` in filename patterns.
    /// Empty by default.
    pub profile: String,
    pub cancel: Option<CancelToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            mode: FitMode::Contain,
            background: BackgroundStyle::Transparent,
            format: OutputFormat::Png,
            dpi: Some(300),
            concurrency: ConcurrencyTier::Balanced,
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            folder_strategy: FolderStrategy::BySize,
            profile: String::new(),
            cancel: None,
        }
    }
}

/// Everything a finished run produces.
#[derive(Debug)]
pub struct BatchOutput {
    /// ZIP archive bytes containing every successful render.
    pub archive: Vec<u8>,
    /// Terminal record for each job, in job-id order.
    pub jobs: Vec<JobResult>,
    pub summary: ProgressSnapshot,
}

/// Run the full batch pipeline with an external status observer.
///
/// Validation is fail-fast: bad inputs are rejected before any pixel work.
/// After that point a failed job only marks its own record; packaging errors
/// fail the whole run.
pub fn resize_batch_observed(
    sources: &[Source],
    sizes: &[crate::ops::SizeSpec],
    options: &BatchOptions,
    observer: &dyn JobObserver,
) -> Result<BatchOutput> {
    if sources.is_empty() {
        return Err(ResizerError::NoSources);
    }
    if sizes.is_empty() {
        return Err(ResizerError::NoSizes);
    }
    for size in sizes {
        size.validate()?;
    }
    validate_pattern(&options.filename_pattern)?;

    let jobs = plan_jobs(sources, sizes);
    let total = jobs.len();
    info!(
        sources = sources.len(),
        sizes = sizes.len(),
        jobs = total,
        "batch start"
    );

    let reporter = ProgressReporter::new(total);
    let fanout = FanoutObserver {
        inner: [&reporter, observer],
    };

    let ctx = JobContext {
        mode: options.mode,
        background: options.background,
        format: options.format,
        dpi: options.dpi,
    };
    let scheduler = Scheduler::new(options.concurrency);
    let outcomes = scheduler.run(sources, jobs, ctx, &fanout, options.cancel.as_ref());

    if options
        .cancel
        .as_ref()
        .is_some_and(CancelToken::is_cancelled)
    {
        return Err(ResizerError::Cancelled);
    }

    let builder = ArchiveBuilder::new(
        &options.filename_pattern,
        options.folder_strategy,
        &options.profile,
        options.format,
    );
    let archive = builder.build(sources, &outcomes)?;

    let mut jobs: Vec<JobResult> = outcomes
        .into_iter()
        .map(|outcome| JobResult {
            job_id: outcome.job.id,
            source_id: outcome.job.source_id,
            size_id: outcome.job.size.id,
            status: if outcome.result.is_ok() {
                JobStatus::Done
            } else {
                JobStatus::Error
            },
            error: outcome.result.err(),
        })
        .collect();
    jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));

    let summary = reporter.snapshot();
    info!(
        completed = summary.completed,
        errored = summary.errored,
        archive_bytes = archive.len(),
        "batch finished"
    );

    Ok(BatchOutput {
        archive,
        jobs,
        summary,
    })
}

/// Run the full batch pipeline without external observation.
pub fn resize_batch(
    sources: &[Source],
    sizes: &[crate::ops::SizeSpec],
    options: &BatchOptions,
) -> Result<BatchOutput> {
    resize_batch_observed(sources, sizes, options, &NullObserver)
}

/// Delivers each status event to every wrapped observer, in order.
struct FanoutObserver<'a> {
    inner: [&'a dyn JobObserver; 2],
}

impl JobObserver for FanoutObserver<'_> {
    fn on_status(&self, update: &JobUpdate) {
        for observer in self.inner {
            observer.on_status(update);
        }
    }
}
