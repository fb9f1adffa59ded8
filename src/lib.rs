// lib.rs
//
// bulk-resizer: batch image resizing for print-on-demand workflows
//
// Design goals:
// - One call from decoded sources to a downloadable ZIP
// - Deterministic output: same inputs, byte-identical archive
// - Per-job fault isolation: one bad render never sinks the batch
// - Print-ready files: DPI stamped directly into PNG/JPEG containers

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{
    check_dimensions, resize_batch, resize_batch_observed, BatchOptions, BatchOutput, CancelToken,
    JobObserver, JobResult, JobStatus, JobUpdate, ProgressReporter, ProgressSnapshot, Source,
    SourceRegistry, MAX_DIMENSION, MAX_PIXELS,
};
pub use error::{ErrorCategory, ResizerError, Result};
pub use ops::{
    BackgroundStyle, ConcurrencyTier, FitMode, FolderStrategy, OutputFormat, SizeCatalog,
    SizeOrigin, SizeSpec, DEFAULT_FILENAME_PATTERN,
};
