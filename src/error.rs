// src/error.rs
//
// Unified error handling for bulk-resizer
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Validation: bad pipeline input, checked before any job runs
// - Job: scoped to a single job, recorded as that job's terminal status
// - Packaging: fatal to the whole run, surfaced after all jobs are terminal

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy mirroring the pipeline's recovery policy.
///
/// - Validation: the pipeline never starts
/// - Job: one job fails; siblings keep running
/// - Packaging: the run fails after all jobs are terminal; no partial archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid pipeline input, rejected before scheduling
    Validation,
    /// Failure scoped to a single job
    Job,
    /// Archive assembly failure, fatal to the run
    Packaging,
}

/// bulk-resizer error types
///
/// All errors are type-safe and provide clear, actionable messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResizerError {
    // Validation Errors
    #[error("No image sources were provided")]
    NoSources,

    #[error("No target sizes were selected")]
    NoSizes,

    #[error("Invalid target size {width}x{height}: both dimensions must be positive")]
    InvalidSize { width: u32, height: u32 },

    #[error("Size {width}x{height} exceeds the maximum supported dimensions")]
    SizeTooLarge { width: u32, height: u32 },

    #[error("A size with id '{id}' already exists in the catalog")]
    DuplicateSizeId { id: Cow<'static, str> },

    #[error("Invalid filename pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // Job Errors
    #[error("Failed to decode image '{name}': {message}")]
    DecodeFailed {
        name: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Resample failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResampleFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Packaging Errors
    #[error("Two jobs map to the same archive path '{path}'")]
    DuplicatePath { path: Cow<'static, str> },

    #[error("Failed to write archive: {message}")]
    ArchiveWriteFailed { message: Cow<'static, str> },

    // Run-level outcome of cooperative cancellation
    #[error("Batch was cancelled before completion")]
    Cancelled,
}

// Constructor Helpers
impl ResizerError {
    pub fn invalid_size(width: u32, height: u32) -> Self {
        Self::InvalidSize { width, height }
    }

    pub fn size_too_large(width: u32, height: u32) -> Self {
        Self::SizeTooLarge { width, height }
    }

    pub fn duplicate_size_id(id: impl Into<Cow<'static, str>>) -> Self {
        Self::DuplicateSizeId { id: id.into() }
    }

    pub fn invalid_pattern(
        pattern: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn decode_failed(
        name: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::DecodeFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn resample_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResampleFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_path(path: impl Into<Cow<'static, str>>) -> Self {
        Self::DuplicatePath { path: path.into() }
    }

    pub fn archive_write_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ArchiveWriteFailed {
            message: message.into(),
        }
    }

    /// Whether this error is recorded on a single job rather than failing the run.
    pub fn is_job_scoped(&self) -> bool {
        self.category() == ErrorCategory::Job
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoSources
            | Self::NoSizes
            | Self::InvalidSize { .. }
            | Self::SizeTooLarge { .. }
            | Self::DuplicateSizeId { .. }
            | Self::InvalidPattern { .. }
            // Cancellation is checked before scheduling continues; like
            // validation, the caller gets no archive.
            | Self::Cancelled => ErrorCategory::Validation,

            Self::DecodeFailed { .. }
            | Self::ResampleFailed { .. }
            | Self::EncodeFailed { .. } => ErrorCategory::Job,

            Self::DuplicatePath { .. } | Self::ArchiveWriteFailed { .. } => {
                ErrorCategory::Packaging
            }
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ResizerError>;
