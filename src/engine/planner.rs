// src/engine/planner.rs
//
// Decoded sources and the source x size job expansion.

use crate::engine::check_dimensions;
use crate::error::{ResizerError, Result};
use crate::ops::SizeSpec;
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;

/// One decoded image source.
///
/// Pixel data is held behind an Arc and treated as read-only for the whole
/// pipeline, so workers share it without locking. Immutable after creation.
#[derive(Clone, Debug)]
pub struct Source {
    pub id: String,
    /// Original file name, extension included; `basename()` strips it.
    pub name: String,
    pub pixels: Arc<DynamicImage>,
}

impl Source {
    pub fn new(id: impl Into<String>, name: impl Into<String>, pixels: DynamicImage) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pixels: Arc::new(pixels),
        }
    }

    /// Decode an uploaded file into a source. The failure mode is explicit:
    /// undecodable or oversized bytes yield `DecodeFailed`, never a partial
    /// source. Dimensions are checked from the container header before any
    /// pixel allocation happens.
    pub fn decode(id: impl Into<String>, name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let (width, height) = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ResizerError::decode_failed(name.clone(), e.to_string()))?
            .into_dimensions()
            .map_err(|e| ResizerError::decode_failed(name.clone(), e.to_string()))?;
        check_dimensions(width, height)
            .map_err(|e| ResizerError::decode_failed(name.clone(), e.to_string()))?;
        let pixels = image::load_from_memory(bytes)
            .map_err(|e| ResizerError::decode_failed(name.clone(), e.to_string()))?;
        Ok(Self::new(id, name, pixels))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// File name without its final extension.
    pub fn basename(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// Holds decoded image sources for the session; pure data.
#[derive(Clone, Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: Source) {
        self.sources.push(source);
    }

    pub fn remove(&mut self, id: &str) -> Option<Source> {
        let idx = self.sources.iter().position(|s| s.id == id)?;
        Some(self.sources.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Job lifecycle. Transitions are monotonic:
/// Pending -> Processing -> {Done | Error}, never revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// One (source x size) unit of work, immutable once planned.
#[derive(Clone, Debug)]
pub struct Job {
    /// Stable unique id derived from the source and size ids.
    pub id: String,
    pub source_idx: usize,
    pub source_id: String,
    pub size: SizeSpec,
}

/// Terminal record for one job after the run.
#[derive(Clone, Debug)]
pub struct JobResult {
    pub job_id: String,
    pub source_id: String,
    pub size_id: String,
    pub status: JobStatus,
    pub error: Option<ResizerError>,
}

/// Expand the cross product of sources x sizes into the job list.
///
/// For N sources and M sizes this yields exactly N*M jobs in submission
/// order (sources outer, sizes inner) with pairwise-unique ids.
pub fn plan_jobs(sources: &[Source], sizes: &[SizeSpec]) -> Vec<Job> {
    let mut jobs = Vec::with_capacity(sources.len() * sizes.len());
    for (source_idx, source) in sources.iter().enumerate() {
        for size in sizes {
            jobs.push(Job {
                id: format!("{}__{}", source.id, size.id),
                source_idx,
                source_id: source.id.clone(),
                size: size.clone(),
            });
        }
    }
    jobs
}
