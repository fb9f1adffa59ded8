// src/engine/archive.rs
//
// Deterministic ZIP packaging for finished jobs: filename pattern rendering,
// folder layout, duplicate-path rejection, and a fixed entry timestamp so
// identical inputs produce identical archives.

use crate::engine::planner::Source;
use crate::engine::scheduler::JobOutcome;
use crate::error::{Result, ResizerError};
use crate::ops::{FolderStrategy, OutputFormat};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Substitution tokens recognized in filename patterns.
const TOKENS: [&str; 4] = ["{basename}", "{width}", "{height}", "{profile}"];

/// Reject patterns that cannot yield a usable flat filename. Unknown
/// `{...}` tokens pass through literally, but the pattern itself must not
/// be empty or escape into parent directories.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(ResizerError::invalid_pattern(
            pattern.to_string(),
            "pattern is empty",
        ));
    }
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(ResizerError::invalid_pattern(
            pattern.to_string(),
            "pattern must not contain path separators",
        ));
    }
    if pattern.contains("..") {
        return Err(ResizerError::invalid_pattern(
            pattern.to_string(),
            "pattern must not contain '..'",
        ));
    }
    Ok(())
}

/// Render a pattern into a filename (extension appended from the output
/// format). Every occurrence of a known token is substituted.
pub fn render_filename(
    pattern: &str,
    basename: &str,
    width: u32,
    height: u32,
    profile: &str,
    format: OutputFormat,
) -> String {
    let mut name = pattern.to_string();
    let values = [
        basename.to_string(),
        width.to_string(),
        height.to_string(),
        profile.to_string(),
    ];
    for (token, value) in TOKENS.iter().zip(values.iter()) {
        name = name.replace(token, value);
    }
    format!("{}.{}", name, format.extension())
}

/// Archive-relative path for one rendered file, per the folder strategy.
pub fn entry_path(strategy: FolderStrategy, filename: &str, basename: &str, width: u32, height: u32) -> String {
    match strategy {
        FolderStrategy::BySize => format!("{}x{}/{}", width, height, filename),
        FolderStrategy::ByImage => format!("{}/{}", basename, filename),
        FolderStrategy::Flat => filename.to_string(),
    }
}

/// Builds the output archive from successful job outcomes.
///
/// Entries are written in job-id order regardless of completion order, with
/// a fixed modification timestamp, so the archive bytes are a pure function
/// of the inputs.
pub struct ArchiveBuilder<'a> {
    pattern: &'a str,
    strategy: FolderStrategy,
    profile: &'a str,
    format: OutputFormat,
}

impl<'a> ArchiveBuilder<'a> {
    pub fn new(
        pattern: &'a str,
        strategy: FolderStrategy,
        profile: &'a str,
        format: OutputFormat,
    ) -> Self {
        Self {
            pattern,
            strategy,
            profile,
            format,
        }
    }

    /// Pack every successful outcome into a ZIP. Failed jobs are skipped;
    /// two jobs resolving to the same path abort packaging.
    pub fn build(&self, sources: &[Source], outcomes: &[JobOutcome]) -> Result<Vec<u8>> {
        let mut done: Vec<&JobOutcome> = outcomes.iter().filter(|o| o.result.is_ok()).collect();
        done.sort_by(|a, b| a.job.id.cmp(&b.job.id));

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut seen: HashSet<String> = HashSet::with_capacity(done.len());
        for outcome in done {
            let source = &sources[outcome.job.source_idx];
            let size = &outcome.job.size;
            let filename = render_filename(
                self.pattern,
                source.basename(),
                size.width,
                size.height,
                self.profile,
                self.format,
            );
            let path = entry_path(
                self.strategy,
                &filename,
                source.basename(),
                size.width,
                size.height,
            );
            if !seen.insert(path.clone()) {
                return Err(ResizerError::duplicate_path(path));
            }

            writer
                .start_file(path.as_str(), options)
                .map_err(|e| ResizerError::archive_write_failed(e.to_string()))?;
            let bytes = outcome.result.as_ref().map_err(Clone::clone)?;
            writer
                .write_all(bytes)
                .map_err(|e| ResizerError::archive_write_failed(e.to_string()))?;
            debug!(entry = %path, bytes = bytes.len(), "archive entry written");
        }

        let cursor = writer
            .finish()
            .map_err(|e| ResizerError::archive_write_failed(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}
