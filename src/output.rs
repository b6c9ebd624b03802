//! Result types returned by the conversion entry points.

use crate::session::{Artifact, UploadSession};
use serde::Serialize;

/// Everything a successful conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The session whose directory holds the results.
    pub session: UploadSession,
    /// One SVG per token, in token order.
    pub artifacts: Vec<Artifact>,
    /// The ZIP bundle, when archiving is enabled.
    pub archive: Option<Artifact>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// The file a client should download: the archive if any, else the
    /// first SVG.
    pub fn primary(&self) -> Option<&Artifact> {
        self.archive.as_ref().or_else(|| self.artifacts.first())
    }
}

/// Timing and counts for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Tokens rendered.
    pub tokens: usize,
    /// Wall-clock time spent in the rasterizer and tracer.
    pub render_duration_ms: u64,
    /// Time spent writing the archive and pruning the directory.
    pub package_duration_ms: u64,
    pub total_duration_ms: u64,
}
