//! Result packaging: bundle the produced SVGs into one ZIP and prune the
//! session directory down to its final artifacts.
//!
//! The archive is written under a temporary name and renamed into place
//! only after the ZIP central directory has been flushed, so a failed
//! packaging step never leaves a half-written archive under the name the
//! client would download.

use crate::error::GlyphError;
use crate::session::Artifact;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive file name for an uploaded font: extension replaced by `.zip`.
pub fn archive_name(font_name: &str) -> String {
    let stem = Path::new(font_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "glyphs".to_string());
    format!("{stem}.zip")
}

/// Write `artifacts` into `dir/<archive_name(font_name)>` and return its path.
///
/// Runs on the blocking pool; the `zip` writer is synchronous.
pub async fn create_archive(
    dir: &Path,
    font_name: &str,
    artifacts: &[Artifact],
) -> Result<PathBuf, GlyphError> {
    let path = dir.join(archive_name(font_name));
    let target = path.clone();
    let artifacts = artifacts.to_vec();

    tokio::task::spawn_blocking(move || write_archive_blocking(&target, &artifacts))
        .await
        .map_err(|e| GlyphError::Internal(format!("Archive task panicked: {e}")))?
        .map_err(|detail| GlyphError::ArchiveFailed {
            path: path.clone(),
            detail,
        })?;

    info!("Archive written: {}", path.display());
    Ok(path)
}

fn write_archive_blocking(path: &Path, artifacts: &[Artifact]) -> Result<(), String> {
    let partial = path.with_extension("zip.part");
    let result = write_zip(&partial, artifacts).and_then(|()| {
        std::fs::rename(&partial, path).map_err(|e| format!("rename: {e}"))
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

fn write_zip(path: &Path, artifacts: &[Artifact]) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("create: {e}"))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for artifact in artifacts {
        let mut src = File::open(&artifact.path)
            .map_err(|e| format!("open {}: {e}", artifact.path.display()))?;
        zip.start_file(artifact.name.as_str(), options)
            .map_err(|e| format!("add {}: {e}", artifact.name))?;
        io::copy(&mut src, &mut zip).map_err(|e| format!("write {}: {e}", artifact.name))?;
        debug!("Archived {}", artifact.name);
    }

    let mut inner = zip.finish().map_err(|e| format!("finish: {e}"))?;
    io::Write::flush(&mut inner).map_err(|e| format!("flush: {e}"))?;
    Ok(())
}

/// Delete every regular file in `dir` whose extension is not exactly
/// `keep_ext` (case-sensitive: `x.SVG` is removed when keeping `svg`).
///
/// Returns the number of files removed. Individual removal failures are
/// logged and skipped.
pub async fn prune_except(dir: &Path, keep_ext: &str) -> Result<usize, GlyphError> {
    prune_where(dir, |p| p.extension().and_then(|e| e.to_str()) == Some(keep_ext)).await
}

/// Delete every regular file in `dir` except `keep`.
pub async fn prune_except_file(dir: &Path, keep: &Path) -> Result<usize, GlyphError> {
    prune_where(dir, |p| p == keep).await
}

async fn prune_where<F>(dir: &Path, keep: F) -> Result<usize, GlyphError>
where
    F: Fn(&Path) -> bool,
{
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| GlyphError::Internal(format!("reading {}: {e}", dir.display())))?;

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GlyphError::Internal(format!("reading {}: {e}", dir.display())))?
    {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file || keep(&path) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    debug!("Pruned {} files from {}", removed, dir.display());
    Ok(removed)
}
