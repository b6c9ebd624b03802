//! Upload intake: validate the uploaded font and give it a session directory.
//!
//! Validation happens before anything touches the disk, so a rejected upload
//! never leaves a directory behind. If writing the font fails after the
//! directory was created, the directory is removed before the error is
//! returned.

use crate::error::GlyphError;
use crate::session::{SessionId, UploadSession};
use std::path::Path;
use tracing::{debug, info, warn};

/// True when `filename`'s extension (case-insensitive) is in `allowed`.
///
/// `allowed` holds lower-case extensions without the leading dot.
pub fn is_allowed_font(filename: &str, allowed: &[String]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| allowed.iter().any(|a| *a == e))
}

/// Reduce a client-supplied file name to its last path component.
///
/// Browsers on Windows have been known to send full paths, and a hostile
/// client can send `../x`; only the final component is ever used.
pub fn font_file_name(raw: &str) -> Result<String, GlyphError> {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if last.is_empty() || last == "." || last == ".." || last.contains('\0') {
        return Err(GlyphError::MissingField { field: "font" });
    }
    Ok(last.to_string())
}

/// Create `root/<uuid>/` and store `bytes` there as `font_name`.
pub async fn create_session(
    root: &Path,
    font_name: &str,
    bytes: &[u8],
) -> Result<UploadSession, GlyphError> {
    let id = SessionId::new();
    let dir = id.dir_in(root);

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| GlyphError::StorageFailed {
            path: dir.clone(),
            source: e,
        })?;

    let font_path = dir.join(font_name);
    if let Err(e) = tokio::fs::write(&font_path, bytes).await {
        discard_dir(&dir).await;
        return Err(GlyphError::StorageFailed {
            path: font_path,
            source: e,
        });
    }

    info!(
        "Session {} created: {} ({} bytes)",
        id,
        font_name,
        bytes.len()
    );

    Ok(UploadSession {
        id,
        dir,
        font_path,
        font_name: font_name.to_string(),
    })
}

/// Remove a session directory right away; failures are only logged.
pub async fn discard_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Discarded {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to discard {}: {}", dir.display(), e),
    }
}
