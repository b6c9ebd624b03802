//! Upload sessions and the artifacts they produce.
//!
//! A session is nothing more than a directory under the uploads root, named
//! by a random UUID. There is no index of sessions: looking one up means
//! parsing the id and reading the directory.

use crate::error::GlyphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of one upload session (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The session's directory under `root`.
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        root.join(self.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = GlyphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| GlyphError::InvalidSessionId(s.to_string()))
    }
}

/// A live upload: its directory and the stored font.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub id: SessionId,
    /// `uploads_dir/<id>`.
    pub dir: PathBuf,
    /// The font file inside `dir`.
    pub font_path: PathBuf,
    /// The font's file name as uploaded (directory components stripped).
    pub font_name: String,
}

impl UploadSession {
    /// URL path under which a file of this session is served.
    pub fn url_for(&self, file_name: &str) -> String {
        download_url(&self.id, file_name)
    }

    /// URL of the session's result page.
    pub fn result_url(&self) -> String {
        format!("/result/{}", self.id)
    }
}

/// URL path for `file_name` in session `id`.
pub fn download_url(id: &SessionId, file_name: &str) -> String {
    format!("/uploads/{id}/{file_name}")
}

/// One produced file: display name and location on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
}

impl Artifact {
    /// Record for `path`, named by its final path component.
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// One entry of a session directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedFile {
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// Current contents of a session directory, sorted by name.
///
/// Returns [`GlyphError::NotFound`] once cleanup has removed the directory.
pub async fn list_session(root: &Path, id: &SessionId) -> Result<Vec<ListedFile>, GlyphError> {
    let dir = id.dir_in(root);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GlyphError::NotFound(format!("session {id}")));
        }
        Err(e) => return Err(GlyphError::Internal(format!("reading {}: {e}", dir.display()))),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GlyphError::Internal(format!("reading {}: {e}", dir.display())))?
    {
        let Ok(meta) = entry.metadata().await else {
            // Removed between read_dir and stat.
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(ListedFile {
            url: download_url(id, &name),
            name,
            size: meta.len(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Resolve `file_name` inside session `id`, rejecting anything that is not
/// a plain file name.
pub fn session_file(root: &Path, id: &SessionId, file_name: &str) -> Result<PathBuf, GlyphError> {
    let plain = !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\', '\0']);
    if !plain {
        return Err(GlyphError::NotFound(file_name.to_string()));
    }
    Ok(id.dir_in(root).join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn session_id_round_trips_through_display() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn session_id_rejects_non_uuid() {
        assert!("../etc".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
        let err = "nope".parse::<SessionId>().unwrap_err();
        assert!(matches!(err, GlyphError::InvalidSessionId(_)));
    }

    #[test]
    fn artifact_named_by_file_name() {
        let a = Artifact::from_path(PathBuf::from("uploads/x/6..svg"));
        assert_eq!(a.name, "6..svg");
    }

    #[test]
    fn session_file_rejects_traversal() {
        let root = Path::new("uploads");
        let id = SessionId::new();
        assert!(session_file(root, &id, "../secret").is_err());
        assert!(session_file(root, &id, "..").is_err());
        assert!(session_file(root, &id, "a\\b").is_err());
        assert!(session_file(root, &id, "").is_err());
        let p = session_file(root, &id, "font.zip").unwrap();
        assert_eq!(p, root.join(id.to_string()).join("font.zip"));
    }

    #[tokio::test]
    async fn list_session_reports_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let id = SessionId::new();
        let dir = id.dir_in(tmp.path());
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("b.svg"), b"<svg/>").unwrap();
        std::fs::write(dir.join("a.zip"), b"PK").unwrap();

        let files = list_session(tmp.path(), &id).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.zip", "b.svg"]);
        assert_eq!(files[1].size, 6);
        assert_eq!(files[0].url, format!("/uploads/{id}/a.zip"));
    }

    #[tokio::test]
    async fn list_missing_session_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = list_session(tmp.path(), &SessionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GlyphError::NotFound(_)));
    }
}
