//! Error types for the glyph2svg library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`GlyphError`]: request-fatal. The upload cannot be turned into a
//!   response (bad form, disallowed file, tool failure, archive failure).
//!   Each variant carries an HTTP status via [`GlyphError::status`], which the
//!   server uses to answer the client.
//!
//! * [`ToolError`]: a single external step (rasterize or trace) failed for a
//!   single token. It is wrapped into [`GlyphError::Tool`] by the conversion
//!   loop, which aborts on the first one.

use axum::http::StatusCode;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All request-level errors returned by the glyph2svg library.
#[derive(Debug, Error)]
pub enum GlyphError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// The endpoint only accepts POST for conversions.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The multipart body could not be parsed.
    #[error("Unable to parse form: {detail}")]
    MalformedForm { detail: String, status: StatusCode },

    /// A required form field was absent or empty.
    #[error("Error retrieving the {field} field")]
    MissingField { field: &'static str },

    /// The uploaded file's extension is not in the allowed set.
    #[error("Invalid file format '{filename}'. Only {allowed} are allowed.")]
    DisallowedExtension { filename: String, allowed: String },

    /// A text token cannot be used (empty, or unusable as a file name).
    #[error("Invalid text '{token}': {reason}")]
    InvalidToken { token: String, reason: String },

    /// A session id path segment is not a UUID.
    #[error("Invalid session id '{0}'")]
    InvalidSessionId(String),

    /// The session directory (or a file in it) no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),

    // ── Server errors ─────────────────────────────────────────────────────
    /// Creating the session directory or writing the font failed.
    #[error("Error saving the file '{path}': {source}")]
    StorageFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rasterizer or tracer failed for one token.
    #[error("Error generating SVG: {0}")]
    Tool(#[from] ToolError),

    /// Writing the ZIP archive failed.
    #[error("Error creating ZIP file '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GlyphError {
    /// HTTP status the server answers with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GlyphError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GlyphError::MalformedForm { status, .. } => *status,
            GlyphError::MissingField { .. }
            | GlyphError::DisallowedExtension { .. }
            | GlyphError::InvalidToken { .. }
            | GlyphError::InvalidSessionId(_) => StatusCode::BAD_REQUEST,
            GlyphError::NotFound(_) => StatusCode::NOT_FOUND,
            GlyphError::StorageFailed { .. }
            | GlyphError::Tool(_)
            | GlyphError::ArchiveFailed { .. }
            | GlyphError::InvalidConfig(_)
            | GlyphError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the failure is the client's fault (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

/// Which external program a [`ToolError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStep {
    /// Text → bitmap (ImageMagick `convert`).
    Rasterize,
    /// Bitmap → SVG (`potrace`).
    Trace,
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStep::Rasterize => f.write_str("rasterize"),
            ToolStep::Trace => f.write_str("trace"),
        }
    }
}

/// A failed external-tool invocation for one token.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The program could not be started at all (not installed, not executable).
    #[error("{step} '{token}': could not run '{program}': {detail}")]
    Spawn {
        step: ToolStep,
        token: String,
        program: String,
        detail: String,
    },

    /// The program ran but exited unsuccessfully.
    #[error("{step} '{token}': '{program}' exited with {status}: {stderr}")]
    Exit {
        step: ToolStep,
        token: String,
        program: String,
        status: String,
        stderr: String,
    },

    /// The program exited successfully but left no output file behind.
    #[error("{step} '{token}': '{program}' produced no output at '{path}'")]
    MissingOutput {
        step: ToolStep,
        token: String,
        program: String,
        path: PathBuf,
    },

    /// The program was killed after exceeding the configured timeout.
    #[error("{step} '{token}': '{program}' timed out after {secs}s")]
    Timeout {
        step: ToolStep,
        token: String,
        program: String,
        secs: u64,
    },
}

impl ToolError {
    /// The step that failed.
    pub fn step(&self) -> ToolStep {
        match self {
            ToolError::Spawn { step, .. }
            | ToolError::Exit { step, .. }
            | ToolError::MissingOutput { step, .. }
            | ToolError::Timeout { step, .. } => *step,
        }
    }

    /// The token that was being rendered.
    pub fn token(&self) -> &str {
        match self {
            ToolError::Spawn { token, .. }
            | ToolError::Exit { token, .. }
            | ToolError::MissingOutput { token, .. }
            | ToolError::Timeout { token, .. } => token,
        }
    }
}
