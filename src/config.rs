//! Configuration types for the glyph-to-SVG service.
//!
//! Every server knob lives in [`ServerConfig`], built via its
//! [`ServerConfigBuilder`]. The variants of the upload flow (zipped or not,
//! redirect or inline, with or without a periodic sweep) are all settings
//! here rather than separate code paths.

use crate::error::GlyphError;
use crate::glyphs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One hour: default cleanup delay, sweep interval and sweep age threshold.
pub const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

/// Default multipart payload cap (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 << 20;

/// Configuration for the upload server and its conversion pipeline.
///
/// Built via [`ServerConfig::builder()`] or using
/// [`ServerConfig::default()`].
///
/// # Example
/// ```rust
/// use glyph2svg::{ResponseMode, ServerConfig};
///
/// let config = ServerConfig::builder()
///     .uploads_dir("/var/lib/glyph2svg")
///     .response_mode(ResponseMode::Redirect)
///     .bundle_archive(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root directory holding one subdirectory per upload session. Default: `uploads`.
    pub uploads_dir: PathBuf,

    /// Maximum accepted request body in bytes. Default: 10 MiB.
    pub max_upload_bytes: usize,

    /// Reject uploads whose extension is not in `allowed_extensions`. Default: true.
    pub validate_extension: bool,

    /// Lower-case extensions (without the dot) accepted when validating.
    pub allowed_extensions: Vec<String>,

    /// Tokens rendered by the batch endpoint.
    pub glyphs: Vec<String>,

    /// External tool invocation settings.
    pub render: RenderSettings,

    /// How output files are named. Default: [`ArtifactNaming::Token`].
    pub artifact_naming: ArtifactNaming,

    /// Bundle batch results into a ZIP and remove everything else. Default: true.
    pub bundle_archive: bool,

    /// How a successful conversion is answered. Default: [`ResponseMode::Page`].
    pub response_mode: ResponseMode,

    /// Delay before a session directory is deleted. Default: 1 h.
    #[serde(with = "duration_secs")]
    pub cleanup_delay: Duration,

    /// Interval of the periodic stale-directory sweep; `None` disables it. Default: 1 h.
    #[serde(with = "opt_duration_secs")]
    pub sweep_interval: Option<Duration>,

    /// Age after which the sweep removes a session directory. Default: 1 h.
    #[serde(with = "duration_secs")]
    pub sweep_max_age: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            validate_extension: true,
            allowed_extensions: vec!["ttf".into(), "otf".into()],
            glyphs: glyphs::default_glyphs(),
            render: RenderSettings::default(),
            artifact_naming: ArtifactNaming::default(),
            bundle_archive: true,
            response_mode: ResponseMode::default(),
            cleanup_delay: ONE_HOUR,
            sweep_interval: Some(ONE_HOUR),
            sweep_max_age: ONE_HOUR,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Human-readable list of allowed extensions, e.g. `.ttf, .otf`.
    pub fn allowed_extensions_display(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn validate_extension(mut self, v: bool) -> Self {
        self.config.validate_extension = v;
        self
    }

    pub fn allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.allowed_extensions = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn glyphs<I, S>(mut self, glyphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.glyphs = glyphs.into_iter().map(Into::into).collect();
        self
    }

    pub fn render(mut self, render: RenderSettings) -> Self {
        self.config.render = render;
        self
    }

    pub fn rasterizer(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.render.rasterizer = program.into();
        self
    }

    pub fn tracer(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.render.tracer = program.into();
        self
    }

    pub fn tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.render.tool_timeout = timeout;
        self
    }

    pub fn artifact_naming(mut self, naming: ArtifactNaming) -> Self {
        self.config.artifact_naming = naming;
        self
    }

    pub fn bundle_archive(mut self, v: bool) -> Self {
        self.config.bundle_archive = v;
        self
    }

    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.config.response_mode = mode;
        self
    }

    pub fn cleanup_delay(mut self, delay: Duration) -> Self {
        self.config.cleanup_delay = delay;
        self
    }

    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    pub fn sweep_max_age(mut self, age: Duration) -> Self {
        self.config.sweep_max_age = age;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, GlyphError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(GlyphError::InvalidConfig(
                "max upload size must be > 0".into(),
            ));
        }
        if c.validate_extension && c.allowed_extensions.is_empty() {
            return Err(GlyphError::InvalidConfig(
                "extension validation is on but no extensions are allowed".into(),
            ));
        }
        if c.uploads_dir.as_os_str().is_empty() {
            return Err(GlyphError::InvalidConfig("uploads dir is empty".into()));
        }
        if c.sweep_interval == Some(Duration::ZERO) {
            return Err(GlyphError::InvalidConfig(
                "sweep interval must be > 0 (use None to disable)".into(),
            ));
        }
        if c.render.canvas_width == 0 || c.render.canvas_height == 0 {
            return Err(GlyphError::InvalidConfig(format!(
                "canvas must be non-empty, got {}x{}",
                c.render.canvas_width, c.render.canvas_height
            )));
        }
        glyphs::validate_glyph_set(&c.glyphs)?;
        Ok(self.config)
    }
}

/// Parameters handed to the external rasterizer and tracer.
///
/// Defaults reproduce `convert -size 100x100 xc:white -pointsize 72
/// -fill black -draw "text 10,70 '…'"` followed by `potrace -s`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Rasterizer program. Default: `convert`.
    pub rasterizer: PathBuf,
    /// Tracer program. Default: `potrace`.
    pub tracer: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub point_size: u32,
    /// ImageMagick colour for the glyph.
    pub fill: String,
    /// ImageMagick colour for the canvas.
    pub background: String,
    /// Text origin (x, y) on the canvas.
    pub origin: (u32, u32),
    /// Kill a tool that runs longer than this. `None` waits indefinitely.
    #[serde(with = "opt_duration_secs")]
    pub tool_timeout: Option<Duration>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            rasterizer: PathBuf::from("convert"),
            tracer: PathBuf::from("potrace"),
            canvas_width: 100,
            canvas_height: 100,
            point_size: 72,
            fill: "black".into(),
            background: "white".into(),
            origin: (10, 70),
            tool_timeout: None,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How output file names are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactNaming {
    /// Sanitised token text, e.g. `6..svg` for token `6.`. (default)
    #[default]
    Token,
    /// A fresh UUID per token.
    Random,
}

/// How a successful conversion is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// HTML page listing the artifacts with download links. (default)
    #[default]
    Page,
    /// `303 See Other` to the session's result page.
    Redirect,
    /// The archive (batch) or the SVG (single) as the response body.
    Inline,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_service() {
        let c = ServerConfig::default();
        assert_eq!(c.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(c.cleanup_delay, Duration::from_secs(3600));
        assert_eq!(c.sweep_interval, Some(Duration::from_secs(3600)));
        assert_eq!(c.allowed_extensions_display(), ".ttf, .otf");
        assert_eq!(c.render.origin, (10, 70));
        assert!(c.render.tool_timeout.is_none());
        assert!(c.bundle_archive);
    }

    #[test]
    fn builder_normalises_extensions() {
        let c = ServerConfig::builder()
            .allowed_extensions([".TTF", "woff2"])
            .build()
            .unwrap();
        assert_eq!(c.allowed_extensions, vec!["ttf", "woff2"]);
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(ServerConfig::builder().max_upload_bytes(0).build().is_err());
        assert!(ServerConfig::builder()
            .sweep_interval(Some(Duration::ZERO))
            .build()
            .is_err());
        assert!(ServerConfig::builder()
            .glyphs(["x/y", "x_y"])
            .build()
            .is_err());
        assert!(ServerConfig::builder()
            .allowed_extensions(Vec::<String>::new())
            .build()
            .is_err());
        // No extensions is fine when nothing is validated.
        assert!(ServerConfig::builder()
            .validate_extension(false)
            .allowed_extensions(Vec::<String>::new())
            .build()
            .is_ok());
    }

    #[test]
    fn config_serialises_durations_as_seconds() {
        let c = ServerConfig::builder()
            .sweep_interval(None)
            .cleanup_delay(Duration::from_secs(5))
            .build()
            .unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["cleanup_delay"], 5);
        assert!(json["sweep_interval"].is_null());
        assert_eq!(json["response_mode"], "page");

        let back: ServerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.cleanup_delay, Duration::from_secs(5));
        assert_eq!(back.sweep_interval, None);
    }
}
