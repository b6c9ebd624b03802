//! Conversion entry points: upload bytes in, SVG artifacts out.
//!
//! Both entry points follow the same shape:
//!
//! ```text
//! intake ──▶ (per token: rasterize ──▶ trace) ──▶ package ──▶ output
//! ```
//!
//! A request either produces every artifact or fails. Any failure after the
//! session directory exists removes that directory before the error is
//! returned, so a failed request leaves nothing on disk.

use crate::config::{ArtifactNaming, ServerConfig};
use crate::error::GlyphError;
use crate::glyphs::sanitize_token;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{intake, package, tools};
use crate::session::{Artifact, UploadSession};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Validate an uploaded font and store it in a fresh session directory.
///
/// The extension check (when enabled) runs before anything is written, so a
/// rejected upload never creates a directory.
pub async fn accept_upload(
    raw_name: &str,
    bytes: &[u8],
    config: &ServerConfig,
) -> Result<UploadSession, GlyphError> {
    let font_name = intake::font_file_name(raw_name)?;
    if config.validate_extension && !intake::is_allowed_font(&font_name, &config.allowed_extensions)
    {
        return Err(GlyphError::DisallowedExtension {
            filename: font_name,
            allowed: config.allowed_extensions_display(),
        });
    }
    intake::create_session(&config.uploads_dir, &font_name, bytes).await
}

/// File stem for a token's outputs under the given naming mode.
pub fn output_stem(naming: ArtifactNaming, token: &str) -> Result<String, GlyphError> {
    match naming {
        ArtifactNaming::Token => sanitize_token(token),
        ArtifactNaming::Random => {
            if token.is_empty() {
                return sanitize_token(token);
            }
            Ok(Uuid::new_v4().to_string())
        }
    }
}

/// Render every configured glyph from the uploaded font.
///
/// With `bundle_archive` the SVGs are zipped into `<font stem>.zip` and every
/// other file in the session directory is deleted afterwards. Without it,
/// only the SVGs are kept.
pub async fn convert_batch(
    raw_name: &str,
    bytes: &[u8],
    config: &ServerConfig,
) -> Result<ConversionOutput, GlyphError> {
    let total_start = Instant::now();
    let session = accept_upload(raw_name, bytes, config).await?;
    info!(
        "Batch conversion {}: {} glyphs from {}",
        session.id,
        config.glyphs.len(),
        session.font_name
    );

    match batch_in_session(&session, config, total_start).await {
        Ok(output) => Ok(output),
        Err(e) => {
            warn!("Batch conversion {} failed: {}", session.id, e);
            intake::discard_dir(&session.dir).await;
            Err(e)
        }
    }
}

async fn batch_in_session(
    session: &UploadSession,
    config: &ServerConfig,
    total_start: Instant,
) -> Result<ConversionOutput, GlyphError> {
    // ── Render every token; the first failure aborts the rest ────────────
    let render_start = Instant::now();
    let mut artifacts = Vec::with_capacity(config.glyphs.len());
    for token in &config.glyphs {
        let stem = output_stem(config.artifact_naming, token)?;
        let svg =
            tools::render_glyph(&config.render, &session.font_path, &session.dir, token, &stem)
                .await?;
        artifacts.push(Artifact::from_path(svg));
    }
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    debug!(
        "Rendered {} glyphs in {}ms",
        artifacts.len(),
        render_duration_ms
    );

    // ── Package ──────────────────────────────────────────────────────────
    let package_start = Instant::now();
    let archive = if config.bundle_archive {
        let path = package::create_archive(&session.dir, &session.font_name, &artifacts).await?;
        package::prune_except_file(&session.dir, &path).await?;
        Some(Artifact::from_path(path))
    } else {
        package::prune_except(&session.dir, "svg").await?;
        None
    };
    let package_duration_ms = package_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        tokens: artifacts.len(),
        render_duration_ms,
        package_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Batch conversion {} complete: {} SVGs, {}ms total",
        session.id, stats.tokens, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        session: session.clone(),
        artifacts,
        archive,
        stats,
    })
}

/// Render a single user-supplied text from the uploaded font.
///
/// Only the resulting SVG is kept; the font and bitmap are deleted.
pub async fn convert_text(
    raw_name: &str,
    bytes: &[u8],
    text: &str,
    config: &ServerConfig,
) -> Result<ConversionOutput, GlyphError> {
    let total_start = Instant::now();
    // Reject unusable text before a directory exists.
    let stem = output_stem(config.artifact_naming, text)?;
    let session = accept_upload(raw_name, bytes, config).await?;
    info!("Text conversion {}: '{}'", session.id, text);

    let result = async {
        let render_start = Instant::now();
        let svg =
            tools::render_glyph(&config.render, &session.font_path, &session.dir, text, &stem)
                .await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        let package_start = Instant::now();
        package::prune_except_file(&session.dir, &svg).await?;

        let stats = ConversionStats {
            tokens: 1,
            render_duration_ms,
            package_duration_ms: package_start.elapsed().as_millis() as u64,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        Ok::<_, GlyphError>((Artifact::from_path(svg), stats))
    }
    .await;

    match result {
        Ok((artifact, stats)) => Ok(ConversionOutput {
            session,
            artifacts: vec![artifact],
            archive: None,
            stats,
        }),
        Err(e) => {
            warn!("Text conversion {} failed: {}", session.id, e);
            intake::discard_dir(&session.dir).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> ServerConfig {
        ServerConfig::builder()
            .uploads_dir(tmp.path().join("uploads"))
            .build()
            .unwrap()
    }

    fn session_dirs(tmp: &TempDir) -> usize {
        std::fs::read_dir(tmp.path().join("uploads"))
            .map(|rd| rd.count())
            .unwrap_or(0)
    }

    #[test]
    fn output_stem_follows_naming_mode() {
        assert_eq!(output_stem(ArtifactNaming::Token, "6.").unwrap(), "6.");
        assert_eq!(output_stem(ArtifactNaming::Token, "a/b").unwrap(), "a_b");
        let random = output_stem(ArtifactNaming::Random, "a/b").unwrap();
        assert!(Uuid::parse_str(&random).is_ok());
        assert!(output_stem(ArtifactNaming::Random, "").is_err());
    }

    #[tokio::test]
    async fn disallowed_extension_creates_no_directory() {
        let tmp = TempDir::new().unwrap();
        let err = convert_batch("logo.png", b"png", &config(&tmp))
            .await
            .unwrap_err();
        assert!(matches!(err, GlyphError::DisallowedExtension { .. }));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(session_dirs(&tmp), 0);
    }

    #[tokio::test]
    async fn validation_can_be_disabled() {
        let tmp = TempDir::new().unwrap();
        let cfg = ServerConfig::builder()
            .uploads_dir(tmp.path().join("uploads"))
            .validate_extension(false)
            .build()
            .unwrap();
        let session = accept_upload("logo.png", b"png", &cfg).await.unwrap();
        assert!(session.font_path.exists());
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_intake() {
        let tmp = TempDir::new().unwrap();
        let err = convert_text("f.ttf", b"font", "", &config(&tmp))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(session_dirs(&tmp), 0);
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use crate::config::ServerConfigBuilder;
        use crate::test_support::{fake_tool, FAIL, TOUCH_LAST_ARG, WRITE_AFTER_O};

        /// Rasterizer that logs every `-draw` directive to `raster.log` next to
        /// itself and fails only when asked to draw the token `7`.
        const FAIL_ON_SEVEN: &str = r#"while [ $# -gt 1 ]; do
  if [ "$1" = "-draw" ]; then printf '%s\n' "$2" >> "$(dirname "$0")/raster.log"; fi
  case "$1" in *"'7'"*) echo "no glyph" >&2; exit 4;; esac
  shift
done
printf 'BM' > "$1""#;

        fn scripted_config(tmp: &TempDir, raster: &str, trace: &str) -> ServerConfigBuilder {
            ServerConfig::builder()
                .uploads_dir(tmp.path().join("uploads"))
                .rasterizer(fake_tool(tmp.path(), "convert", raster))
                .tracer(fake_tool(tmp.path(), "potrace", trace))
        }

        fn names_in(dir: &std::path::Path) -> Vec<String> {
            let mut names: Vec<_> = std::fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        #[tokio::test]
        async fn batch_produces_one_svg_per_glyph_and_one_archive() {
            let tmp = TempDir::new().unwrap();
            let cfg = scripted_config(&tmp, TOUCH_LAST_ARG, WRITE_AFTER_O)
                .build()
                .unwrap();

            let out = convert_batch("Roboto.ttf", b"font", &cfg).await.unwrap();
            assert_eq!(out.artifacts.len(), crate::glyphs::DEFAULT_GLYPHS.len());
            assert_eq!(out.stats.tokens, out.artifacts.len());
            for (artifact, token) in out.artifacts.iter().zip(crate::glyphs::DEFAULT_GLYPHS) {
                assert_eq!(artifact.name, format!("{token}.svg"));
            }

            let archive = out.archive.as_ref().unwrap();
            assert_eq!(archive.name, "Roboto.zip");
            assert_eq!(out.primary(), Some(archive));

            // Only the archive is left on disk.
            assert_eq!(names_in(&out.session.dir), vec!["Roboto.zip"]);

            let zip = zip::ZipArchive::new(std::fs::File::open(&archive.path).unwrap()).unwrap();
            assert_eq!(zip.len(), crate::glyphs::DEFAULT_GLYPHS.len());
        }

        #[tokio::test]
        async fn batch_without_archive_keeps_svgs() {
            let tmp = TempDir::new().unwrap();
            let cfg = scripted_config(&tmp, TOUCH_LAST_ARG, WRITE_AFTER_O)
                .glyphs(["A", "B"])
                .bundle_archive(false)
                .build()
                .unwrap();

            let out = convert_batch("F.otf", b"font", &cfg).await.unwrap();
            assert!(out.archive.is_none());
            // Font and bitmaps are pruned; only the SVGs remain.
            assert_eq!(names_in(&out.session.dir), vec!["A.svg", "B.svg"]);
        }

        #[tokio::test]
        async fn rasterizer_failure_fails_request_and_discards_session() {
            let tmp = TempDir::new().unwrap();
            let cfg = scripted_config(&tmp, FAIL_ON_SEVEN, WRITE_AFTER_O)
                .build()
                .unwrap();

            let err = convert_batch("Roboto.ttf", b"font", &cfg).await.unwrap_err();
            assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
            match &err {
                GlyphError::Tool(tool) => {
                    assert_eq!(tool.step(), crate::error::ToolStep::Rasterize);
                    assert_eq!(tool.token(), "7");
                }
                other => panic!("unexpected: {other:?}"),
            }
            assert_eq!(session_dirs(&tmp), 0);

            // Tokens after the failing one are never rendered.
            let log = std::fs::read_to_string(tmp.path().join("raster.log")).unwrap();
            let drawn: Vec<&str> = log.lines().collect();
            let seven = crate::glyphs::DEFAULT_GLYPHS
                .iter()
                .position(|t| *t == "7")
                .unwrap();
            assert_eq!(drawn.len(), seven + 1, "drawn: {drawn:?}");
            assert_eq!(drawn.last(), Some(&"text 10,70 '7'"));
        }

        #[tokio::test]
        async fn text_conversion_keeps_only_the_svg() {
            let tmp = TempDir::new().unwrap();
            let cfg = scripted_config(&tmp, TOUCH_LAST_ARG, WRITE_AFTER_O)
                .build()
                .unwrap();

            let out = convert_text("F.ttf", b"font", "Hi/there", &cfg).await.unwrap();
            assert_eq!(out.artifacts.len(), 1);
            assert_eq!(out.artifacts[0].name, "Hi_there.svg");
            assert_eq!(names_in(&out.session.dir), vec!["Hi_there.svg"]);
        }

        #[tokio::test]
        async fn text_conversion_failure_discards_session() {
            let tmp = TempDir::new().unwrap();
            let cfg = scripted_config(&tmp, TOUCH_LAST_ARG, FAIL).build().unwrap();

            let err = convert_text("F.ttf", b"font", "A", &cfg).await.unwrap_err();
            assert!(matches!(err, GlyphError::Tool(_)));
            assert_eq!(session_dirs(&tmp), 0);
        }

        #[tokio::test]
        async fn random_naming_uses_uuids() {
            let tmp = TempDir::new().unwrap();
            let cfg = scripted_config(&tmp, TOUCH_LAST_ARG, WRITE_AFTER_O)
                .glyphs(["1", "2"])
                .artifact_naming(ArtifactNaming::Random)
                .bundle_archive(false)
                .build()
                .unwrap();

            let out = convert_batch("F.ttf", b"font", &cfg).await.unwrap();
            for a in &out.artifacts {
                let stem = a.name.trim_end_matches(".svg");
                assert!(Uuid::parse_str(stem).is_ok(), "{}", a.name);
            }
        }
    }
}
