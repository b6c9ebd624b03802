//! External tool invocation: rasterize a token with ImageMagick, then trace
//! the bitmap into an SVG with potrace.
//!
//! Both programs are opaque collaborators with a "run with arguments, produce
//! a file or fail" contract. A tool counts as failed when it cannot be
//! spawned, exits non-zero, exceeds the optional timeout, or exits zero
//! without creating its output file.

use crate::config::RenderSettings;
use crate::error::{ToolError, ToolStep};
use crate::glyphs::draw_directive;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Longest stderr excerpt carried in a [`ToolError`].
const STDERR_TAIL: usize = 400;

/// Rasterizer arguments for drawing `token` from `font` into `bitmap`.
pub fn rasterize_args(
    settings: &RenderSettings,
    font: &Path,
    token: &str,
    bitmap: &Path,
) -> Vec<OsString> {
    let (x, y) = settings.origin;
    vec![
        "-size".into(),
        format!("{}x{}", settings.canvas_width, settings.canvas_height).into(),
        format!("xc:{}", settings.background).into(),
        "-font".into(),
        font.as_os_str().to_owned(),
        "-pointsize".into(),
        settings.point_size.to_string().into(),
        "-fill".into(),
        settings.fill.clone().into(),
        "-draw".into(),
        draw_directive(token, x, y).into(),
        bitmap.as_os_str().to_owned(),
    ]
}

/// Tracer arguments for converting `bitmap` into the SVG at `svg`.
pub fn trace_args(bitmap: &Path, svg: &Path) -> Vec<OsString> {
    vec![
        bitmap.as_os_str().to_owned(),
        "-s".into(),
        "-o".into(),
        svg.as_os_str().to_owned(),
    ]
}

/// Render `token` into `dir/<stem>.bmp`, trace it into `dir/<stem>.svg`,
/// and return the SVG path.
pub async fn render_glyph(
    settings: &RenderSettings,
    font: &Path,
    dir: &Path,
    token: &str,
    stem: &str,
) -> Result<PathBuf, ToolError> {
    let bitmap = dir.join(format!("{stem}.bmp"));
    let svg = dir.join(format!("{stem}.svg"));

    run_tool(
        ToolStep::Rasterize,
        &settings.rasterizer,
        &rasterize_args(settings, font, token, &bitmap),
        token,
        &bitmap,
        settings.tool_timeout,
    )
    .await?;

    run_tool(
        ToolStep::Trace,
        &settings.tracer,
        &trace_args(&bitmap, &svg),
        token,
        &svg,
        settings.tool_timeout,
    )
    .await?;

    Ok(svg)
}

/// Run one tool to completion and check that it produced `output`.
async fn run_tool(
    step: ToolStep,
    program: &Path,
    args: &[OsString],
    token: &str,
    output: &Path,
    timeout: Option<Duration>,
) -> Result<(), ToolError> {
    let program_name = program.display().to_string();
    let start = Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ToolError::Spawn {
            step,
            token: token.to_string(),
            program: program_name.clone(),
            detail: e.to_string(),
        })?;

    let waited = match timeout {
        // Dropping the timed-out future drops the child, and kill_on_drop kills it.
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(res) => res,
            Err(_) => {
                warn!("{} '{}' timed out after {:?}", step, token, limit);
                return Err(ToolError::Timeout {
                    step,
                    token: token.to_string(),
                    program: program_name,
                    secs: limit.as_secs(),
                });
            }
        },
        None => child.wait_with_output().await,
    };

    let out = waited.map_err(|e| ToolError::Spawn {
        step,
        token: token.to_string(),
        program: program_name.clone(),
        detail: e.to_string(),
    })?;

    if !out.status.success() {
        return Err(ToolError::Exit {
            step,
            token: token.to_string(),
            program: program_name,
            status: out.status.to_string(),
            stderr: stderr_tail(&out.stderr),
        });
    }

    if tokio::fs::metadata(output).await.is_err() {
        return Err(ToolError::MissingOutput {
            step,
            token: token.to_string(),
            program: program_name,
            path: output.to_path_buf(),
        });
    }

    debug!(
        "{} '{}' → {} in {}ms",
        step,
        token,
        output.display(),
        start.elapsed().as_millis()
    );
    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - STDERR_TAIL).collect();
    format!("\u{2026}{tail}")
}

// ── Tool availability ────────────────────────────────────────────────────

/// Result of probing one external program.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub step: ToolStep,
    pub program: String,
    pub available: bool,
    /// First line of the program's version output, or the failure reason.
    pub detail: String,
}

/// Probe both tools with their version flags.
///
/// ImageMagick answers `-version`, potrace answers `--version`; both exit 0.
pub async fn check_tools(settings: &RenderSettings) -> Vec<ToolStatus> {
    vec![
        probe(ToolStep::Rasterize, &settings.rasterizer, "-version").await,
        probe(ToolStep::Trace, &settings.tracer, "--version").await,
    ]
}

async fn probe(step: ToolStep, program: &Path, flag: &str) -> ToolStatus {
    let program_name = program.display().to_string();
    let result = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(Duration::from_secs(10), result).await {
        Ok(Ok(out)) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            ToolStatus {
                step,
                program: program_name,
                available: true,
                detail: stdout.lines().next().unwrap_or_default().trim().to_string(),
            }
        }
        Ok(Ok(out)) => ToolStatus {
            step,
            program: program_name,
            available: false,
            detail: format!("{flag} exited with {}", out.status),
        },
        Ok(Err(e)) => ToolStatus {
            step,
            program: program_name,
            available: false,
            detail: e.to_string(),
        },
        Err(_) => ToolStatus {
            step,
            program: program_name,
            available: false,
            detail: format!("{flag} did not answer within 10s"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterize_args_use_render_settings() {
        let settings = RenderSettings::default();
        let args = rasterize_args(
            &settings,
            Path::new("up/f.ttf"),
            "6.",
            Path::new("up/6..bmp"),
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-size",
                "100x100",
                "xc:white",
                "-font",
                "up/f.ttf",
                "-pointsize",
                "72",
                "-fill",
                "black",
                "-draw",
                "text 10,70 '6.'",
                "up/6..bmp",
            ]
        );
    }

    #[test]
    fn trace_args_request_svg_output() {
        let args = trace_args(Path::new("a.bmp"), Path::new("a.svg"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["a.bmp", "-s", "-o", "a.svg"]);
    }

    #[test]
    fn stderr_tail_keeps_the_end() {
        assert_eq!(stderr_tail(b"  short \n"), "short");
        let long = "x".repeat(STDERR_TAIL) + "END";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.ends_with("END"));
        assert_eq!(tail.chars().count(), STDERR_TAIL + 1);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let settings = RenderSettings {
            rasterizer: tmp.path().join("no-such-convert"),
            ..RenderSettings::default()
        };
        let err = render_glyph(&settings, Path::new("f.ttf"), tmp.path(), "1", "1")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert_eq!(err.step(), ToolStep::Rasterize);
    }

    #[tokio::test]
    async fn check_tools_reports_missing_programs() {
        let settings = RenderSettings {
            rasterizer: PathBuf::from("/nonexistent/convert"),
            tracer: PathBuf::from("/nonexistent/potrace"),
            ..RenderSettings::default()
        };
        let statuses = check_tools(&settings).await;
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|s| !s.available));
        assert_eq!(statuses[0].step, ToolStep::Rasterize);
        assert_eq!(statuses[1].step, ToolStep::Trace);
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use crate::test_support::{fake_tool, FAIL, TOUCH_LAST_ARG, WRITE_AFTER_O};
        use tempfile::TempDir;

        fn settings(tmp: &TempDir, raster: &str, trace: &str) -> RenderSettings {
            RenderSettings {
                rasterizer: fake_tool(tmp.path(), "convert", raster),
                tracer: fake_tool(tmp.path(), "potrace", trace),
                ..RenderSettings::default()
            }
        }

        #[tokio::test]
        async fn render_glyph_produces_bitmap_and_svg() {
            let tmp = TempDir::new().unwrap();
            let s = settings(&tmp, TOUCH_LAST_ARG, WRITE_AFTER_O);
            let svg = render_glyph(&s, Path::new("f.ttf"), tmp.path(), "7", "7")
                .await
                .unwrap();
            assert_eq!(svg, tmp.path().join("7.svg"));
            assert!(svg.exists());
            assert!(tmp.path().join("7.bmp").exists());
        }

        #[tokio::test]
        async fn trace_failure_names_trace_step() {
            let tmp = TempDir::new().unwrap();
            let s = settings(&tmp, TOUCH_LAST_ARG, FAIL);
            let err = render_glyph(&s, Path::new("f.ttf"), tmp.path(), "7", "7")
                .await
                .unwrap_err();
            assert_eq!(err.step(), ToolStep::Trace);
            match err {
                ToolError::Exit { stderr, .. } => assert!(stderr.contains("boom")),
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[tokio::test]
        async fn success_without_output_is_an_error() {
            let tmp = TempDir::new().unwrap();
            let s = settings(&tmp, "exit 0", WRITE_AFTER_O);
            let err = render_glyph(&s, Path::new("f.ttf"), tmp.path(), "7", "7")
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::MissingOutput { .. }));
        }

        #[tokio::test]
        async fn hung_tool_is_killed_after_timeout() {
            let tmp = TempDir::new().unwrap();
            let mut s = settings(&tmp, "sleep 30", WRITE_AFTER_O);
            s.tool_timeout = Some(Duration::from_millis(200));
            let start = Instant::now();
            let err = render_glyph(&s, Path::new("f.ttf"), tmp.path(), "7", "7")
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::Timeout { .. }));
            assert!(start.elapsed() < Duration::from_secs(10));
        }
    }
}
