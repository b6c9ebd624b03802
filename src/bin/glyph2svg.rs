//! Server binary for glyph2svg.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServerConfig`, installs logging, and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use glyph2svg::{check_tools, server, ArtifactNaming, ResponseMode, ServerConfig};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on :8080 with the preset glyph list, zipped results
  glyph2svg

  # Redirect to a result page instead of rendering one, no ZIP
  glyph2svg --response redirect --no-zip

  # Custom glyph list, results kept for ten minutes
  glyph2svg --glyphs A,B,C --cleanup-delay-secs 600

  # Check that ImageMagick and potrace are installed
  glyph2svg --check-tools

ENDPOINTS:
  GET  /                      batch upload form
  POST /                      convert every preset glyph (field: font)
  GET  /upload                single-text upload form
  POST /upload                convert one text (fields: font, text)
  GET  /result/{id}           list a session's files
  GET  /api/sessions/{id}     the same listing as JSON
  GET  /uploads/{id}/{file}   download a file

REQUIREMENTS:
  ImageMagick (`convert`) and potrace must be on PATH, or pass
  --rasterizer / --tracer with explicit paths.
"#;

/// Trace font glyphs to SVG over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "glyph2svg",
    version,
    about = "Upload a font, get its glyphs back as SVG (ImageMagick + potrace)",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "GLYPH2SVG_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Root directory for upload sessions.
    #[arg(long, env = "GLYPH2SVG_UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Maximum upload size in MiB.
    #[arg(long, env = "GLYPH2SVG_MAX_UPLOAD_MB", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=1024))]
    max_upload_mb: u32,

    /// Accept any file extension instead of only .ttf/.otf.
    #[arg(long, env = "GLYPH2SVG_NO_VALIDATE")]
    no_validate: bool,

    /// Comma-separated glyph list for the batch endpoint (default: preset list).
    #[arg(long, env = "GLYPH2SVG_GLYPHS", value_delimiter = ',')]
    glyphs: Option<Vec<String>>,

    /// Output file naming: token or random.
    #[arg(long, env = "GLYPH2SVG_NAMING", value_enum, default_value = "token")]
    naming: NamingArg,

    /// Keep the individual SVGs instead of bundling them into a ZIP.
    #[arg(long, env = "GLYPH2SVG_NO_ZIP")]
    no_zip: bool,

    /// How to answer a successful upload: page, redirect, inline.
    #[arg(long, env = "GLYPH2SVG_RESPONSE", value_enum, default_value = "page")]
    response: ResponseArg,

    /// Seconds before a session directory is deleted.
    #[arg(long, env = "GLYPH2SVG_CLEANUP_DELAY_SECS", default_value_t = 3600)]
    cleanup_delay_secs: u64,

    /// Seconds between stale-directory sweeps (0 disables the sweep).
    #[arg(long, env = "GLYPH2SVG_SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    sweep_interval_secs: u64,

    /// Age in seconds after which the sweep deletes a session directory.
    #[arg(long, env = "GLYPH2SVG_SWEEP_MAX_AGE_SECS", default_value_t = 3600)]
    sweep_max_age_secs: u64,

    /// Rasterizer program (ImageMagick).
    #[arg(long, env = "GLYPH2SVG_RASTERIZER", default_value = "convert")]
    rasterizer: PathBuf,

    /// Tracer program (potrace).
    #[arg(long, env = "GLYPH2SVG_TRACER", default_value = "potrace")]
    tracer: PathBuf,

    /// Kill a tool that runs longer than this many seconds (default: wait forever).
    #[arg(long, env = "GLYPH2SVG_TOOL_TIMEOUT_SECS")]
    tool_timeout_secs: Option<u64>,

    /// Probe the external tools and exit.
    #[arg(long)]
    check_tools: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GLYPH2SVG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GLYPH2SVG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum NamingArg {
    Token,
    Random,
}

impl From<NamingArg> for ArtifactNaming {
    fn from(v: NamingArg) -> Self {
        match v {
            NamingArg::Token => ArtifactNaming::Token,
            NamingArg::Random => ArtifactNaming::Random,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ResponseArg {
    Page,
    Redirect,
    Inline,
}

impl From<ResponseArg> for ResponseMode {
    fn from(v: ResponseArg) -> Self {
        match v {
            ResponseArg::Page => ResponseMode::Page,
            ResponseArg::Redirect => ResponseMode::Redirect,
            ResponseArg::Inline => ResponseMode::Inline,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Tool check ───────────────────────────────────────────────────────
    let statuses = check_tools(&config.render).await;
    if cli.check_tools {
        let mut all_ok = true;
        for s in &statuses {
            all_ok &= s.available;
            println!(
                "{:<10} {:<20} {}  {}",
                s.step.to_string(),
                s.program,
                if s.available { "ok     " } else { "MISSING" },
                s.detail
            );
        }
        if !all_ok {
            anyhow::bail!("external tools missing");
        }
        return Ok(());
    }
    for s in statuses.iter().filter(|s| !s.available) {
        tracing::warn!(
            "{} tool '{}' unavailable ({}); conversions will fail",
            s.step,
            s.program,
            s.detail
        );
    }

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;

    server::run(listener, config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
    .context("Server failed")?;

    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let sweep_interval = match cli.sweep_interval_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let mut builder = ServerConfig::builder()
        .uploads_dir(&cli.uploads_dir)
        .max_upload_bytes(cli.max_upload_mb as usize * 1024 * 1024)
        .validate_extension(!cli.no_validate)
        .artifact_naming(cli.naming.clone().into())
        .bundle_archive(!cli.no_zip)
        .response_mode(cli.response.clone().into())
        .cleanup_delay(Duration::from_secs(cli.cleanup_delay_secs))
        .sweep_interval(sweep_interval)
        .sweep_max_age(Duration::from_secs(cli.sweep_max_age_secs))
        .rasterizer(&cli.rasterizer)
        .tracer(&cli.tracer)
        .tool_timeout(cli.tool_timeout_secs.map(Duration::from_secs));

    if let Some(ref glyphs) = cli.glyphs {
        builder = builder.glyphs(glyphs.iter().map(|g| g.trim().to_string()));
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_maps_onto_config() {
        let cli = Cli::parse_from([
            "glyph2svg",
            "--glyphs",
            "A,B",
            "--no-zip",
            "--response",
            "redirect",
            "--sweep-interval-secs",
            "0",
            "--tool-timeout-secs",
            "30",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.glyphs, vec!["A", "B"]);
        assert!(!config.bundle_archive);
        assert_eq!(config.response_mode, ResponseMode::Redirect);
        assert_eq!(config.sweep_interval, None);
        assert_eq!(config.render.tool_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn colliding_glyphs_are_a_config_error() {
        let cli = Cli::parse_from(["glyph2svg", "--glyphs", "a/b,a_b"]);
        assert!(build_config(&cli).is_err());
    }
}
