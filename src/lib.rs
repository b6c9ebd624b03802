//! # glyph2svg
//!
//! Upload a font, render glyphs from it with ImageMagick, trace each bitmap
//! to an SVG with potrace, and hand the results back over HTTP.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Intake    validate extension, store font in uploads/<uuid>/
//!  ├─ 2. Render    per token: convert → .bmp, potrace → .svg
//!  ├─ 3. Package   zip the SVGs, delete everything but the archive
//!  ├─ 4. Respond   HTML page, redirect to /result/<uuid>, or inline file
//!  └─ 5. Cleanup   delete uploads/<uuid>/ after a delay; periodic sweep
//! ```
//!
//! The rasterizer and tracer are external programs. This crate only
//! validates input, keeps the session directories in order, runs the tools
//! and cleans up after them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glyph2svg::{server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().uploads_dir("uploads").build()?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     server::run(listener, config, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! The conversion functions can also be used without the server:
//!
//! ```rust,no_run
//! use glyph2svg::{convert_batch, ServerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let font = std::fs::read("Roboto.ttf")?;
//! let output = convert_batch("Roboto.ttf", &font, &ServerConfig::default()).await?;
//! println!("{} SVGs in {}", output.artifacts.len(), output.session.dir.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `glyph2svg` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cleanup;
pub mod config;
pub mod convert;
pub mod error;
pub mod glyphs;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod session;

#[cfg(all(test, unix))]
mod test_support;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cleanup::{schedule_removal, spawn_periodic_sweep, sweep_stale, SweepReport};
pub use config::{ArtifactNaming, RenderSettings, ResponseMode, ServerConfig, ServerConfigBuilder};
pub use convert::{accept_upload, convert_batch, convert_text};
pub use error::{GlyphError, ToolError, ToolStep};
pub use glyphs::DEFAULT_GLYPHS;
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::tools::{check_tools, ToolStatus};
pub use session::{Artifact, SessionId, UploadSession};
