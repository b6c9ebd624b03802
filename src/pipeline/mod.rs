//! Pipeline stages for font-to-SVG conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own against a temporary directory.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ tools ─────────────────────▶ package
//! (validate,  (convert → .bmp,             (zip, prune)
//!  store)      potrace → .svg, per token)
//! ```
//!
//! 1. [`intake`]: check the extension, create the session directory and
//!    store the font
//! 2. [`tools`]: run the external rasterizer and tracer for one token
//! 3. [`package`]: bundle the SVGs into a ZIP and delete everything else

pub mod intake;
pub mod package;
pub mod tools;
