//! Glyph tokens: the fixed batch list and the rules for turning a token into
//! a file name and a rasterizer draw directive.

use crate::error::GlyphError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Tokens rendered by the batch endpoint when no custom list is configured.
pub const DEFAULT_GLYPHS: &[&str] = &[
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16",
    "17", "18", "19", "20", "30", "40", "50", "60", "70", "80", "90", "00", "6.", "6_", "9.", "9_",
];

/// Replacement for every character that is unsafe in a file name.
pub const SUBSTITUTE: char = '_';

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Owned copy of [`DEFAULT_GLYPHS`].
pub fn default_glyphs() -> Vec<String> {
    DEFAULT_GLYPHS.iter().map(|s| s.to_string()).collect()
}

/// Turn a token into a file stem that stays inside the session directory.
///
/// Rejects empty tokens and tokens that would sanitise to only dots
/// (`.` / `..` are not usable file stems).
pub fn sanitize_token(token: &str) -> Result<String, GlyphError> {
    if token.is_empty() {
        return Err(GlyphError::InvalidToken {
            token: token.to_string(),
            reason: "text must not be empty".into(),
        });
    }
    let stem = UNSAFE_CHARS
        .replace_all(token, SUBSTITUTE.to_string().as_str())
        .into_owned();
    if stem.chars().all(|c| c == '.') {
        return Err(GlyphError::InvalidToken {
            token: token.to_string(),
            reason: "text cannot be used as a file name".into(),
        });
    }
    Ok(stem)
}

/// Check a whole glyph set: every token sanitises, and no two collide.
pub fn validate_glyph_set(glyphs: &[String]) -> Result<(), GlyphError> {
    if glyphs.is_empty() {
        return Err(GlyphError::InvalidConfig("glyph list is empty".into()));
    }
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(glyphs.len());
    for token in glyphs {
        let stem =
            sanitize_token(token).map_err(|e| GlyphError::InvalidConfig(e.to_string()))?;
        if let Some(prev) = seen.insert(stem.clone(), token) {
            return Err(GlyphError::InvalidConfig(format!(
                "glyphs '{prev}' and '{token}' both map to file name '{stem}'"
            )));
        }
    }
    Ok(())
}

/// ImageMagick `-draw` argument that writes `token` at `(x, y)`.
///
/// The token is quoted with single quotes. Quotes and backslashes are
/// backslash-escaped, `%` is doubled so ImageMagick does not expand it as a
/// property escape, and a leading `@` is escaped so the text is never read
/// from a file.
pub fn draw_directive(token: &str, x: u32, y: u32) -> String {
    let mut escaped = String::with_capacity(token.len() + 2);
    if token.starts_with('@') {
        escaped.push('\\');
    }
    for c in token.chars() {
        match c {
            '\'' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '%' => escaped.push_str("%%"),
            c => escaped.push(c),
        }
    }
    format!("text {x},{y} '{escaped}'")
}
