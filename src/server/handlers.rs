use super::{page, AppState};
use crate::cleanup;
use crate::config::{ResponseMode, ServerConfig};
use crate::convert;
use crate::error::GlyphError;
use crate::output::ConversionOutput;
use crate::session::{self, ListedFile, SessionId};
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

/// Fields of an upload form.
#[derive(Default)]
struct UploadForm {
    /// (client file name, payload)
    font: Option<(String, Bytes)>,
    text: Option<String>,
}

fn malformed(e: MultipartError) -> GlyphError {
    GlyphError::MalformedForm {
        detail: e.body_text(),
        status: e.status(),
    }
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, GlyphError> {
    let mut multipart = multipart.map_err(|e| GlyphError::MalformedForm {
        detail: e.body_text(),
        status: e.status(),
    })?;

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "font" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(malformed)?;
                form.font = Some((file_name, data));
            }
            "text" => form.text = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }
    Ok(form)
}

fn require_font(form: &UploadForm) -> Result<(&str, &Bytes), GlyphError> {
    match &form.font {
        Some((name, data)) if !name.is_empty() => Ok((name.as_str(), data)),
        _ => Err(GlyphError::MissingField { field: "font" }),
    }
}

pub(super) async fn method_not_allowed() -> GlyphError {
    GlyphError::MethodNotAllowed
}

pub(super) async fn batch_form(State(state): State<AppState>) -> Html<String> {
    Html(page::batch_form(
        &accept_attr(&state.config),
        state.config.glyphs.len(),
    ))
}

pub(super) async fn text_form(State(state): State<AppState>) -> Html<String> {
    Html(page::text_form(&accept_attr(&state.config)))
}

fn accept_attr(config: &ServerConfig) -> String {
    config
        .allowed_extensions
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub(super) async fn upload_batch(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GlyphError> {
    let form = read_form(multipart).await?;
    let (name, data) = require_font(&form)?;

    let output = convert::convert_batch(name, data, &state.config).await?;
    cleanup::schedule_removal(output.session.dir.clone(), state.config.cleanup_delay);
    respond(&state.config, &output).await
}

pub(super) async fn upload_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GlyphError> {
    let form = read_form(multipart).await?;
    let (name, data) = require_font(&form)?;
    let text = form
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(GlyphError::MissingField { field: "text" })?;

    let output = convert::convert_text(name, data, text, &state.config).await?;
    cleanup::schedule_removal(output.session.dir.clone(), state.config.cleanup_delay);
    respond(&state.config, &output).await
}

/// Answer a successful conversion according to the configured mode.
async fn respond(config: &ServerConfig, output: &ConversionOutput) -> Result<Response, GlyphError> {
    match config.response_mode {
        ResponseMode::Page => Ok(Html(page::success(output)).into_response()),
        ResponseMode::Redirect => Ok(Redirect::to(&output.session.result_url()).into_response()),
        ResponseMode::Inline => {
            // A batch without an archive has no single file to inline.
            let inline = match (&output.archive, output.artifacts.as_slice()) {
                (Some(archive), _) => archive,
                (None, [only]) => only,
                _ => return Ok(Html(page::success(output)).into_response()),
            };
            let body = tokio::fs::read(&inline.path).await.map_err(|e| {
                GlyphError::Internal(format!("reading {}: {e}", inline.path.display()))
            })?;
            let quoted = inline.name.replace('"', "_");
            let disposition = match output.archive {
                Some(_) => format!("attachment; filename=\"{quoted}\""),
                None => format!("inline; filename=\"{quoted}\""),
            };
            Ok((
                [
                    (header::CONTENT_TYPE, content_type(&inline.name).to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

pub(super) async fn result_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, GlyphError> {
    let id: SessionId = id.parse()?;
    let files = session::list_session(&state.config.uploads_dir, &id).await?;
    Ok(Html(page::result(&id, &files)))
}

#[derive(Serialize)]
pub(super) struct SessionListing {
    id: SessionId,
    files: Vec<ListedFile>,
}

pub(super) async fn session_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionListing>, GlyphError> {
    let id: SessionId = id.parse()?;
    let files = session::list_session(&state.config.uploads_dir, &id).await?;
    Ok(Json(SessionListing { id, files }))
}

pub(super) async fn download(
    State(state): State<AppState>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, GlyphError> {
    let id: SessionId = id.parse()?;
    let path = session::session_file(&state.config.uploads_dir, &id, &file)?;
    // The directory may have been cleaned up since the link was issued.
    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GlyphError::NotFound(format!("{id}/{file}")));
        }
        Err(e) => return Err(GlyphError::Internal(format!("reading {}: {e}", path.display()))),
    };
    Ok(([(header::CONTENT_TYPE, content_type(&file))], body).into_response())
}

/// Content type by file extension.
fn content_type(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("svg") => "image/svg+xml",
        Some("zip") => "application/zip",
        Some("bmp") => "image/bmp",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type("a.svg"), "image/svg+xml");
        assert_eq!(content_type("Font.ZIP"), "application/zip");
        assert_eq!(content_type("x"), "application/octet-stream");
    }
}
