//! HTTP surface: upload forms, conversion endpoints, result lookup and
//! downloads, plus the background cleanup tasks that go with them.
//!
//! | Method | Path                   | Handler |
//! |--------|------------------------|---------|
//! | GET    | `/`                    | batch upload form |
//! | POST   | `/`                    | convert the preset glyph list |
//! | GET    | `/upload`              | single-text upload form |
//! | POST   | `/upload`              | convert one user-supplied text |
//! | GET    | `/result/{id}`         | HTML listing of a session directory |
//! | GET    | `/api/sessions/{id}`   | the same listing as JSON |
//! | GET    | `/uploads/{id}/{file}` | download one file |
//! | GET    | `/healthz`             | liveness |

mod handlers;
pub mod page;

use crate::cleanup;
use crate::config::ServerConfig;
use crate::error::GlyphError;
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route(
            "/",
            get(handlers::batch_form)
                .post(handlers::upload_batch)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/upload",
            get(handlers::text_form)
                .post(handlers::upload_text)
                .fallback(handlers::method_not_allowed),
        )
        .route("/result/:id", get(handlers::result_page))
        .route("/api/sessions/:id", get(handlers::session_json))
        .route("/uploads/:id/:file", get(handlers::download))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
///
/// Creates the uploads root if needed and starts the periodic sweep when
/// one is configured.
pub async fn run<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> Result<(), GlyphError>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .map_err(|e| GlyphError::StorageFailed {
            path: config.uploads_dir.clone(),
            source: e,
        })?;

    let sweeper = config.sweep_interval.map(|interval| {
        cleanup::spawn_periodic_sweep(config.uploads_dir.clone(), interval, config.sweep_max_age)
    });

    let addr = listener
        .local_addr()
        .map_err(|e| GlyphError::Internal(format!("listener address: {e}")))?;
    info!(
        "Serving on http://{} (uploads in {})",
        addr,
        config.uploads_dir.display()
    );

    let app = router(AppState::new(config));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GlyphError::Internal(format!("server error: {e}")));

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("Server stopped");
    served
}

impl IntoResponse for GlyphError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        } else {
            info!("Request rejected ({}): {}", status.as_u16(), self);
        }
        (status, self.to_string()).into_response()
    }
}
