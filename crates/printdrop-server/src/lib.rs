// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdrop-server: HTTP surface of the print spooler and file drop.

pub mod data_dir;
pub mod error;
pub mod handlers;
pub mod mdns;
pub mod state;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use data_dir::DataPaths;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use handlers::{health, print, transfer};

/// Multipart framing allowance on top of the largest accepted payload.
const BODY_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_batch_bytes
        .max(state.config.max_print_bytes)
        .saturating_add(BODY_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);
    let public_dir = state.config.public_dir.clone();

    let api = Router::new()
        .route("/api/printers", get(print::list_printers))
        .route("/api/queue", get(print::list_queue))
        .route("/api/queue/completed", delete(print::clear_completed))
        .route("/api/print", post(print::print_document))
        .route("/api/transfer/upload", post(transfer::upload_single))
        .route("/api/transfer/upload-batch", post(transfer::upload_batch))
        .route("/api/transfer/list", get(transfer::list))
        .route("/api/transfer/info/{code}", get(transfer::info))
        .route("/api/transfer/download/{code}", get(transfer::download_first))
        .route("/api/transfer/download/{code}/{index}", get(transfer::download_indexed))
        .route("/api/transfer/delete/{code}", delete(transfer::delete))
        .route("/health", get(health::health))
        .with_state(state);

    let app = match public_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}
