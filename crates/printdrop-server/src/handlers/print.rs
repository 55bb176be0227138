// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printing endpoints: devices, the job queue, and document submission.

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;
use tracing::{info, instrument};

use printdrop_core::error::PrintdropError;
use printdrop_core::types::{DocumentType, PrintJob, PrinterInfo};
use printdrop_print::PrintUpload;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::upload::{discard_files, stage_multipart};

const DOCUMENT_FIELD: &str = "document";
const PRINTER_FIELD: &str = "printer";

#[derive(Debug, Serialize)]
pub struct PrintersResponse {
    pub printers: Vec<PrinterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub queue: Vec<PrintJob>,
}

#[derive(Debug, Serialize)]
pub struct PrintResponse {
    pub success: bool,
    pub message: String,
    pub job: PrintJob,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed: usize,
}

pub async fn list_printers(State(state): State<AppState>) -> ApiResult<Json<PrintersResponse>> {
    if !state.print.printing_available() {
        return Ok(Json(PrintersResponse {
            printers: Vec::new(),
            message: Some("Printing is not available on this server.".into()),
        }));
    }
    let printers = state.print.printers().await?;
    Ok(Json(PrintersResponse {
        printers,
        message: None,
    }))
}

pub async fn list_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    Json(QueueResponse {
        queue: state.print.list(state.config.queue_view_limit),
    })
}

pub async fn clear_completed(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.print.clear_terminal();
    Json(ClearResponse { success: true, removed })
}

/// Accept one document and print it before answering.
#[instrument(skip_all)]
pub async fn print_document(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<PrintResponse>> {
    let mut form = stage_multipart(multipart, &state.uploads_dir, state.config.max_print_bytes).await?;

    let mut documents = form.take_files(DOCUMENT_FIELD);
    let printer = form.text(PRINTER_FIELD).map(str::to_string);
    form.discard().await;

    if documents.is_empty() {
        return Err(PrintdropError::MissingUpload(format!("no '{DOCUMENT_FIELD}' field")).into());
    }
    let document = documents.remove(0);
    discard_files(&documents).await;

    let Some(document_type) = DocumentType::detect(document.content_type.as_deref(), &document.file_name) else {
        discard_files(std::slice::from_ref(&document)).await;
        let detail = document
            .content_type
            .clone()
            .unwrap_or_else(|| document.display_name());
        return Err(PrintdropError::UnsupportedDocument(detail).into());
    };

    let filename = document.display_name();
    info!(file = %filename, ?document_type, size = document.size_bytes, "print request received");

    let job = state
        .print
        .print(PrintUpload {
            filename: filename.clone(),
            document_type,
            path: document.path,
            printer,
        })
        .await?;

    Ok(Json(PrintResponse {
        success: true,
        message: format!("\"{filename}\" was sent to the printer"),
        job,
    }))
}
