// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error responses.
//
// Handlers return `ApiError`, which renders any `PrintdropError` as
// `{error, suggestion}` JSON with the status from the error taxonomy.  Print
// failures also carry the failed job.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

use printdrop_core::error::PrintdropError;
use printdrop_core::human_errors::{Severity, humanize_error};
use printdrop_core::types::PrintJob;
use printdrop_print::PrintFailure;

/// Error body sent to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub suggestion: String,
    /// How the front-end should present the failure.
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<PrintJob>,
}

#[derive(Debug)]
pub struct ApiError {
    pub error: PrintdropError,
    pub job: Option<PrintJob>,
}

impl From<PrintdropError> for ApiError {
    fn from(error: PrintdropError) -> Self {
        Self { error, job: None }
    }
}

impl From<PrintFailure> for ApiError {
    fn from(failure: PrintFailure) -> Self {
        Self {
            error: failure.error,
            job: Some(failure.job),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.error, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.error, "request rejected");
        }

        let human = humanize_error(&self.error);
        let body = ErrorBody {
            error: human.message,
            suggestion: human.suggestion,
            severity: human.severity,
            job: self.job,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
