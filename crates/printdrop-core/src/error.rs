// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Printdrop.

use thiserror::Error;

use crate::types::JobStatus;

/// Top-level error type for all Printdrop operations.
#[derive(Debug, Error)]
pub enum PrintdropError {
    // -- Input validation --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("no file uploaded: {0}")]
    MissingUpload(String),

    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("malformed transfer code: {0:?}")]
    InvalidCode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // -- Conversion --
    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("conversion timed out after {0}s")]
    ConversionTimeout(u64),

    // -- Dispatch --
    #[error("{0}")]
    Dispatch(String),

    #[error("printing is not available on this host")]
    PlatformUnavailable,

    // -- Ledger / store --
    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal job transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("archive failed: {0}")]
    Archive(String),

    // -- Infrastructure --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Server(String),
}

impl PrintdropError {
    /// Whether the caller sent something we refuse, as opposed to a failure on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDocument(_)
                | Self::MissingUpload(_)
                | Self::PayloadTooLarge { .. }
                | Self::InvalidCode(_)
                | Self::InvalidRequest(_)
        )
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            e if e.is_client_error() => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdropError>;
