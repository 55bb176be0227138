// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people using the LAN front-end.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the front-end presents the message.

use serde::Serialize;

use crate::error::PrintdropError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Might work if tried again.
    Transient,
    /// User must do something different (other file, smaller upload).
    ActionRequired,
    /// Will not work on this server as configured.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Convert a `PrintdropError` into a `HumanError`.
pub fn humanize_error(err: &PrintdropError) -> HumanError {
    match err {
        // -- Input validation --
        PrintdropError::UnsupportedDocument(detail) => HumanError::new(
            "Only PDF or Word files can be printed (.pdf, .doc, .docx).",
            format!("Save the document as a PDF and try again. (File type: {detail})"),
            Severity::ActionRequired,
        ),

        PrintdropError::MissingUpload(_) => HumanError::new(
            "Please choose a file to upload.",
            "Pick at least one file, then send the form again.",
            Severity::ActionRequired,
        ),

        PrintdropError::PayloadTooLarge { limit } => HumanError::new(
            "The file is larger than this server accepts.",
            format!("Keep uploads under {}.", format_bytes(*limit)),
            Severity::ActionRequired,
        ),

        PrintdropError::InvalidCode(_) => HumanError::new(
            "That doesn't look like a transfer code.",
            "Transfer codes are exactly six digits, for example 042917.",
            Severity::ActionRequired,
        ),

        PrintdropError::InvalidRequest(detail) => HumanError::new(
            "The request was not understood.",
            format!("Reload the page and try again. ({detail})"),
            Severity::ActionRequired,
        ),

        // -- Conversion --
        PrintdropError::Conversion(detail) => HumanError::new(
            "The document could not be converted for printing.",
            format!(
                "Make sure LibreOffice is installed on the print server, or upload a PDF instead. ({detail})"
            ),
            Severity::Permanent,
        ),

        PrintdropError::ConversionTimeout(secs) => HumanError::new(
            "Converting the document took too long.",
            format!("The converter gave up after {secs} seconds. Try a smaller document or a PDF."),
            Severity::Transient,
        ),

        // -- Dispatch --
        PrintdropError::Dispatch(detail) => HumanError::new(
            format!("Printing failed: {detail}"),
            "Check that the printer is switched on and has paper, then send the document again.",
            Severity::Transient,
        ),

        PrintdropError::PlatformUnavailable => HumanError::new(
            "Printing is not available on this server.",
            "The server has no print system installed. File transfer still works.",
            Severity::Permanent,
        ),

        // -- Ledger / store --
        PrintdropError::NotFound(_) => HumanError::new(
            "File not found, or the code is wrong.",
            "Check the six-digit code. Shared files are removed after 24 hours.",
            Severity::ActionRequired,
        ),

        PrintdropError::InvalidTransition { .. } => HumanError::new(
            "The print job is in an unexpected state.",
            "Send the document again as a new job.",
            Severity::Transient,
        ),

        PrintdropError::Archive(_) => HumanError::new(
            "The folder could not be packed into a zip file.",
            "Try again, or upload without creating a zip.",
            Severity::Transient,
        ),

        // -- Infrastructure --
        PrintdropError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError::new(
                    "The file couldn't be found on the server.",
                    "It may have expired or been deleted. Upload it again.",
                    Severity::ActionRequired,
                )
            } else {
                HumanError::new(
                    "There was a problem reading or writing a file on the server.",
                    "Try again. If this keeps happening, the server's disk may be full.",
                    Severity::Transient,
                )
            }
        }

        PrintdropError::Serialization(_) | PrintdropError::Server(_) => HumanError::new(
            "Server error.",
            "Try again. If this keeps happening, restart the print server.",
            Severity::Transient,
        ),
    }
}

/// Render a byte count the way people read upload limits.
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB && bytes % GIB == 0 {
        format!("{} GB", bytes / GIB)
    } else if bytes >= MIB {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}
