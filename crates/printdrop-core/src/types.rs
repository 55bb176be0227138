// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for print jobs and code-gated transfers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PrintdropError, Result};

/// Printer name recorded on a job when the caller did not choose a device.
pub const DEFAULT_PRINTER: &str = "default";

// ---------------------------------------------------------------------------
// Print jobs
// ---------------------------------------------------------------------------

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a print job.
///
/// Jobs move forward only:
/// `Pending -> [Converting] -> Printing -> {Completed, Error}`.
/// `Pending` and `Converting` may also fail straight to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted, nothing attempted yet.
    Pending,
    /// Being converted to PDF by the external converter.
    Converting,
    /// Handed to the print subsystem.
    Printing,
    /// The print subsystem accepted the document.
    Completed,
    /// Conversion or dispatch failed; see the job's error field.
    Error,
}

impl JobStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether moving from `self` to `next` respects the job state machine.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Converting)
                | (Pending, Printing)
                | (Pending, Error)
                | (Converting, Printing)
                | (Converting, Error)
                | (Printing, Completed)
                | (Printing, Error)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Converting => "converting",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Document formats accepted for printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    /// Legacy Word binary format.
    Doc,
    /// Office Open XML word-processing document.
    Docx,
}

impl DocumentType {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }

    /// Map an upload's declared MIME type. Parameters (`; charset=...`) are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Detect the type of an upload from its MIME type, falling back to the
    /// file name's extension when the browser sent a generic type.
    pub fn detect(mime: Option<&str>, filename: &str) -> Option<Self> {
        mime.and_then(Self::from_mime).or_else(|| {
            std::path::Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Self::from_extension)
        })
    }

    /// Whether the print subsystem needs this converted to PDF first.
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// One print request's tracked lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: JobId,
    /// Display name as supplied by the uploader.
    pub filename: String,
    /// Selected device, or [`DEFAULT_PRINTER`].
    pub printer_name: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// Set only when the job reaches `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when the job reaches `Error`.
    pub error: Option<String>,
}

impl PrintJob {
    pub fn new(filename: impl Into<String>, printer_name: Option<String>) -> Self {
        Self {
            id: JobId::new(),
            filename: filename.into(),
            printer_name: printer_name
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRINTER.to_string()),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// The device to pass to the print subsystem (`None` means system default).
    pub fn target_printer(&self) -> Option<&str> {
        if self.printer_name == DEFAULT_PRINTER {
            None
        } else {
            Some(&self.printer_name)
        }
    }
}

/// A print device reported by the print subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterInfo {
    pub name: String,
    pub is_default: bool,
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// Number of decimal digits in a transfer code.
pub const TRANSFER_CODE_LEN: usize = 6;

/// A short numeric code addressing one transfer entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferCode(String);

impl TransferCode {
    /// Parse a caller-supplied code: exactly six ASCII digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != TRANSFER_CODE_LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PrintdropError::InvalidCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build a code from a number below 1,000,000, zero-padded.
    pub fn from_number(n: u32) -> Result<Self> {
        if n >= 1_000_000 {
            return Err(PrintdropError::InvalidCode(n.to_string()));
        }
        Ok(Self(format!("{n:06}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransferCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TransferCode {
    type Err = PrintdropError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One stored file inside a transfer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFile {
    /// File name inside the transfer directory. Never exposed to clients.
    pub stored_name: String,
    /// Name the file is downloaded under.
    pub display_name: String,
    /// Path relative to the uploaded folder root (used to rebuild structure).
    pub relative_path: String,
    pub size_bytes: u64,
}

/// One upload batch addressed by a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEntry {
    pub code: TransferCode,
    /// Never empty while the entry is live.
    pub files: Vec<TransferFile>,
    pub uploaded_at: DateTime<Utc>,
    pub is_zipped: bool,
    /// Number of files before zipping. `Some` only when `is_zipped`.
    pub original_file_count: Option<usize>,
}

impl TransferEntry {
    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Whether the entry was uploaded more than `max_age` before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.uploaded_at) > max_age
    }

    pub fn summary(&self) -> TransferSummary {
        TransferSummary::from(self)
    }
}

/// Client-facing view of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFileSummary {
    pub index: usize,
    pub name: String,
    pub relative_path: String,
    pub size: u64,
}

/// Client-facing view of a transfer entry. Carries no storage paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub code: TransferCode,
    /// Display name of the first file.
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    /// Same as `total_size`; kept for single-file clients.
    pub size: u64,
    pub total_size: u64,
    pub file_count: usize,
    pub is_zipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_count: Option<usize>,
    pub files: Vec<TransferFileSummary>,
}

impl From<&TransferEntry> for TransferSummary {
    fn from(entry: &TransferEntry) -> Self {
        let total = entry.total_size_bytes();
        Self {
            code: entry.code.clone(),
            filename: entry
                .files
                .first()
                .map(|f| f.display_name.clone())
                .unwrap_or_default(),
            uploaded_at: entry.uploaded_at,
            size: total,
            total_size: total,
            file_count: entry.file_count(),
            is_zipped: entry.is_zipped,
            original_file_count: entry.original_file_count,
            files: entry
                .files
                .iter()
                .enumerate()
                .map(|(index, f)| TransferFileSummary {
                    index,
                    name: f.display_name.clone(),
                    relative_path: f.relative_path.clone(),
                    size: f.size_bytes,
                })
                .collect(),
        }
    }
}
