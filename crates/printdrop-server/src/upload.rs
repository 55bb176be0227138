// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multipart staging.
//
// File fields are streamed chunk by chunk straight to disk under opaque
// stored names, so no upload is ever held in memory.  A file that grows past
// the per-file cap aborts the whole form and every file staged so far is
// deleted.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_transfer::stored_name;

/// One file field written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// Form field name, without any `[]` suffix.
    pub field: String,
    pub path: PathBuf,
    /// File name as sent by the browser, which may include folders.
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

impl StagedUpload {
    /// Last path component of the sent file name.
    pub fn display_name(&self) -> String {
        base_name(&self.file_name)
    }
}

/// Everything a multipart form carried.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<StagedUpload>,
    fields: Vec<(String, String)>,
}

impl UploadForm {
    /// First value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated text field, in form order.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Whether a text field holds a truthy value (`true`, `1`, `on`).
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes"))
            .unwrap_or(false)
    }

    /// Remove and return the files sent under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<StagedUpload> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == name);
        self.files = kept;
        taken
    }

    /// Delete every staged file still held by the form.
    pub async fn discard(self) {
        discard_files(&self.files).await;
    }
}

/// Delete staged files, ignoring ones already gone.
pub async fn discard_files(files: &[StagedUpload]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %file.path.display(), error = %e, "could not delete staged upload");
            }
        }
    }
}

/// Read a whole multipart form, staging file fields into `dir`.
pub async fn stage_multipart(mut multipart: Multipart, dir: &Path, max_file_bytes: u64) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    match read_form(&mut multipart, &mut form, dir, max_file_bytes).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn read_form(multipart: &mut Multipart, form: &mut UploadForm, dir: &Path, max_file_bytes: u64) -> Result<()> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PrintdropError::InvalidRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field_key(field.name().unwrap_or_default()).to_string();
        let file_name = field.file_name().map(str::to_string);
        match file_name {
            // Browsers send an empty file part when nothing was chosen.
            Some(file_name) if file_name.is_empty() => continue,
            Some(file_name) => {
                let staged = stage_field(field, name, file_name, dir, max_file_bytes).await?;
                form.files.push(staged);
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| PrintdropError::InvalidRequest(format!("unreadable field {name}: {e}")))?;
                form.fields.push((name, value));
            }
        }
    }
    Ok(())
}

async fn stage_field(
    mut field: Field<'_>,
    name: String,
    file_name: String,
    dir: &Path,
    max_file_bytes: u64,
) -> Result<StagedUpload> {
    let content_type = field.content_type().map(str::to_string);
    let path = dir.join(stored_name(&file_name));

    let written = async {
        let mut out = tokio::fs::File::create(&path).await?;
        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| PrintdropError::InvalidRequest(format!("upload interrupted: {e}")))?
        {
            size += chunk.len() as u64;
            if size > max_file_bytes {
                return Err(PrintdropError::PayloadTooLarge { limit: max_file_bytes });
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        Ok::<u64, PrintdropError>(size)
    }
    .await;

    match written {
        Ok(size_bytes) => {
            debug!(field = %name, file = %file_name, size = size_bytes, "upload staged");
            Ok(StagedUpload {
                field: name,
                path,
                file_name,
                content_type,
                size_bytes,
            })
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %rm, "could not delete partial upload");
                }
            }
            Err(e)
        }
    }
}

/// `files[]` and `files` name the same field.
fn field_key(name: &str) -> &str {
    name.strip_suffix("[]").unwrap_or(name)
}

fn base_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .find(|c| !c.is_empty())
        .unwrap_or(file_name)
        .to_string()
}
