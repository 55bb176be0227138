// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File transfer endpoints.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{info, instrument};

use printdrop_core::error::PrintdropError;
use printdrop_core::types::{TransferCode, TransferSummary};
use printdrop_transfer::StagedFile;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::upload::{StagedUpload, stage_multipart};

const FILE_FIELD: &str = "file";
const FILES_FIELD: &str = "files";
const RELATIVE_PATHS_FIELD: &str = "relativePaths";
const CREATE_ZIP_FIELD: &str = "createZip";
const FOLDER_NAME_FIELD: &str = "folderName";

/// Bytes left unescaped in an RFC 5987 `ext-value` (`attr-char`).
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub code: TransferCode,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    pub success: bool,
    pub code: TransferCode,
    pub files: Vec<UploadedFile>,
    pub total_size: u64,
    pub file_count: usize,
    pub is_zipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<TransferSummary>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

fn staged_file(upload: StagedUpload, relative_path: Option<&str>) -> StagedFile {
    let display_name = upload.display_name();
    // Folder pickers put the path in the file name when no explicit one is sent.
    let relative_path = relative_path
        .map(str::to_string)
        .or_else(|| (upload.file_name != display_name).then(|| upload.file_name.clone()));
    StagedFile {
        path: upload.path,
        display_name,
        relative_path,
        size_bytes: upload.size_bytes,
    }
}

#[instrument(skip_all)]
pub async fn upload_single(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    let root = state.transfers.root().to_path_buf();
    let mut form = stage_multipart(multipart, &root, state.config.max_transfer_file_bytes).await?;
    let mut files = form.take_files(FILE_FIELD);
    form.discard().await;

    if files.is_empty() {
        return Err(PrintdropError::MissingUpload(format!("no '{FILE_FIELD}' field")).into());
    }
    let first = files.remove(0);
    crate::upload::discard_files(&files).await;

    let entry = state.transfers.ingest_single(staged_file(first, None)).await?;
    let filename = entry.files.first().map(|f| f.display_name.clone()).unwrap_or_default();
    Ok(Json(UploadResponse {
        success: true,
        code: entry.code,
        filename,
    }))
}

#[instrument(skip_all)]
pub async fn upload_batch(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<BatchUploadResponse>> {
    let root = state.transfers.root().to_path_buf();
    let mut form = stage_multipart(multipart, &root, state.config.max_transfer_file_bytes).await?;
    let uploads = form.take_files(FILES_FIELD);
    let relative_paths: Vec<String> = form.texts(RELATIVE_PATHS_FIELD).into_iter().map(str::to_string).collect();
    let zip = form.flag(CREATE_ZIP_FIELD);
    let folder_name = form.text(FOLDER_NAME_FIELD).map(str::to_string);
    form.discard().await;

    let staged: Vec<StagedFile> = uploads
        .into_iter()
        .enumerate()
        .map(|(i, upload)| {
            let relative = relative_paths.get(i).map(String::as_str).filter(|p| !p.is_empty());
            staged_file(upload, relative)
        })
        .collect();

    let entry = state
        .transfers
        .ingest_batch(staged, zip, folder_name.as_deref())
        .await?;

    Ok(Json(BatchUploadResponse {
        success: true,
        files: entry
            .files
            .iter()
            .map(|f| UploadedFile {
                name: f.display_name.clone(),
                size: f.size_bytes,
            })
            .collect(),
        total_size: entry.total_size_bytes(),
        file_count: entry.file_count(),
        is_zipped: entry.is_zipped,
        original_file_count: entry.original_file_count,
        code: entry.code,
    }))
}

pub async fn list(State(state): State<AppState>) -> Json<ListResponse> {
    Json(ListResponse {
        files: state.transfers.list(),
    })
}

pub async fn info(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<TransferSummary>> {
    let code = TransferCode::parse(&code)?;
    Ok(Json(state.transfers.info(&code)?))
}

pub async fn download_first(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Response> {
    download(&state, &code, None).await
}

pub async fn download_indexed(
    State(state): State<AppState>,
    Path((code, index)): Path<(String, String)>,
) -> ApiResult<Response> {
    let index = index
        .parse::<usize>()
        .map_err(|_| PrintdropError::InvalidRequest(format!("file index must be a number, got {index:?}")))?;
    download(&state, &code, Some(index)).await
}

#[instrument(skip(state))]
async fn download(state: &AppState, code: &str, index: Option<usize>) -> ApiResult<Response> {
    let code = TransferCode::parse(code)?;
    let file = state.transfers.download(&code, index).await?;

    let handle = tokio::fs::File::open(&file.path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PrintdropError::NotFound(format!("transfer {code}"))
        } else {
            e.into()
        }
    })?;
    let length = handle.metadata().await.map_err(PrintdropError::from)?.len();

    info!(code = %code, name = %file.display_name, size = length, "serving download");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, content_disposition(&file.display_name))
        .body(Body::from_stream(ReaderStream::new(handle)))
        .map_err(|e| PrintdropError::Server(format!("build response: {e}")))?;
    Ok(response)
}

pub async fn delete(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<DeleteResponse>> {
    let code = TransferCode::parse(&code)?;
    state.transfers.delete(&code).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: "File deleted".into(),
    }))
}

/// `attachment` disposition; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == name {
        format!("attachment; filename=\"{name}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(name, ATTR_CHAR)
        )
    }
}
