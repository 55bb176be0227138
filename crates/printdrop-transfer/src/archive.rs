// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip packaging for folder uploads.
//
// Files are streamed from disk into a Deflate (level 6) archive.  The archive
// is written to `<destination>.partial` and renamed into place only once it
// is complete, so a reader never sees a truncated zip.  This module does
// blocking I/O; async callers go through `spawn_blocking`.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use printdrop_core::error::{PrintdropError, Result};

const COMPRESSION_LEVEL: i64 = 6;

/// One file to put in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    pub path: PathBuf,
    /// Location inside the archive, as sent by the uploader.
    pub relative_path: String,
}

/// Turn an uploader-supplied path into a safe archive entry name.
///
/// Backslashes become `/`, and empty, `.` and `..` components are dropped so
/// an entry can never escape the extraction directory.  Falls back to
/// `fallback` when nothing is left.
pub fn sanitize_archive_path(relative: &str, fallback: &str) -> String {
    let normalised = relative.replace('\\', "/");
    let cleaned = normalised
        .split('/')
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect::<Vec<_>>()
        .join("/");
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Pack `sources` into a zip at `destination`, returning the archive size.
///
/// On failure nothing is left at `destination` or at the partial path.
#[instrument(skip(sources), fields(files = sources.len(), dest = %destination.display()))]
pub fn pack(sources: &[ArchiveSource], destination: &Path) -> Result<u64> {
    let partial = partial_path(destination);

    let result = write_archive(sources, &partial)
        .and_then(|size| std::fs::rename(&partial, destination).map(|()| size).map_err(Into::into));

    match result {
        Ok(size) => {
            info!(size, "archive written");
            Ok(size)
        }
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&partial) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %partial.display(), error = %rm, "could not remove partial archive");
                }
            }
            Err(match e {
                PrintdropError::Archive(_) => e,
                other => PrintdropError::Archive(other.to_string()),
            })
        }
    }
}

fn write_archive(sources: &[ArchiveSource], partial: &Path) -> Result<u64> {
    let file = File::create(partial)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .unix_permissions(0o644);

    let mut used = HashSet::new();
    for source in sources {
        let fallback = source
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");
        let name = unique_name(sanitize_archive_path(&source.relative_path, fallback), &mut used);

        zip.start_file(name.as_str(), options)
            .map_err(|e| PrintdropError::Archive(format!("add {name}: {e}")))?;
        let mut input = File::open(&source.path)
            .map_err(|e| PrintdropError::Archive(format!("open {}: {e}", source.path.display())))?;
        let copied = std::io::copy(&mut input, &mut zip)
            .map_err(|e| PrintdropError::Archive(format!("write {name}: {e}")))?;
        debug!(entry = %name, bytes = copied, "added to archive");
    }

    let file = zip
        .finish()
        .map_err(|e| PrintdropError::Archive(format!("finish: {e}")))?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

/// Zip entries must be unique; later duplicates get a ` (n)` suffix.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => (stem.to_string(), format!(".{ext}")),
        _ => (name.clone(), String::new()),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}
