// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Code-keyed store of shared files.
//
// Every upload batch becomes one `TransferEntry` under a fresh six-digit
// code.  Entries live only in memory; their bytes live in the transfer
// directory under opaque stored names.  The map is guarded by a std mutex
// that is only ever held for in-memory work, never across an `.await`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use printdrop_core::config::ServiceConfig;
use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{TransferCode, TransferEntry, TransferFile, TransferSummary};

use crate::archive::{self, ArchiveSource, sanitize_archive_path};
use crate::code::issue_code;

/// Folder name used for zipped batches when the uploader gave none.
pub const DEFAULT_FOLDER_NAME: &str = "files";

/// Limits and location for a `TransferStore`.
#[derive(Debug, Clone)]
pub struct TransferStoreConfig {
    /// Directory holding every stored file.
    pub root: PathBuf,
    pub max_file_bytes: u64,
    pub max_batch_bytes: u64,
}

impl TransferStoreConfig {
    pub fn from_service_config(config: &ServiceConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: config.max_transfer_file_bytes,
            max_batch_bytes: config.max_batch_bytes,
        }
    }
}

/// A file already written to disk by the upload layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Name as sent by the uploader.
    pub display_name: String,
    /// Path inside the uploaded folder, if any.
    pub relative_path: Option<String>,
    pub size_bytes: u64,
}

/// A stored file resolved for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
}

/// Opaque on-disk name: `<unix millis>-<uuid><original extension>`.
pub fn stored_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}-{}{}", Utc::now().timestamp_millis(), Uuid::new_v4(), ext)
}

/// The transfer store.
#[derive(Debug)]
pub struct TransferStore {
    config: TransferStoreConfig,
    entries: Mutex<HashMap<TransferCode, TransferEntry>>,
}

impl TransferStore {
    /// Create the store, making sure its directory exists.
    pub fn open(config: TransferStoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root)?;
        info!(root = %config.root.display(), "transfer store ready");
        Ok(Self {
            config,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransferCode, TransferEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store one file under a new code.
    pub async fn ingest_single(&self, file: StagedFile) -> Result<TransferEntry> {
        self.ingest_batch(vec![file], false, None).await
    }

    /// Store a batch of files under one new code.
    ///
    /// With `zip` set and more than one file, the batch is packed into
    /// `<folder_name>.zip` and the originals are deleted.  Oversized batches
    /// are rejected as a whole and every staged file is removed.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn ingest_batch(
        &self,
        files: Vec<StagedFile>,
        zip: bool,
        folder_name: Option<&str>,
    ) -> Result<TransferEntry> {
        if files.is_empty() {
            return Err(PrintdropError::MissingUpload("no files in batch".into()));
        }

        if let Err(e) = self.check_limits(&files) {
            discard(files.iter().map(|f| f.path.as_path())).await;
            return Err(e);
        }

        let original_count = files.len();
        let (stored, is_zipped) = if zip && original_count > 1 {
            (vec![self.pack(files, folder_name).await?], true)
        } else {
            (self.adopt_all(files).await?, false)
        };

        let issued = {
            let mut entries = self.lock();
            let code = issue_code(|c| entries.contains_key(c));
            code.map(|code| {
                let entry = TransferEntry {
                    code: code.clone(),
                    files: stored.clone(),
                    uploaded_at: Utc::now(),
                    is_zipped,
                    original_file_count: is_zipped.then_some(original_count),
                };
                entries.insert(code, entry.clone());
                entry
            })
        };
        let entry = match issued {
            Ok(entry) => entry,
            Err(e) => {
                let orphans: Vec<PathBuf> = stored.iter().map(|f| self.config.root.join(&f.stored_name)).collect();
                discard(orphans.iter().map(PathBuf::as_path)).await;
                return Err(e);
            }
        };

        info!(
            code = %entry.code,
            file_count = entry.file_count(),
            total_bytes = entry.total_size_bytes(),
            is_zipped,
            "transfer stored"
        );
        Ok(entry)
    }

    fn check_limits(&self, files: &[StagedFile]) -> Result<()> {
        if let Some(big) = files.iter().find(|f| f.size_bytes > self.config.max_file_bytes) {
            warn!(name = %big.display_name, size = big.size_bytes, "file over per-file limit");
            return Err(PrintdropError::PayloadTooLarge {
                limit: self.config.max_file_bytes,
            });
        }
        let total: u64 = files.iter().map(|f| f.size_bytes).sum();
        if total > self.config.max_batch_bytes {
            warn!(total, "batch over total limit");
            return Err(PrintdropError::PayloadTooLarge {
                limit: self.config.max_batch_bytes,
            });
        }
        Ok(())
    }

    /// Zip the staged files into one stored archive.
    async fn pack(&self, files: Vec<StagedFile>, folder_name: Option<&str>) -> Result<TransferFile> {
        let folder = folder_name
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| sanitize_archive_path(f, DEFAULT_FOLDER_NAME))
            .and_then(|f| f.rsplit('/').next().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string());
        let display_name = format!("{folder}.zip");
        let stored = stored_name(&display_name);
        let destination = self.config.root.join(&stored);

        let sources: Vec<ArchiveSource> = files
            .iter()
            .map(|f| ArchiveSource {
                path: f.path.clone(),
                relative_path: f.relative_path.clone().unwrap_or_else(|| f.display_name.clone()),
            })
            .collect();

        let packed = tokio::task::spawn_blocking(move || archive::pack(&sources, &destination))
            .await
            .map_err(|e| PrintdropError::Archive(format!("packing task failed: {e}")))
            .and_then(|r| r);

        // Originals go either way: folded into the zip, or rejected with it.
        discard(files.iter().map(|f| f.path.as_path())).await;

        let size_bytes = packed?;
        Ok(TransferFile {
            stored_name: stored,
            relative_path: display_name.clone(),
            display_name,
            size_bytes,
        })
    }

    async fn adopt_all(&self, files: Vec<StagedFile>) -> Result<Vec<TransferFile>> {
        let mut stored = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            match self.adopt(file).await {
                Ok(f) => stored.push(f),
                Err(e) => {
                    let adopted = stored.iter().map(|f: &TransferFile| self.config.root.join(&f.stored_name));
                    let pending = files[i..].iter().map(|f| f.path.clone());
                    let doomed: Vec<PathBuf> = adopted.chain(pending).collect();
                    discard(doomed.iter().map(PathBuf::as_path)).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Take ownership of a staged file, moving it into the store directory
    /// unless it is already there.
    async fn adopt(&self, file: &StagedFile) -> Result<TransferFile> {
        let in_root = file.path.parent() == Some(self.config.root.as_path());
        let stored_name = match file.path.file_name().and_then(|n| n.to_str()) {
            Some(name) if in_root => name.to_string(),
            _ => {
                let name = stored_name(&file.display_name);
                tokio::fs::rename(&file.path, self.config.root.join(&name)).await?;
                name
            }
        };
        Ok(TransferFile {
            stored_name,
            display_name: file.display_name.clone(),
            relative_path: file
                .relative_path
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| file.display_name.clone()),
            size_bytes: file.size_bytes,
        })
    }

    /// Every live entry, newest upload first.
    pub fn list(&self) -> Vec<TransferSummary> {
        let mut entries: Vec<TransferSummary> = self.lock().values().map(TransferSummary::from).collect();
        entries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        entries
    }

    pub fn info(&self, code: &TransferCode) -> Result<TransferSummary> {
        self.lock()
            .get(code)
            .map(TransferSummary::from)
            .ok_or_else(|| not_found(code))
    }

    /// Resolve file `index` (default 0) of an entry for download.
    ///
    /// A file missing from disk is pruned from its entry, and the entry is
    /// dropped once it has no files left.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn download(&self, code: &TransferCode, index: Option<usize>) -> Result<Download> {
        let index = index.unwrap_or(0);
        let file = {
            let entries = self.lock();
            let entry = entries.get(code).ok_or_else(|| not_found(code))?;
            entry.files.get(index).cloned().ok_or_else(|| {
                PrintdropError::NotFound(format!("file {index} of transfer {code}"))
            })?
        };

        let path = self.config.root.join(&file.stored_name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(index, name = %file.display_name, "serving stored file");
            return Ok(Download {
                path,
                display_name: file.display_name,
                size_bytes: file.size_bytes,
            });
        }

        warn!(index, stored = %file.stored_name, "stored file missing, pruning");
        self.prune(code, &file.stored_name);
        Err(not_found(code))
    }

    fn prune(&self, code: &TransferCode, stored_name: &str) {
        let mut entries = self.lock();
        let emptied = match entries.get_mut(code) {
            Some(entry) => {
                entry.files.retain(|f| f.stored_name != stored_name);
                entry.files.is_empty()
            }
            None => false,
        };
        if emptied {
            entries.remove(code);
            info!(code = %code, "transfer removed, no files left");
        }
    }

    /// Remove an entry and, best effort, its files.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn delete(&self, code: &TransferCode) -> Result<()> {
        let entry = self.lock().remove(code).ok_or_else(|| not_found(code))?;
        self.remove_files(&entry).await;
        info!("transfer deleted");
        Ok(())
    }

    /// Remove every entry uploaded more than `max_age` before `now`.
    ///
    /// Entries go one at a time; the map is unlocked while each entry's files
    /// are deleted.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> usize {
        let expired: Vec<TransferCode> = self
            .lock()
            .values()
            .filter(|e| e.is_expired(now, max_age))
            .map(|e| e.code.clone())
            .collect();

        let mut removed = 0;
        for code in expired {
            let entry = {
                let mut entries = self.lock();
                match entries.get(&code) {
                    Some(e) if e.is_expired(now, max_age) => entries.remove(&code),
                    _ => None,
                }
            };
            if let Some(entry) = entry {
                self.remove_files(&entry).await;
                debug!(code = %code, "expired transfer swept");
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "swept expired transfers");
        }
        removed
    }

    async fn remove_files(&self, entry: &TransferEntry) {
        let paths: Vec<PathBuf> = entry
            .files
            .iter()
            .map(|f| self.config.root.join(&f.stored_name))
            .collect();
        discard(paths.iter().map(PathBuf::as_path)).await;
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn not_found(code: &TransferCode) -> PrintdropError {
    PrintdropError::NotFound(format!("transfer {code}"))
}

/// Delete files, logging anything other than "already gone".
async fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "could not delete file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Read;

    const MIB: u64 = 1024 * 1024;

    fn store(dir: &Path) -> TransferStore {
        TransferStore::open(TransferStoreConfig {
            root: dir.join("transfers"),
            max_file_bytes: 100 * MIB,
            max_batch_bytes: 10 * 1024 * MIB,
        })
        .expect("open")
    }

    fn stage(store: &TransferStore, name: &str, relative: Option<&str>, data: &[u8]) -> StagedFile {
        let path = store.root().join(stored_name(name));
        std::fs::write(&path, data).expect("stage");
        StagedFile {
            path,
            display_name: name.into(),
            relative_path: relative.map(str::to_string),
            size_bytes: data.len() as u64,
        }
    }

    fn root_file_count(store: &TransferStore) -> usize {
        std::fs::read_dir(store.root()).expect("read_dir").count()
    }

    #[test]
    fn stored_names_keep_extension() {
        let name = stored_name("Holiday Photo.JPG");
        assert!(name.ends_with(".JPG"));
        assert!(!name.contains("Holiday"));
        assert!(!stored_name("Makefile").contains('.'));
    }

    #[tokio::test]
    async fn single_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let staged = stage(&store, "slides.pdf", None, b"%PDF-1.7");

        let entry = store.ingest_single(staged).await.expect("ingest");
        assert_eq!(entry.code.as_str().len(), 6);
        assert_eq!(entry.files[0].relative_path, "slides.pdf");

        let info = store.info(&entry.code).expect("info");
        assert_eq!(info.filename, "slides.pdf");
        assert_eq!(info.size, 8);

        let dl = store.download(&entry.code, None).await.expect("download");
        assert_eq!(dl.display_name, "slides.pdf");
        assert_eq!(std::fs::read(&dl.path).expect("read"), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn three_file_batch_without_zip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let payloads: Vec<Vec<u8>> = (0..3u8)
            .map(|i| vec![i; (2 * MIB / 3) as usize])
            .collect();
        let names = ["a.bin", "b.bin", "c.bin"];
        let staged = names
            .iter()
            .zip(&payloads)
            .map(|(n, data)| stage(&store, n, Some(format!("set/{n}").as_str()), data))
            .collect();

        let entry = store.ingest_batch(staged, false, None).await.expect("ingest");
        assert_eq!(entry.file_count(), 3);
        assert!(!entry.is_zipped);
        assert_eq!(entry.original_file_count, None);

        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, entry.code);

        for (i, (name, data)) in names.iter().zip(&payloads).enumerate() {
            let dl = store.download(&entry.code, Some(i)).await.expect("download");
            assert_eq!(dl.display_name, *name);
            assert_eq!(&std::fs::read(&dl.path).expect("read"), data);
        }
        assert_eq!(listed[0].files[2].relative_path, "set/c.bin");
    }

    #[tokio::test]
    async fn zipped_batch_rebuilds_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let inputs = [
            ("readme.txt", "project/readme.txt", b"hi".as_slice()),
            ("main.rs", "project/src/main.rs", b"fn main() {}".as_slice()),
            ("logo.png", "project/assets/logo.png", b"\x89PNG".as_slice()),
        ];
        let staged = inputs
            .iter()
            .map(|(n, rel, data)| stage(&store, n, Some(*rel), data))
            .collect();

        let entry = store
            .ingest_batch(staged, true, Some("project"))
            .await
            .expect("ingest");
        assert!(entry.is_zipped);
        assert_eq!(entry.file_count(), 1);
        assert_eq!(entry.original_file_count, Some(3));
        assert_eq!(entry.files[0].display_name, "project.zip");
        assert_eq!(root_file_count(&store), 1, "originals removed");

        let dl = store.download(&entry.code, None).await.expect("download");
        let mut archive = zip::ZipArchive::new(std::fs::File::open(&dl.path).expect("open")).expect("zip");
        assert_eq!(archive.len(), 3);
        for (_, rel, data) in inputs {
            let mut buf = Vec::new();
            archive.by_name(rel).expect("entry").read_to_end(&mut buf).expect("read");
            assert_eq!(buf, data);
        }
    }

    #[tokio::test]
    async fn zip_flag_ignored_for_single_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let staged = vec![stage(&store, "only.txt", None, b"x")];

        let entry = store.ingest_batch(staged, true, None).await.expect("ingest");
        assert!(!entry.is_zipped);
        assert_eq!(entry.files[0].display_name, "only.txt");
    }

    #[tokio::test]
    async fn default_folder_name_for_zip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let staged = vec![stage(&store, "a.txt", None, b"a"), stage(&store, "b.txt", None, b"b")];

        let entry = store.ingest_batch(staged, true, Some("../")).await.expect("ingest");
        assert_eq!(entry.files[0].display_name, "files.zip");
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let err = store.ingest_batch(Vec::new(), false, None).await.expect_err("empty");
        assert!(matches!(err, PrintdropError::MissingUpload(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TransferStore::open(TransferStoreConfig {
            root: dir.path().join("transfers"),
            max_file_bytes: 10,
            max_batch_bytes: 15,
        })
        .expect("open");

        let staged = vec![stage(&store, "a.txt", None, b"12345678"), stage(&store, "b.txt", None, b"12345678")];
        let err = store.ingest_batch(staged, false, None).await.expect_err("too big");
        assert!(matches!(err, PrintdropError::PayloadTooLarge { limit: 15 }));
        assert_eq!(root_file_count(&store), 0);
        assert!(store.is_empty());

        let staged = vec![stage(&store, "big.txt", None, b"0123456789AB")];
        let err = store.ingest_batch(staged, false, None).await.expect_err("too big");
        assert!(matches!(err, PrintdropError::PayloadTooLarge { limit: 10 }));
        assert_eq!(root_file_count(&store), 0);
    }

    #[tokio::test]
    async fn archive_failure_discards_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let staged = vec![
            stage(&store, "a.txt", Some("docs/a.txt"), b"alpha"),
            stage(&store, "b.txt", Some("docs/b.txt"), b"beta"),
            stage(&store, "c.txt", Some("docs/c.txt"), b"gamma"),
        ];
        std::fs::remove_file(&staged[1].path).expect("remove");

        let err = store.ingest_batch(staged, true, Some("docs")).await.expect_err("pack fails");
        assert!(matches!(err, PrintdropError::Archive(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(root_file_count(&store), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn exhausted_code_space_discards_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        {
            let mut entries = store.lock();
            for n in crate::code::CODE_MIN..=crate::code::CODE_MAX {
                let code = TransferCode::from_number(n).expect("code");
                entries.insert(
                    code.clone(),
                    TransferEntry {
                        code,
                        files: Vec::new(),
                        uploaded_at: Utc::now(),
                        is_zipped: false,
                        original_file_count: None,
                    },
                );
            }
        }
        let live = store.len();

        let staged = vec![stage(&store, "a.txt", None, b"alpha"), stage(&store, "b.txt", None, b"beta")];
        let err = store.ingest_batch(staged, false, None).await.expect_err("no free code");
        assert!(matches!(err, PrintdropError::Server(_)));
        assert_eq!(root_file_count(&store), 0);
        assert_eq!(store.len(), live);
    }

    #[tokio::test]
    async fn staged_files_outside_root_are_moved_in() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let outside = dir.path().join("incoming.tmp");
        std::fs::write(&outside, b"data").expect("write");

        let entry = store
            .ingest_single(StagedFile {
                path: outside.clone(),
                display_name: "report.csv".into(),
                relative_path: None,
                size_bytes: 4,
            })
            .await
            .expect("ingest");

        assert!(!outside.exists());
        assert!(entry.files[0].stored_name.ends_with(".csv"));
        assert!(store.root().join(&entry.files[0].stored_name).exists());
    }

    #[tokio::test]
    async fn codes_are_unique_and_reusable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let mut codes = HashSet::new();
        for i in 0..200 {
            let staged = stage(&store, &format!("{i}.txt"), None, b"x");
            let entry = store.ingest_single(staged).await.expect("ingest");
            assert!(codes.insert(entry.code));
        }
        assert_eq!(store.len(), 200);

        let code = codes.iter().next().cloned().expect("one code");
        store.delete(&code).await.expect("delete");
        assert!(matches!(store.info(&code), Err(PrintdropError::NotFound(_))));
        assert_eq!(store.len(), 199);
    }

    #[tokio::test]
    async fn delete_removes_files_and_is_not_repeatable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let entry = store
            .ingest_single(stage(&store, "a.txt", None, b"a"))
            .await
            .expect("ingest");

        store.delete(&entry.code).await.expect("delete");
        assert_eq!(root_file_count(&store), 0);
        assert!(matches!(store.delete(&entry.code).await, Err(PrintdropError::NotFound(_))));
    }

    #[tokio::test]
    async fn unknown_code_and_index_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let unknown = TransferCode::parse("123456").expect("code");
        assert!(matches!(store.download(&unknown, None).await, Err(PrintdropError::NotFound(_))));

        let entry = store
            .ingest_single(stage(&store, "a.txt", None, b"a"))
            .await
            .expect("ingest");
        assert!(matches!(
            store.download(&entry.code, Some(1)).await,
            Err(PrintdropError::NotFound(_))
        ));
        assert_eq!(store.len(), 1, "bad index does not touch the entry");
    }

    #[tokio::test]
    async fn missing_files_are_pruned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let staged = vec![stage(&store, "a.txt", None, b"aaa"), stage(&store, "b.txt", None, b"bb")];
        let entry = store.ingest_batch(staged, false, None).await.expect("ingest");

        std::fs::remove_file(store.root().join(&entry.files[0].stored_name)).expect("rm");
        assert!(store.download(&entry.code, Some(0)).await.is_err());

        let info = store.info(&entry.code).expect("still live");
        assert_eq!(info.file_count, 1);
        assert_eq!(info.total_size, 2);
        assert_eq!(info.filename, "b.txt");

        std::fs::remove_file(store.root().join(&entry.files[1].stored_name)).expect("rm");
        assert!(store.download(&entry.code, None).await.is_err());
        assert!(store.info(&entry.code).is_err(), "empty entry dropped");
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_and_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let old = store
            .ingest_single(stage(&store, "old.txt", None, b"o"))
            .await
            .expect("ingest");
        let max_age = chrono::Duration::hours(24);

        assert_eq!(store.sweep(Utc::now(), max_age).await, 0);

        let later = Utc::now() + chrono::Duration::hours(25);
        assert_eq!(store.sweep(later, max_age).await, 1);
        assert_eq!(store.sweep(later, max_age).await, 0);
        assert!(store.info(&old.code).is_err());
        assert_eq!(root_file_count(&store), 0);
    }
}
