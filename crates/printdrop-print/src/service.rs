// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job orchestration.
//
// `PrintService` drives one uploaded document through
// Pending -> [Converting] -> Printing -> {Completed, Error}, recording every
// step in the shared `JobLedger`.  Each job is driven by the request that
// submitted it; there is no background worker and no retry.  A failed job is
// terminal and the uploader re-submits.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use printdrop_core::config::ServiceConfig;
use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{DocumentType, JobId, JobStatus, PrintJob, PrinterInfo};
use printdrop_document::Converter;

use crate::dispatch::PrinterDispatcher;
use crate::ledger::JobLedger;

/// Knobs for `PrintService`.
#[derive(Debug, Clone)]
pub struct PrintServiceConfig {
    /// Directory converted PDFs are written into.
    pub work_dir: PathBuf,
    pub conversion_timeout: Duration,
    /// Delay between a successful print and deleting the printed file.
    pub cleanup_delay: Duration,
}

impl PrintServiceConfig {
    pub fn from_service_config(config: &ServiceConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            conversion_timeout: config.conversion_timeout(),
            cleanup_delay: config.cleanup_delay(),
        }
    }
}

/// A document already staged on disk, waiting to be printed.
#[derive(Debug, Clone)]
pub struct PrintUpload {
    /// Name the uploader gave the file.
    pub filename: String,
    pub document_type: DocumentType,
    /// Staged bytes. Owned by the service from `submit` onwards.
    pub path: PathBuf,
    /// Requested device; `None` or blank means the system default.
    pub printer: Option<String>,
}

/// A job that ended in `Error`, with the cause.
#[derive(Debug)]
pub struct PrintFailure {
    pub job: PrintJob,
    pub error: PrintdropError,
}

impl std::fmt::Display for PrintFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job {} failed: {}", self.job.id, self.error)
    }
}

impl std::error::Error for PrintFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Owner of the job ledger and the conversion/dispatch capabilities.
#[derive(Clone)]
pub struct PrintService {
    ledger: Arc<Mutex<JobLedger>>,
    converter: Arc<dyn Converter>,
    dispatcher: Arc<dyn PrinterDispatcher>,
    config: PrintServiceConfig,
}

impl PrintService {
    pub fn new(
        config: PrintServiceConfig,
        converter: Arc<dyn Converter>,
        dispatcher: Arc<dyn PrinterDispatcher>,
    ) -> Self {
        Self::with_ledger(Arc::new(Mutex::new(JobLedger::new())), config, converter, dispatcher)
    }

    /// Build around an existing ledger handle.
    pub fn with_ledger(
        ledger: Arc<Mutex<JobLedger>>,
        config: PrintServiceConfig,
        converter: Arc<dyn Converter>,
        dispatcher: Arc<dyn PrinterDispatcher>,
    ) -> Self {
        Self {
            ledger,
            converter,
            dispatcher,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new `Pending` job for `upload`.
    pub fn submit(&self, upload: &PrintUpload) -> PrintJob {
        let job = PrintJob::new(upload.filename.clone(), upload.printer.clone());
        self.lock().insert(job.clone());
        job
    }

    /// Submit `upload` and drive it to a terminal state.
    pub async fn print(&self, upload: PrintUpload) -> std::result::Result<PrintJob, PrintFailure> {
        let job = self.submit(&upload);
        self.drive(job, upload).await
    }

    /// Drive a submitted job through conversion and dispatch.
    ///
    /// On success the job is `Completed` and the printed file is removed after
    /// the configured grace delay.  On failure the job is `Error` and every
    /// file it owned has already been removed.
    #[instrument(skip(self, job, upload), fields(job_id = %job.id, doc_type = ?upload.document_type))]
    pub async fn drive(&self, job: PrintJob, upload: PrintUpload) -> std::result::Result<PrintJob, PrintFailure> {
        let id = job.id;

        if !self.dispatcher.available() {
            warn!("no print subsystem, failing job before conversion");
            return Err(self.fail(&job, &upload.path, PrintdropError::PlatformUnavailable).await);
        }

        let mut working = upload.path.clone();

        if upload.document_type.needs_conversion() {
            self.advance(&id, JobStatus::Converting)
                .map_err(|e| PrintFailure { job: job.clone(), error: e })?;

            match self.convert(&upload.path).await {
                Ok(pdf) => {
                    if pdf != upload.path {
                        remove_quietly(&upload.path).await;
                    }
                    working = pdf;
                }
                Err(e) => return Err(self.fail(&job, &upload.path, e).await),
            }
        }

        self.advance(&id, JobStatus::Printing)
            .map_err(|e| PrintFailure { job: job.clone(), error: e })?;

        if let Err(e) = self.dispatcher.print(&working, job.target_printer()).await {
            error!(error = %e, "dispatch failed");
            return Err(self.fail(&job, &working, e).await);
        }

        let done = self
            .advance(&id, JobStatus::Completed)
            .map_err(|e| PrintFailure { job: job.clone(), error: e })?;
        info!(printer = %done.printer_name, "job completed");

        self.schedule_cleanup(working);
        Ok(done)
    }

    /// Run the converter under the configured timeout.
    ///
    /// A failed or abandoned conversion may still have written its PDF, so
    /// the expected output is removed on every error path.
    async fn convert(&self, input: &Path) -> Result<PathBuf> {
        let limit = self.config.conversion_timeout;
        let result = match tokio::time::timeout(limit, self.converter.convert_to_pdf(input, &self.config.work_dir)).await {
            Ok(result) => result,
            Err(_) => {
                // Dropping the conversion future kills the child process.
                error!(timeout_secs = limit.as_secs(), "conversion timed out");
                Err(PrintdropError::ConversionTimeout(limit.as_secs()))
            }
        };
        if result.is_err() {
            if let Some(output) = expected_output(input, &self.config.work_dir) {
                remove_quietly(&output).await;
            }
        }
        result
    }

    fn advance(&self, id: &JobId, next: JobStatus) -> Result<PrintJob> {
        self.lock().transition(id, next, None)
    }

    /// Move the job to `Error`, delete `path` and package the failure.
    async fn fail(&self, job: &PrintJob, path: &Path, cause: PrintdropError) -> PrintFailure {
        let message = cause.to_string();
        let recorded = self.lock().transition(&job.id, JobStatus::Error, Some(&message));
        remove_quietly(path).await;

        let job = match recorded {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "could not record job failure");
                job.clone()
            }
        };
        PrintFailure { job, error: cause }
    }

    fn schedule_cleanup(&self, path: PathBuf) {
        let delay = self.config.cleanup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            remove_quietly(&path).await;
            debug!(path = %path.display(), "printed file cleaned up");
        });
    }

    /// The most recent `limit` jobs, newest first.
    pub fn list(&self, limit: usize) -> Vec<PrintJob> {
        self.lock().recent(limit)
    }

    /// Remove all finished jobs, returning how many went.
    pub fn clear_terminal(&self) -> usize {
        self.lock().clear_terminal()
    }

    pub fn job_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether this host can print at all.
    pub fn printing_available(&self) -> bool {
        self.dispatcher.available()
    }

    pub async fn printers(&self) -> Result<Vec<PrinterInfo>> {
        self.dispatcher.printers().await
    }
}

/// Where a converter writes the PDF for `input`: `<work_dir>/<stem>.pdf`.
fn expected_output(input: &Path, work_dir: &Path) -> Option<PathBuf> {
    let mut name = input.file_stem()?.to_os_string();
    name.push(".pdf");
    let output = work_dir.join(name);
    (output != input).then_some(output)
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    /// Records the job status seen at conversion and dispatch time.
    struct Observer {
        ledger: Arc<Mutex<JobLedger>>,
        seen: Mutex<Vec<JobStatus>>,
    }

    impl Observer {
        fn record(&self) {
            let status = self
                .ledger
                .lock()
                .expect("ledger")
                .recent(1)
                .first()
                .map(|j| j.status);
            if let Some(status) = status {
                self.seen.lock().expect("seen").push(status);
            }
        }
    }

    struct FakeConverter {
        observer: Arc<Observer>,
        delay: Duration,
        fail: bool,
        writes_early: bool,
    }

    #[async_trait]
    impl Converter for FakeConverter {
        async fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
            self.observer.record();
            let out = output_dir.join(input.with_extension("pdf").file_name().expect("name"));
            if self.writes_early {
                tokio::fs::write(&out, b"%PDF-1.7").await?;
            }
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(PrintdropError::Conversion("source file could not be loaded".into()));
            }
            tokio::fs::write(&out, b"%PDF-1.7").await?;
            Ok(out)
        }
    }

    struct FakeDispatcher {
        observer: Arc<Observer>,
        available: bool,
        failure: Option<String>,
        printed: Mutex<Vec<(PathBuf, Option<String>)>>,
    }

    #[async_trait]
    impl PrinterDispatcher for FakeDispatcher {
        fn available(&self) -> bool {
            self.available
        }

        async fn printers(&self) -> Result<Vec<PrinterInfo>> {
            Ok(vec![PrinterInfo {
                name: "Office".into(),
                is_default: true,
            }])
        }

        async fn print(&self, document: &Path, printer: Option<&str>) -> Result<()> {
            self.observer.record();
            self.printed
                .lock()
                .expect("printed")
                .push((document.to_path_buf(), printer.map(str::to_string)));
            match &self.failure {
                Some(msg) => Err(PrintdropError::Dispatch(msg.clone())),
                None => Ok(()),
            }
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        service: PrintService,
        observer: Arc<Observer>,
        dispatcher: Arc<FakeDispatcher>,
    }

    #[derive(Default)]
    struct Options {
        conversion_delay: Duration,
        conversion_fails: bool,
        output_before_delay: bool,
        unavailable: bool,
        dispatch_failure: Option<String>,
        timeout: Option<Duration>,
    }

    fn harness(opts: Options) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Arc::new(Mutex::new(JobLedger::new()));
        let observer = Arc::new(Observer {
            ledger: Arc::clone(&ledger),
            seen: Mutex::new(Vec::new()),
        });
        let converter = Arc::new(FakeConverter {
            observer: Arc::clone(&observer),
            delay: opts.conversion_delay,
            fail: opts.conversion_fails,
            writes_early: opts.output_before_delay,
        });
        let dispatcher = Arc::new(FakeDispatcher {
            observer: Arc::clone(&observer),
            available: !opts.unavailable,
            failure: opts.dispatch_failure,
            printed: Mutex::new(Vec::new()),
        });
        let config = PrintServiceConfig {
            work_dir: dir.path().to_path_buf(),
            conversion_timeout: opts.timeout.unwrap_or(Duration::from_secs(5)),
            cleanup_delay: Duration::from_millis(20),
        };
        let service = PrintService::with_ledger(ledger, config, converter, dispatcher.clone());
        Harness {
            dir,
            service,
            observer,
            dispatcher,
        }
    }

    fn stage(dir: &Path, name: &str, doc: DocumentType, printer: Option<&str>) -> PrintUpload {
        let path = dir.join(format!("staged-{name}"));
        assert!(name.ends_with(doc.extension()));
        std::fs::write(&path, b"payload").expect("stage");
        PrintUpload {
            filename: name.into(),
            document_type: doc,
            path,
            printer: printer.map(str::to_string),
        }
    }

    fn seen(h: &Harness) -> Vec<JobStatus> {
        h.observer.seen.lock().expect("seen").clone()
    }

    #[tokio::test]
    async fn docx_walks_every_state() {
        let h = harness(Options::default());
        let upload = stage(h.dir.path(), "letter.docx", DocumentType::Docx, None);
        let original = upload.path.clone();

        let job = h.service.print(upload).await.expect("prints");

        assert_eq!(seen(&h), [JobStatus::Converting, JobStatus::Printing]);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(!original.exists(), "original removed after conversion");

        let listed = h.service.list(50);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, JobStatus::Completed);

        let printed = h.dispatcher.printed.lock().expect("printed").clone();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].0.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(printed[0].1, None);
    }

    #[tokio::test]
    async fn pdf_skips_conversion_and_uses_printer() {
        let h = harness(Options::default());
        let upload = stage(h.dir.path(), "slides.pdf", DocumentType::Pdf, Some("Office"));

        let job = h.service.print(upload).await.expect("prints");

        assert_eq!(seen(&h), [JobStatus::Printing]);
        assert_eq!(job.printer_name, "Office");
        let printed = h.dispatcher.printed.lock().expect("printed").clone();
        assert_eq!(printed[0].1.as_deref(), Some("Office"));
    }

    #[tokio::test]
    async fn printed_file_is_cleaned_up_after_delay() {
        let h = harness(Options::default());
        let upload = stage(h.dir.path(), "slides.pdf", DocumentType::Pdf, None);
        let path = upload.path.clone();

        h.service.print(upload).await.expect("prints");
        assert!(path.exists(), "kept during grace period");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn dispatch_error_is_recorded_verbatim() {
        let h = harness(Options {
            dispatch_failure: Some("lp: printer is out of paper".into()),
            ..Default::default()
        });
        let upload = stage(h.dir.path(), "slides.pdf", DocumentType::Pdf, None);
        let path = upload.path.clone();

        let failure = h.service.print(upload).await.expect_err("fails");

        assert_eq!(failure.job.status, JobStatus::Error);
        assert_eq!(failure.job.error.as_deref(), Some("lp: printer is out of paper"));
        assert!(failure.job.completed_at.is_none());
        assert!(!path.exists(), "removed immediately");
    }

    #[tokio::test]
    async fn conversion_failure_skips_printing() {
        let h = harness(Options {
            conversion_fails: true,
            ..Default::default()
        });
        let upload = stage(h.dir.path(), "broken.doc", DocumentType::Doc, None);
        let path = upload.path.clone();

        let failure = h.service.print(upload).await.expect_err("fails");

        assert!(matches!(failure.error, PrintdropError::Conversion(_)));
        assert_eq!(failure.job.status, JobStatus::Error);
        assert!(h.dispatcher.printed.lock().expect("printed").is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn slow_conversion_times_out() {
        let h = harness(Options {
            conversion_delay: Duration::from_secs(10),
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let upload = stage(h.dir.path(), "huge.docx", DocumentType::Docx, None);

        let failure = h.service.print(upload).await.expect_err("times out");

        assert!(matches!(failure.error, PrintdropError::ConversionTimeout(_)));
        assert_eq!(failure.job.status, JobStatus::Error);
        assert!(h.dispatcher.printed.lock().expect("printed").is_empty());
    }

    #[tokio::test]
    async fn late_timeout_removes_converted_output() {
        let h = harness(Options {
            conversion_delay: Duration::from_secs(5),
            output_before_delay: true,
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let upload = stage(h.dir.path(), "x.docx", DocumentType::Docx, None);

        let failure = h.service.print(upload).await.expect_err("times out");

        assert!(matches!(failure.error, PrintdropError::ConversionTimeout(_)));
        assert_eq!(failure.job.status, JobStatus::Error);
        let left: Vec<_> = std::fs::read_dir(h.dir.path()).expect("read_dir").collect();
        assert!(left.is_empty(), "work dir not empty: {left:?}");
    }

    #[tokio::test]
    async fn failed_conversion_removes_partial_output() {
        let h = harness(Options {
            conversion_fails: true,
            output_before_delay: true,
            ..Default::default()
        });
        let upload = stage(h.dir.path(), "broken.doc", DocumentType::Doc, None);

        h.service.print(upload).await.expect_err("fails");

        assert_eq!(std::fs::read_dir(h.dir.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn expected_output_sits_in_work_dir() {
        assert_eq!(
            expected_output(Path::new("/in/123-report.v2.docx"), Path::new("/work")),
            Some(PathBuf::from("/work/123-report.v2.pdf"))
        );
        assert_eq!(expected_output(Path::new("/work/a.pdf"), Path::new("/work")), None);
    }

    #[tokio::test]
    async fn missing_print_subsystem_fails_before_conversion() {
        let h = harness(Options {
            unavailable: true,
            ..Default::default()
        });
        let upload = stage(h.dir.path(), "letter.docx", DocumentType::Docx, None);
        let path = upload.path.clone();

        let failure = h.service.print(upload).await.expect_err("fails");

        assert!(matches!(failure.error, PrintdropError::PlatformUnavailable));
        assert!(seen(&h).is_empty(), "converter never ran");
        assert!(!path.exists());
        assert!(!h.service.printing_available());
    }

    #[tokio::test]
    async fn clear_terminal_after_mixed_results() {
        let h = harness(Options::default());
        let ok = stage(h.dir.path(), "ok.pdf", DocumentType::Pdf, None);
        h.service.print(ok).await.expect("prints");

        let pending = stage(h.dir.path(), "later.pdf", DocumentType::Pdf, None);
        h.service.submit(&pending);

        assert_eq!(h.service.job_count(), 2);
        assert_eq!(h.service.clear_terminal(), 1);
        assert_eq!(h.service.clear_terminal(), 0);
        assert_eq!(h.service.list(50)[0].status, JobStatus::Pending);
    }
}
