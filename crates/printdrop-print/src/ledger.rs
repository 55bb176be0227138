// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory print job ledger.
//
// The ledger keeps every job accepted since start-up in submission order and
// enforces the job state machine on each update.  Nothing is persisted: a
// restart starts with an empty ledger.  Callers only ever see the most recent
// slice via `recent`, newest first.

use chrono::Utc;
use tracing::{debug, info, instrument};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{JobId, JobStatus, PrintJob};

/// Append-mostly collection of print jobs.
///
/// Not synchronised; `PrintService` owns it behind a mutex.
#[derive(Debug, Default)]
pub struct JobLedger {
    /// Oldest first.
    jobs: Vec<PrintJob>,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly created job.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub fn insert(&mut self, job: PrintJob) {
        info!(filename = %job.filename, printer = %job.printer_name, "job added to ledger");
        self.jobs.push(job);
    }

    /// Move a job to `next`, returning the updated record.
    ///
    /// `error` is stored only when moving to `JobStatus::Error`.  An illegal
    /// move is rejected and the record is left unchanged.
    #[instrument(skip(self), fields(job_id = %id))]
    pub fn transition(&mut self, id: &JobId, next: JobStatus, error: Option<&str>) -> Result<PrintJob> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.id == *id)
            .ok_or_else(|| PrintdropError::NotFound(format!("job {id}")))?;

        if !job.status.can_transition_to(next) {
            return Err(PrintdropError::InvalidTransition {
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        match next {
            JobStatus::Completed => job.completed_at = Some(Utc::now()),
            JobStatus::Error => {
                job.error = Some(error.unwrap_or("unknown error").to_string());
            }
            _ => {}
        }

        debug!(status = %next, "job status updated");
        Ok(job.clone())
    }

    /// The `limit` most recently submitted jobs, newest first.
    pub fn recent(&self, limit: usize) -> Vec<PrintJob> {
        self.jobs.iter().rev().take(limit).cloned().collect()
    }

    /// Drop every `Completed` or `Error` job.  Returns how many were removed.
    #[instrument(skip(self))]
    pub fn clear_terminal(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !j.status.is_terminal());
        let removed = before - self.jobs.len();
        info!(removed, remaining = self.jobs.len(), "cleared finished jobs");
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
