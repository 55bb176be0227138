// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background expiry of transfer entries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use printdrop_core::error::{PrintdropError, Result};

use crate::store::TransferStore;

/// Periodically removes transfers older than the configured age.
///
/// The first sweep happens one interval after `start`.
pub struct TransferSweeper {
    store: Arc<TransferStore>,
    interval: Duration,
    max_age: Duration,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl TransferSweeper {
    pub fn new(store: Arc<TransferStore>, interval: Duration, max_age: Duration) -> Self {
        Self {
            store,
            interval: interval.max(Duration::from_millis(1)),
            max_age,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Spawn the sweep loop. Calling `start` twice is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.task_handle.is_some() {
            debug!("transfer sweeper already running");
            return Ok(());
        }

        let max_age = chrono::Duration::from_std(self.max_age)
            .map_err(|e| PrintdropError::Server(format!("transfer max age out of range: {e}")))?;
        let store = Arc::clone(&self.store);
        let shutdown = Arc::clone(&self.shutdown_signal);
        let period = self.interval;

        info!(interval_secs = period.as_secs(), max_age_secs = self.max_age.as_secs(), "transfer sweeper started");

        self.task_handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        debug!("transfer sweeper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = store.sweep(Utc::now(), max_age).await;
                        debug!(removed, remaining = store.len(), "sweep pass finished");
                    }
                }
            }
        }));
        Ok(())
    }

    /// Signal the loop to exit and wait for it.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };
        self.shutdown_signal.notify_one();
        handle.await.map_err(|e| {
            warn!(error = %e, "transfer sweeper task ended abnormally");
            PrintdropError::Server(format!("sweeper task join: {e}"))
        })?;
        info!("transfer sweeper stopped");
        Ok(())
    }
}
