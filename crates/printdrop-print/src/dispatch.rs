// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatch through the host print subsystem.
//
// On Unix hosts documents go to CUPS via the `lp` / `lpstat` command line
// tools.  The print subsystem is a black box: `lp` either accepts the file
// (exit 0) or it does not, and its stderr becomes the job's error verbatim.
// Hosts without CUPS get `UnavailableDispatcher`, which fails every call with
// `PlatformUnavailable`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::PrinterInfo;

/// Capability: hand a printable file to the print subsystem.
#[async_trait]
pub trait PrinterDispatcher: Send + Sync {
    /// Whether a print subsystem exists on this host at all.
    fn available(&self) -> bool {
        true
    }

    /// Devices the subsystem knows about.
    async fn printers(&self) -> Result<Vec<PrinterInfo>>;

    /// Submit `document` (a PDF) to `printer`, or the system default when `None`.
    async fn print(&self, document: &Path, printer: Option<&str>) -> Result<()>;
}

/// The best dispatcher for this host.
pub fn system_dispatcher() -> Arc<dyn PrinterDispatcher> {
    if cfg!(unix) {
        let cups = CupsDispatcher::default();
        if cups.available() {
            return Arc::new(cups);
        }
        warn!("CUPS `lp` not found on PATH, printing disabled");
    } else {
        warn!("no supported print subsystem on this platform, printing disabled");
    }
    Arc::new(UnavailableDispatcher)
}

// ---------------------------------------------------------------------------
// CUPS
// ---------------------------------------------------------------------------

/// Dispatcher driving the CUPS command line tools.
#[derive(Debug, Clone)]
pub struct CupsDispatcher {
    lp: PathBuf,
    lpstat: PathBuf,
}

impl Default for CupsDispatcher {
    fn default() -> Self {
        Self {
            lp: PathBuf::from("lp"),
            lpstat: PathBuf::from("lpstat"),
        }
    }
}

impl CupsDispatcher {
    /// Use explicit tool paths (tests, non-standard installs).
    pub fn with_tools(lp: impl Into<PathBuf>, lpstat: impl Into<PathBuf>) -> Self {
        Self {
            lp: lp.into(),
            lpstat: lpstat.into(),
        }
    }

    async fn lpstat(&self, flag: &str) -> Result<std::process::Output> {
        Command::new(&self.lpstat)
            .arg(flag)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.lpstat, e))
    }
}

#[async_trait]
impl PrinterDispatcher for CupsDispatcher {
    fn available(&self) -> bool {
        resolve_program(&self.lp).is_some()
    }

    #[instrument(skip(self))]
    async fn printers(&self) -> Result<Vec<PrinterInfo>> {
        let listing = self.lpstat("-e").await?;
        let stdout = String::from_utf8_lossy(&listing.stdout);
        let stderr = String::from_utf8_lossy(&listing.stderr);

        if !listing.status.success() {
            // `lpstat` exits non-zero when nothing is configured.
            if stderr.contains("No destinations") {
                debug!("no CUPS destinations configured");
                return Ok(Vec::new());
            }
            return Err(PrintdropError::Dispatch(command_failure("lpstat", &listing.status, &stderr)));
        }

        let default = match self.lpstat("-d").await {
            Ok(out) => parse_default_destination(&String::from_utf8_lossy(&out.stdout)),
            Err(e) => {
                warn!(error = %e, "could not query default destination");
                None
            }
        };

        let printers = parse_destinations(&stdout, default.as_deref());
        debug!(count = printers.len(), "listed CUPS destinations");
        Ok(printers)
    }

    #[instrument(skip(self), fields(document = %document.display()))]
    async fn print(&self, document: &Path, printer: Option<&str>) -> Result<()> {
        let mut cmd = Command::new(&self.lp);
        if let Some(name) = printer {
            cmd.arg("-d").arg(name);
        }
        cmd.arg("--").arg(document);

        let output = cmd
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.lp, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintdropError::Dispatch(command_failure("lp", &output.status, &stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        info!(printer = printer.unwrap_or("default"), response = %stdout.trim(), "document sent to CUPS");
        Ok(())
    }
}

/// Dispatcher for hosts without a print subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDispatcher;

#[async_trait]
impl PrinterDispatcher for UnavailableDispatcher {
    fn available(&self) -> bool {
        false
    }

    async fn printers(&self) -> Result<Vec<PrinterInfo>> {
        Err(PrintdropError::PlatformUnavailable)
    }

    async fn print(&self, _document: &Path, _printer: Option<&str>) -> Result<()> {
        Err(PrintdropError::PlatformUnavailable)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn spawn_error(program: &Path, e: std::io::Error) -> PrintdropError {
    if e.kind() == std::io::ErrorKind::NotFound {
        PrintdropError::PlatformUnavailable
    } else {
        PrintdropError::Dispatch(format!("could not start {}: {e}", program.display()))
    }
}

/// Prefer the tool's own message; fall back to the exit status.
fn command_failure(tool: &str, status: &std::process::ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{tool} exited with {status}")
    } else {
        stderr.to_string()
    }
}

/// Parse `lpstat -e`: one destination per line.
fn parse_destinations(stdout: &str, default: Option<&str>) -> Vec<PrinterInfo> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| PrinterInfo {
            name: name.to_string(),
            is_default: default == Some(name),
        })
        .collect()
}

/// Parse `lpstat -d`: `system default destination: NAME`.
fn parse_default_destination(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.split_once("destination:"))
        .map(|(_, name)| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Resolve a bare program name against `$PATH`; explicit paths must exist.
fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
