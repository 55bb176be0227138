// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.
//
// Settings come from `<data_dir>/config.json` when present, then from
// environment overrides.  Every field has a default so a partial file works.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Runtime settings for the print and transfer service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    pub bind_address: IpAddr,
    /// HTTP port (default 3000).
    pub port: u16,
    /// Root for uploads and transfers. `None` resolves to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Static front-end served at `/`. Nothing is served when unset.
    pub public_dir: Option<PathBuf>,
    /// Largest document accepted for printing.
    pub max_print_bytes: u64,
    /// Largest single file accepted for transfer.
    pub max_transfer_file_bytes: u64,
    /// Largest total size of one transfer batch.
    pub max_batch_bytes: u64,
    /// Age after which transfer entries are swept.
    pub transfer_max_age_secs: u64,
    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
    /// Hard limit on one document conversion.
    pub conversion_timeout_secs: u64,
    /// Grace period before a printed file is deleted.
    pub cleanup_delay_secs: u64,
    /// Number of jobs returned by the queue listing.
    pub queue_view_limit: usize,
    /// Explicit path to the LibreOffice `soffice` binary.
    pub soffice_path: Option<PathBuf>,
    /// Advertise the service on the LAN via mDNS.
    pub advertise_mdns: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            data_dir: None,
            public_dir: None,
            max_print_bytes: 50 * MIB,
            max_transfer_file_bytes: 100 * MIB,
            max_batch_bytes: 10 * GIB,
            transfer_max_age_secs: 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
            conversion_timeout_secs: 60,
            cleanup_delay_secs: 5,
            queue_view_limit: 50,
            soffice_path: None,
            advertise_mdns: true,
        }
    }
}

impl ServiceConfig {
    /// Load `config.json` from `dir`, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                Self::default()
            }
        }
    }

    /// Like [`load`](Self::load), but writes the defaults out on first run so
    /// there is a file to edit.  A failed write is logged, not fatal.
    pub fn load_or_init(dir: &Path) -> Self {
        if dir.join(CONFIG_FILE).exists() {
            return Self::load(dir);
        }
        let config = Self::default();
        match config.save(dir) {
            Ok(()) => info!(path = %dir.join(CONFIG_FILE).display(), "wrote default config"),
            Err(e) => warn!(error = %e, "could not write default config"),
        }
        config
    }

    /// Write the config as pretty JSON into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE), json)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `PORT`, `PRINTDROP_BIND`, `PRINTDROP_DATA_DIR`,
    /// `PRINTDROP_PUBLIC_DIR`, `PRINTDROP_SOFFICE`.  Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!(value = %port, "ignoring invalid PORT"),
            }
        }
        if let Some(bind) = lookup("PRINTDROP_BIND") {
            match bind.parse() {
                Ok(addr) => self.bind_address = addr,
                Err(_) => warn!(value = %bind, "ignoring invalid PRINTDROP_BIND"),
            }
        }
        if let Some(dir) = lookup("PRINTDROP_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("PRINTDROP_PUBLIC_DIR") {
            self.public_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("PRINTDROP_SOFFICE") {
            self.soffice_path = Some(PathBuf::from(path));
        }
    }

    pub fn transfer_max_age(&self) -> Duration {
        Duration::from_secs(self.transfer_max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }
}
