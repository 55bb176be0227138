// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory layout.

use std::path::{Path, PathBuf};

use printdrop_core::error::Result;

const APP_DIR: &str = "printdrop";
const UPLOADS_DIR: &str = "uploads";
const TRANSFERS_DIR: &str = "transfers";

/// Where the server keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
    /// Documents waiting to be printed.
    pub uploads: PathBuf,
    /// Files shared by transfer code.
    pub transfers: PathBuf,
}

impl DataPaths {
    /// Lay out `root`, creating every directory.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let paths = Self {
            uploads: root.join(UPLOADS_DIR),
            transfers: root.join(TRANSFERS_DIR),
            root,
        };
        std::fs::create_dir_all(&paths.uploads)?;
        std::fs::create_dir_all(&paths.transfers)?;
        Ok(paths)
    }
}

/// Default data root: `$XDG_DATA_HOME/printdrop`, then
/// `~/.local/share/printdrop`, then `/tmp/printdrop`.
pub fn default_data_dir() -> PathBuf {
    base_dir(|key| std::env::var(key).ok()).join(APP_DIR)
}

fn base_dir(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(xdg) = lookup("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = lookup("HOME").filter(|v| !v.is_empty()) {
        return Path::new(&home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}
