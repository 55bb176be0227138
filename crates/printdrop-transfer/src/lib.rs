// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdrop-transfer: short-lived, code-gated file sharing.
//
// Uploads are stored under a six-digit code, optionally packed into one zip,
// and swept away after a fixed age.

pub mod archive;
pub mod code;
pub mod store;
pub mod sweeper;

pub use archive::{ArchiveSource, pack, sanitize_archive_path};
pub use code::issue_code;
pub use store::{Download, StagedFile, TransferStore, TransferStoreConfig, stored_name};
pub use sweeper::TransferSweeper;
