// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printdrop Print: hands documents to the host print subsystem and tracks
// every print request in an in-memory job ledger.  `PrintService` drives one
// job through conversion and dispatch, recording each state transition.

pub mod dispatch;
pub mod ledger;
pub mod service;

pub use dispatch::{CupsDispatcher, PrinterDispatcher, UnavailableDispatcher, system_dispatcher};
pub use ledger::JobLedger;
pub use service::{PrintFailure, PrintService, PrintServiceConfig, PrintUpload};
