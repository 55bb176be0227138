// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared state handed to every request handler.

use std::path::PathBuf;
use std::sync::Arc;

use printdrop_core::config::ServiceConfig;
use printdrop_core::error::Result;
use printdrop_document::Converter;
use printdrop_print::{PrintService, PrintServiceConfig, PrinterDispatcher};
use printdrop_transfer::{TransferStore, TransferStoreConfig};

use crate::data_dir::DataPaths;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub print: PrintService,
    pub transfers: Arc<TransferStore>,
    /// Staging directory for documents sent to print.
    pub uploads_dir: PathBuf,
}

impl AppState {
    /// Wire the services together over `paths`.
    pub fn new(
        config: ServiceConfig,
        paths: &DataPaths,
        converter: Arc<dyn Converter>,
        dispatcher: Arc<dyn PrinterDispatcher>,
    ) -> Result<Self> {
        let print = PrintService::new(
            PrintServiceConfig::from_service_config(&config, &paths.uploads),
            converter,
            dispatcher,
        );
        let transfers = TransferStore::open(TransferStoreConfig::from_service_config(&config, &paths.transfers))?;

        Ok(Self {
            config: Arc::new(config),
            print,
            transfers: Arc::new(transfers),
            uploads_dir: paths.uploads.clone(),
        })
    }
}
