// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printdrop: LAN print spooler and code-gated file drop
//
// Entry point. Initialises logging, loads configuration, wires the print and
// transfer services, and serves HTTP until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use printdrop_core::config::ServiceConfig;
use printdrop_core::error::{PrintdropError, Result};
use printdrop_document::SofficeConverter;
use printdrop_print::system_dispatcher;
use printdrop_server::data_dir::{DataPaths, default_data_dir};
use printdrop_server::mdns::MdnsAdvertiser;
use printdrop_server::{AppState, build_router};
use printdrop_transfer::TransferSweeper;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Printdrop starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Printdrop stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // The config file lives in the data dir, which the environment may move.
    let env_root: Option<PathBuf> = std::env::var_os("PRINTDROP_DATA_DIR").map(Into::into);
    let root = env_root.clone().unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&root)?;

    let mut config = ServiceConfig::load_or_init(&root);
    config.apply_env();
    let root = config.data_dir.clone().or(env_root).unwrap_or(root);
    let paths = DataPaths::create(&root)?;
    tracing::info!(data_dir = %paths.root.display(), "data directory ready");

    let converter = Arc::new(SofficeConverter::locate(config.soffice_path.clone()));
    let dispatcher = system_dispatcher();
    let addr = SocketAddr::new(config.bind_address, config.port);
    let advertise = config.advertise_mdns;
    let sweep_interval = config.sweep_interval();
    let max_age = config.transfer_max_age();

    let state = AppState::new(config, &paths, converter, dispatcher)?;
    let mut sweeper = TransferSweeper::new(Arc::clone(&state.transfers), sweep_interval, max_age);
    sweeper.start()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PrintdropError::Server(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "Printdrop listening");

    let mdns = if advertise { MdnsAdvertiser::register(addr.port()) } else { None };

    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PrintdropError::Server(format!("serve: {e}")));

    if let Some(mdns) = mdns {
        mdns.unregister();
    }
    sweeper.stop().await?;
    tracing::info!("Printdrop stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received terminate signal"),
    }
}
