// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintFleet — fleet orchestration daemon for Moonraker 3D printers
//
// Entry point. Initialises logging and backend services, then sweeps fleet
// status on an interval until interrupted. Exits non-zero if storage cannot
// be opened.

mod services;

use std::process::ExitCode;

use services::app_services::AppServices;
use services::monitor;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("PrintFleet starting");

    let svc = match AppServices::init() {
        Ok(s) => {
            tracing::info!(data_dir = %s.data_dir().display(), "backend services initialised");
            s
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.code(), "persistent storage failed");
            return ExitCode::FAILURE;
        }
    };

    match svc.fleet().list_printers().into_result() {
        Ok(printers) => tracing::info!(count = printers.len(), "printers registered"),
        Err(e) => tracing::warn!(error = %e.error, "could not read printer registry"),
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
    };
    monitor::run(svc.fleet(), svc.config().status_interval(), shutdown).await;

    tracing::info!("PrintFleet stopped");
    ExitCode::SUCCESS
}
