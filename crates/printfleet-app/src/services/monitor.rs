// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Periodic fleet status sweep.

use std::future::Future;
use std::time::Duration;

use printfleet_core::DeviceStatus;
use printfleet_fleet::{FleetService, Reply};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub online: usize,
    pub idle: usize,
    pub offline: usize,
}

/// Query every printer once and log what came back.
pub async fn sweep(fleet: &FleetService) -> SweepSummary {
    let entries = match fleet.fleet_status().await {
        Reply::Ok(entries) => entries,
        Reply::Err(e) => {
            warn!(error = %e.error, "could not list printers");
            return SweepSummary::default();
        }
    };

    let mut summary = SweepSummary::default();
    for entry in &entries {
        match &entry.status {
            DeviceStatus::Online { status, .. } => {
                summary.online += 1;
                if status.print_stats.is_idle() {
                    summary.idle += 1;
                }
                debug!(printer_id = %entry.printer.id, state = %status.print_stats.state, "printer online");
            }
            DeviceStatus::Offline { error, .. } => {
                summary.offline += 1;
                debug!(printer_id = %entry.printer.id, %error, "printer offline");
            }
        }
    }
    info!(
        online = summary.online,
        idle = summary.idle,
        offline = summary.offline,
        "fleet status"
    );
    summary
}

/// Sweep every `interval` until `shutdown` resolves.
pub async fn run(fleet: &FleetService, interval: Duration, shutdown: impl Future<Output = ()>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(interval_secs = interval.as_secs(), "status monitor started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep(fleet).await;
            }
            () = &mut shutdown => {
                info!("status monitor stopped");
                return;
            }
        }
    }
}
