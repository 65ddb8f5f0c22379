// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status aggregation over unreliable controllers.
//
// A snapshot needs four independent calls (info, print stats, temperatures,
// files).  They run concurrently and the snapshot is all-or-nothing: if any
// one fails the printer is reported offline with that error, never with
// partial data.  `StatusReport` keeps the per-call outcomes for diagnostics;
// `DeviceStatus` is the collapsed view everything else consumes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use printfleet_core::error::{FleetError, Result};
use printfleet_core::types::{DeviceStatus, OnlineStatus, PrintStats, Printer, RemoteFile};

use crate::client::{DeviceApi, ListPurpose};
use crate::connector::DeviceConnector;

/// Outcome of each sub-call behind one status snapshot.
#[derive(Debug)]
pub struct StatusReport {
    pub printer_id: String,
    pub info: Result<Value>,
    pub print_stats: Result<PrintStats>,
    pub temperature: Result<Value>,
    pub files: Result<Vec<RemoteFile>>,
    pub last_update: DateTime<Utc>,
}

/// Serializable summary of one sub-call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubCallOutcome {
    pub call: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn outcome<T>(call: &'static str, result: &Result<T>) -> SubCallOutcome {
    SubCallOutcome {
        call,
        ok: result.is_ok(),
        error: result.as_ref().err().map(ToString::to_string),
    }
}

impl StatusReport {
    /// Per-call outcomes in a fixed order.
    pub fn outcomes(&self) -> Vec<SubCallOutcome> {
        vec![
            outcome("info", &self.info),
            outcome("print_stats", &self.print_stats),
            outcome("temperature", &self.temperature),
            outcome("files", &self.files),
        ]
    }

    /// The first failing sub-call, if any.
    pub fn first_error(&self) -> Option<&FleetError> {
        self.info
            .as_ref()
            .err()
            .or(self.print_stats.as_ref().err())
            .or(self.temperature.as_ref().err())
            .or(self.files.as_ref().err())
    }

    /// Collapse into the all-or-nothing status.
    pub fn into_status(self) -> DeviceStatus {
        let last_update = self.last_update;
        match (self.info, self.print_stats, self.temperature, self.files) {
            (Ok(printer_info), Ok(print_stats), Ok(temperature), Ok(files)) => {
                DeviceStatus::Online {
                    status: Box::new(OnlineStatus {
                        printer_info,
                        print_stats,
                        temperature,
                        files,
                    }),
                    last_update,
                }
            }
            (info, stats, temps, files) => {
                let error = [
                    info.err(),
                    stats.err(),
                    temps.err(),
                    files.err(),
                ]
                .into_iter()
                .flatten()
                .next()
                .map(|e| e.to_string())
                .unwrap_or_default();
                DeviceStatus::Offline { error, last_update }
            }
        }
    }
}

/// Query one device for a full report.
///
/// The four calls are issued concurrently; each is bounded by the device's
/// own status timeout.
pub async fn query(device: &dyn DeviceApi) -> StatusReport {
    let (info, print_stats, temperature, files) = tokio::join!(
        device.get_info(),
        device.get_print_stats(),
        device.get_temperatures(),
        device.list_files(ListPurpose::Status),
    );
    StatusReport {
        printer_id: device.printer_id().to_string(),
        info,
        print_stats,
        temperature,
        files,
        last_update: Utc::now(),
    }
}

/// Produces status snapshots for registered printers.
#[derive(Clone)]
pub struct StatusAggregator {
    connector: Arc<dyn DeviceConnector>,
}

impl StatusAggregator {
    pub fn new(connector: Arc<dyn DeviceConnector>) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &Arc<dyn DeviceConnector> {
        &self.connector
    }

    /// Full per-call report for one printer.
    #[instrument(skip_all, fields(printer_id = %printer.id))]
    pub async fn report(&self, printer: &Printer) -> StatusReport {
        let device = self.connector.connect(printer);
        let report = query(device.as_ref()).await;
        if let Some(e) = report.first_error() {
            warn!(error = %e, "printer status unavailable");
        } else {
            debug!("printer status collected");
        }
        report
    }

    /// Collapsed status for one printer.
    pub async fn status(&self, printer: &Printer) -> DeviceStatus {
        self.report(printer).await.into_status()
    }

    /// Collapsed status for many printers, queried concurrently.
    ///
    /// Results are in the same order as `printers`.
    pub async fn fleet_status(&self, printers: &[Printer]) -> Vec<(String, DeviceStatus)> {
        join_all(printers.iter().map(|p| async move {
            (p.id.clone(), self.status(p).await)
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::testing::{Call, FakeConnector};

    fn printer(id: &str) -> Printer {
        Printer::new(id.into(), id.into(), "127.0.0.1".into(), 7125, 8080)
    }

    fn aggregator() -> (StatusAggregator, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector::new());
        (StatusAggregator::new(connector.clone()), connector)
    }

    #[tokio::test]
    async fn all_calls_succeeding_gives_online_snapshot() {
        let (agg, fakes) = aggregator();
        fakes.device("ZB3D-001").set_files(&["cube.gcode"]);

        let status = agg.status(&printer("ZB3D-001")).await;
        assert!(status.is_online());
        assert!(status.is_available());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["files"][0]["pathname"], "cube.gcode");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn any_single_failure_collapses_to_offline() {
        for call in Call::STATUS {
            let (agg, fakes) = aggregator();
            fakes.device("ZB3D-001").fail(call);

            let status = agg.status(&printer("ZB3D-001")).await;
            let json = serde_json::to_value(&status).unwrap();
            let obj = json.as_object().unwrap();

            assert_eq!(obj["online"], false, "{call:?}");
            let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(keys, ["error", "lastUpdate", "online"], "{call:?}");
            assert!(!status.is_available());
        }
    }

    #[tokio::test]
    async fn report_keeps_per_call_outcomes() {
        let (agg, fakes) = aggregator();
        fakes.device("ZB3D-001").fail(Call::Temperatures);

        let report = agg.report(&printer("ZB3D-001")).await;
        let outcomes = report.outcomes();
        assert!(outcomes[0].ok);
        assert!(outcomes[1].ok);
        assert!(!outcomes[2].ok);
        assert!(outcomes[2].error.as_deref().unwrap().contains("500"));
        assert!(outcomes[3].ok);

        let status = report.into_status();
        assert!(!status.is_online());
    }

    #[tokio::test]
    async fn busy_printer_is_online_but_not_available() {
        let (agg, fakes) = aggregator();
        fakes.device("ZB3D-001").set_print_state("printing");

        let status = agg.status(&printer("ZB3D-001")).await;
        assert!(status.is_online());
        assert!(!status.is_available());
    }

    #[tokio::test]
    async fn sub_calls_and_printers_run_concurrently() {
        let (agg, fakes) = aggregator();
        let printers: Vec<_> = ["ZB3D-001", "ZB3D-002", "ZB3D-003"]
            .into_iter()
            .map(printer)
            .collect();
        for p in &printers {
            fakes.device(&p.id).set_delay(Duration::from_millis(100));
        }
        fakes.device("ZB3D-002").go_offline();

        let started = Instant::now();
        let statuses = agg.fleet_status(&printers).await;
        // Twelve 100ms calls in well under 1.2s.
        assert!(started.elapsed() < Duration::from_millis(600));

        let ids: Vec<_> = statuses.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["ZB3D-001", "ZB3D-002", "ZB3D-003"]);
        assert!(statuses[0].1.is_online());
        assert!(!statuses[1].1.is_online());
        assert!(statuses[2].1.is_online());
    }
}
