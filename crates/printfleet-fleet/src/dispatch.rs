// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Best-effort command fan-out across a job's printers.
//
// Every assigned printer gets the command concurrently.  Failures never abort
// the fan-out; each printer's result is recorded as a `DispatchOutcome` so the
// caller can see what actually reached the hardware.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use printfleet_core::error::Result;
use printfleet_device::{DeviceApi, DeviceConnector};

use crate::registry::Registry;

/// Result of sending one command to one printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Dispatch {
    Sent,
    Failed { error: String },
    Skipped { reason: String },
}

impl Dispatch {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub printer_id: String,
    pub command: String,
    #[serde(flatten)]
    pub result: Dispatch,
}

impl DispatchOutcome {
    pub fn new(printer_id: &str, command: &str, result: Dispatch) -> Self {
        Self {
            printer_id: printer_id.to_string(),
            command: command.to_string(),
            result,
        }
    }

    pub(crate) fn from_result(printer_id: &str, command: &str, result: Result<()>) -> Self {
        let outcome = match result {
            Ok(()) => {
                debug!(printer_id, command, "command dispatched");
                Dispatch::Sent
            }
            Err(e) => {
                warn!(printer_id, command, error = %e, "command dispatch failed");
                Dispatch::Failed {
                    error: e.to_string(),
                }
            }
        };
        Self::new(printer_id, command, outcome)
    }
}

/// Send `command` to every printer in `printer_ids` concurrently.
///
/// Ids no longer in the registry produce a `Failed` outcome rather than an
/// error. Outcomes are returned in the order of `printer_ids`.
pub(crate) async fn fan_out<F, Fut>(
    registry: &Registry,
    connector: &Arc<dyn DeviceConnector>,
    printer_ids: &[String],
    command: &str,
    send: F,
) -> Vec<DispatchOutcome>
where
    F: Fn(Arc<dyn DeviceApi>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let send = &send;
    join_all(printer_ids.iter().map(|id| async move {
        match registry.find_printer(id) {
            Ok(printer) => {
                let device = connector.connect(&printer);
                DispatchOutcome::from_result(id, command, send(device).await)
            }
            Err(e) => DispatchOutcome::from_result(id, command, Err(e)),
        }
    }))
    .await
}
