// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Factory seam between printer records and device clients.

use std::sync::Arc;

use printfleet_core::config::DeviceTimeouts;
use printfleet_core::types::Printer;

use crate::client::{DeviceApi, MoonrakerClient};

/// Produces a device client for a registered printer.
///
/// The orchestrator only ever sees this trait, so tests substitute scripted
/// controllers without touching the network.
pub trait DeviceConnector: Send + Sync {
    fn connect(&self, printer: &Printer) -> Arc<dyn DeviceApi>;
}

/// Connector for real Moonraker controllers over HTTP.
///
/// One `reqwest::Client` (and its connection pool) is shared by every
/// printer.
pub struct HttpConnector {
    http: reqwest::Client,
    timeouts: DeviceTimeouts,
}

impl HttpConnector {
    pub fn new(timeouts: DeviceTimeouts) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeouts,
        }
    }
}

impl DeviceConnector for HttpConnector {
    fn connect(&self, printer: &Printer) -> Arc<dyn DeviceApi> {
        Arc::new(MoonrakerClient::new(
            printer,
            self.http.clone(),
            self.timeouts.clone(),
        ))
    }
}
