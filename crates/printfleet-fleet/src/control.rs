// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Direct control of a single printer, outside any job.
//
// Unlike job fan-out, a failure here concerns exactly one device the caller
// named, so device errors are returned as-is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument};

use printfleet_core::config::FleetConfig;
use printfleet_core::error::{FleetError, Result};
use printfleet_core::types::{DeviceStatus, RemoteFile};
use printfleet_device::{DeviceApi, DeviceConnector, ListPurpose, StatusAggregator, SubCallOutcome};

use crate::registry::Registry;

/// Per-call breakdown of a status query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub printer_id: String,
    pub online: bool,
    pub calls: Vec<SubCallOutcome>,
    pub last_update: DateTime<Utc>,
}

pub struct PrinterControl {
    registry: Arc<Registry>,
    aggregator: StatusAggregator,
    config: FleetConfig,
}

impl PrinterControl {
    pub fn new(
        registry: Arc<Registry>,
        connector: Arc<dyn DeviceConnector>,
        config: &FleetConfig,
    ) -> Self {
        Self {
            registry,
            aggregator: StatusAggregator::new(connector),
            config: config.clone(),
        }
    }

    fn device(&self, id: &str) -> Result<Arc<dyn DeviceApi>> {
        let printer = self.registry.find_printer(id)?;
        Ok(self.aggregator.connector().connect(&printer))
    }

    /// Take the printer's lock, then resolve it.
    ///
    /// Looking up after locking means a concurrent removal either finishes
    /// first (and the lookup fails) or waits until the command is done.
    async fn locked_device(&self, id: &str) -> Result<(OwnedMutexGuard<()>, Arc<dyn DeviceApi>)> {
        let guard = self.registry.lock(id).await;
        let device = self.device(id)?;
        Ok((guard, device))
    }

    /// Live status. An unreachable printer is `Ok(Offline)`, not an error.
    pub async fn status(&self, id: &str) -> Result<DeviceStatus> {
        let printer = self.registry.find_printer(id)?;
        Ok(self.aggregator.status(&printer).await)
    }

    pub async fn diagnostics(&self, id: &str) -> Result<Diagnostics> {
        let printer = self.registry.find_printer(id)?;
        let report = self.aggregator.report(&printer).await;
        Ok(Diagnostics {
            printer_id: printer.id,
            online: report.first_error().is_none(),
            calls: report.outcomes(),
            last_update: report.last_update,
        })
    }

    pub async fn files(&self, id: &str) -> Result<Vec<RemoteFile>> {
        self.device(id)?.list_files(ListPurpose::Browse).await
    }

    /// Upload a print file. Only the configured extensions are accepted.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(&self, id: &str, filename: &str, bytes: Vec<u8>) -> Result<String> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(FleetError::Validation("no file selected".into()));
        }
        if !is_plain_file_name(filename) {
            return Err(FleetError::Validation(format!(
                "file name must not contain a path: {filename}"
            )));
        }
        if !self.config.is_allowed_upload(filename) {
            return Err(FleetError::UnsupportedFile(filename.to_string()));
        }

        let (_guard, device) = self.locked_device(id).await?;
        device.upload_file(filename, bytes).await?;
        info!(printer_id = id, filename, "file uploaded");
        Ok(filename.to_string())
    }

    #[instrument(skip(self))]
    pub async fn start_print(&self, id: &str, filename: &str) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(FleetError::Validation("filename is required".into()));
        }
        let (_guard, device) = self.locked_device(id).await?;
        device.start_print(filename).await?;
        info!(printer_id = id, filename, "print started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn pause_print(&self, id: &str) -> Result<()> {
        let (_guard, device) = self.locked_device(id).await?;
        device.pause_print().await?;
        info!(printer_id = id, "print paused");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn resume_print(&self, id: &str) -> Result<()> {
        let (_guard, device) = self.locked_device(id).await?;
        device.resume_print().await?;
        info!(printer_id = id, "print resumed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn cancel_print(&self, id: &str) -> Result<()> {
        let (_guard, device) = self.locked_device(id).await?;
        device.cancel_print().await?;
        info!(printer_id = id, "print cancelled");
        Ok(())
    }

    /// Flip the chamber light and return the value written to every channel.
    ///
    /// Read and write happen under the printer's lock so two toggles cannot
    /// both observe the same state.
    #[instrument(skip(self))]
    pub async fn toggle_light(&self, id: &str) -> Result<u8> {
        let (_guard, device) = self.locked_device(id).await?;
        let value = device.get_led_state().await?.toggled_value();
        device.set_led(value, value, value).await?;
        info!(printer_id = id, value, "light toggled");
        Ok(value)
    }
}

/// A bare file name: no directory parts, no leading dot, no control bytes.
fn is_plain_file_name(name: &str) -> bool {
    !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}
