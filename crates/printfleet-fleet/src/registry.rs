// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fleet registry: the persisted catalog of printers.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument};

use printfleet_core::config::FleetConfig;
use printfleet_core::error::{FleetError, Result};
use printfleet_core::ids::IdKind;
use printfleet_core::types::Printer;
use printfleet_store::{Collection, EntityLocks, SequenceStore};

/// Owns every `Printer` record.
pub struct Registry {
    printers: Arc<dyn Collection<Printer>>,
    sequences: Arc<SequenceStore>,
    locks: EntityLocks,
    default_port: u16,
    webcam_port: u16,
}

impl Registry {
    pub fn new(
        printers: Arc<dyn Collection<Printer>>,
        sequences: Arc<SequenceStore>,
        config: &FleetConfig,
    ) -> Self {
        Self {
            printers,
            sequences,
            locks: EntityLocks::new(),
            default_port: config.default_control_port,
            webcam_port: config.webcam_port,
        }
    }

    /// Register a printer and persist it.
    ///
    /// The id comes from a sequence that only moves forward, so a removed
    /// printer's id is never handed out again.
    #[instrument(skip(self))]
    pub fn add_printer(&self, name: &str, address: &str, port: Option<u16>) -> Result<Printer> {
        let name = name.trim();
        let address = address.trim();
        if name.is_empty() {
            return Err(FleetError::Validation("printer name is required".into()));
        }
        if address.is_empty() {
            return Err(FleetError::Validation("printer address is required".into()));
        }

        let existing = self.printers.get_all()?;
        let floor = IdKind::Printer.highest(existing.iter().map(|p| p.id.as_str()));
        let n = self
            .sequences
            .next(IdKind::Printer.sequence_name(), floor)?;

        let printer = Printer::new(
            IdKind::Printer.format(n),
            name.to_string(),
            address.to_string(),
            port.unwrap_or(self.default_port),
            self.webcam_port,
        );
        self.printers.upsert(printer.clone())?;

        info!(printer_id = %printer.id, url = %printer.controller_base_url, "printer added");
        Ok(printer)
    }

    /// Remove a printer. Succeeds whether or not the id existed.
    ///
    /// Jobs that reference the printer keep the now-dangling id.
    #[instrument(skip(self))]
    pub async fn remove_printer(&self, id: &str) -> Result<()> {
        let _guard = self.locks.lock(id).await;
        if self.printers.delete(id)? {
            info!(printer_id = id, "printer removed");
        } else {
            debug!(printer_id = id, "remove of unknown printer ignored");
        }
        Ok(())
    }

    /// All printers in insertion order.
    pub fn list_printers(&self) -> Result<Vec<Printer>> {
        self.printers.get_all()
    }

    pub fn find_printer(&self, id: &str) -> Result<Printer> {
        self.printers
            .get(id)?
            .ok_or_else(|| FleetError::PrinterNotFound(id.to_string()))
    }

    /// Exclusive access to one printer for a read-modify-write cycle.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(id).await
    }
}
