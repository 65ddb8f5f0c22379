// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport-neutral service facade.
//
// `FleetService` wires the registry, orchestrator, printer control and file
// catalog to one set of storage files, and answers every operation with a
// `Reply` that serializes to exactly what a REST layer would send back: the
// record on success, `{"error", "code"}` on failure.  Status-code mapping is
// left to that layer, keyed on `code`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use printfleet_core::config::FleetConfig;
use printfleet_core::error::{FleetError, Result};
use printfleet_core::types::{
    DeviceStatus, FileEntry, JobUpdate, NewJob, PrintJob, Printer, RemoteFile,
};
use printfleet_device::{DeviceConnector, StatusAggregator};
use printfleet_store::{Collection, JsonCollection, SequenceStore};

use crate::catalog::FileCatalog;
use crate::control::{Diagnostics, PrinterControl};
use crate::orchestrator::{JobTransition, Orchestrator};
use crate::registry::Registry;

/// Failure body: `{"error": "...", "code": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Outcome of one service call.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Ok(T),
    Err(ErrorBody),
}

impl<T> Reply<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Back to a `Result`, with the full error body.
    pub fn into_result(self) -> std::result::Result<T, ErrorBody> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
        }
    }
}

impl<T> From<Result<T>> for Reply<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(ErrorBody {
                error: e.to_string(),
                code: e.code(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Success {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightToggle {
    pub success: bool,
    pub state: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upload {
    pub success: bool,
    pub filename: String,
}

/// A printer together with its live status.
#[derive(Debug, Clone, Serialize)]
pub struct FleetEntry {
    #[serde(flatten)]
    pub printer: Printer,
    pub status: DeviceStatus,
}

fn done(result: Result<()>) -> Reply<Success> {
    result.map(|()| Success { success: true }).into()
}

pub struct FleetService {
    registry: Arc<Registry>,
    aggregator: StatusAggregator,
    orchestrator: Orchestrator,
    control: PrinterControl,
    catalog: FileCatalog,
}

impl FleetService {
    /// Open (or create) the JSON collections under `data_dir`.
    #[instrument(skip(config, connector))]
    pub fn open(
        config: &FleetConfig,
        data_dir: &Path,
        connector: Arc<dyn DeviceConnector>,
    ) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let service = Self::with_collections(
            config,
            connector,
            Arc::new(JsonCollection::<Printer>::open(data_dir.join(&config.printers_file))?),
            Arc::new(JsonCollection::<PrintJob>::open(data_dir.join(&config.jobs_file))?),
            Arc::new(JsonCollection::<FileEntry>::open(data_dir.join(&config.files_file))?),
            Arc::new(SequenceStore::open(data_dir.join(&config.sequences_file))?),
        );
        info!(data_dir = %data_dir.display(), "fleet storage opened");
        Ok(service)
    }

    /// Volatile service, for tests and dry runs.
    pub fn in_memory(config: &FleetConfig, connector: Arc<dyn DeviceConnector>) -> Self {
        Self::with_collections(
            config,
            connector,
            Arc::new(JsonCollection::<Printer>::in_memory()),
            Arc::new(JsonCollection::<PrintJob>::in_memory()),
            Arc::new(JsonCollection::<FileEntry>::in_memory()),
            Arc::new(SequenceStore::in_memory()),
        )
    }

    fn with_collections(
        config: &FleetConfig,
        connector: Arc<dyn DeviceConnector>,
        printers: Arc<dyn Collection<Printer>>,
        jobs: Arc<dyn Collection<PrintJob>>,
        files: Arc<dyn Collection<FileEntry>>,
        sequences: Arc<SequenceStore>,
    ) -> Self {
        let registry = Arc::new(Registry::new(printers, sequences.clone(), config));
        Self {
            aggregator: StatusAggregator::new(connector.clone()),
            orchestrator: Orchestrator::new(
                jobs,
                sequences.clone(),
                registry.clone(),
                connector.clone(),
                config,
            ),
            control: PrinterControl::new(registry.clone(), connector, config),
            catalog: FileCatalog::new(files, sequences),
            registry,
        }
    }

    // -- Printers --

    pub fn list_printers(&self) -> Reply<Vec<Printer>> {
        self.registry.list_printers().into()
    }

    pub fn add_printer(&self, name: &str, address: &str, port: Option<u16>) -> Reply<Printer> {
        self.registry.add_printer(name, address, port).into()
    }

    pub async fn remove_printer(&self, id: &str) -> Reply<Success> {
        done(self.registry.remove_printer(id).await)
    }

    /// Every printer with its live status, queried concurrently.
    pub async fn fleet_status(&self) -> Reply<Vec<FleetEntry>> {
        let printers = match self.registry.list_printers() {
            Ok(p) => p,
            Err(e) => return Err::<Vec<FleetEntry>, _>(e).into(),
        };
        let statuses = self.aggregator.fleet_status(&printers).await;
        Reply::Ok(
            printers
                .into_iter()
                .zip(statuses)
                .map(|(printer, (_, status))| FleetEntry { printer, status })
                .collect(),
        )
    }

    pub async fn printer_status(&self, id: &str) -> Reply<DeviceStatus> {
        self.control.status(id).await.into()
    }

    pub async fn printer_diagnostics(&self, id: &str) -> Reply<Diagnostics> {
        self.control.diagnostics(id).await.into()
    }

    pub async fn printer_files(&self, id: &str) -> Reply<Vec<RemoteFile>> {
        self.control.files(id).await.into()
    }

    pub async fn upload_file(&self, id: &str, filename: &str, bytes: Vec<u8>) -> Reply<Upload> {
        self.control
            .upload(id, filename, bytes)
            .await
            .map(|filename| Upload {
                success: true,
                filename,
            })
            .into()
    }

    pub async fn start_print(&self, id: &str, filename: &str) -> Reply<Success> {
        done(self.control.start_print(id, filename).await)
    }

    pub async fn pause_print(&self, id: &str) -> Reply<Success> {
        done(self.control.pause_print(id).await)
    }

    pub async fn resume_print(&self, id: &str) -> Reply<Success> {
        done(self.control.resume_print(id).await)
    }

    pub async fn cancel_print(&self, id: &str) -> Reply<Success> {
        done(self.control.cancel_print(id).await)
    }

    pub async fn toggle_light(&self, id: &str) -> Reply<LightToggle> {
        self.control
            .toggle_light(id)
            .await
            .map(|state| LightToggle {
                success: true,
                state,
            })
            .into()
    }

    // -- Jobs --

    pub fn list_jobs(&self) -> Reply<Vec<PrintJob>> {
        self.orchestrator.list().into()
    }

    pub fn get_job(&self, id: &str) -> Reply<PrintJob> {
        self.orchestrator.get(id).into()
    }

    pub fn create_job(&self, spec: NewJob) -> Reply<PrintJob> {
        self.orchestrator.create(spec).into()
    }

    /// Patch a job from a raw JSON body. Keys outside the allow-list are a
    /// validation error, not silently dropped.
    pub async fn update_job(&self, id: &str, body: serde_json::Value) -> Reply<PrintJob> {
        let patch: JobUpdate = match serde_json::from_value(body) {
            Ok(p) => p,
            Err(e) => return Err::<PrintJob, _>(FleetError::Validation(e.to_string())).into(),
        };
        self.orchestrator.update(id, patch).await.into()
    }

    pub async fn delete_job(&self, id: &str) -> Reply<Success> {
        done(self.orchestrator.delete(id).await)
    }

    pub async fn start_job(&self, id: &str) -> Reply<JobTransition> {
        self.orchestrator.start(id).await.into()
    }

    pub async fn pause_job(&self, id: &str) -> Reply<JobTransition> {
        self.orchestrator.pause(id).await.into()
    }

    pub async fn resume_job(&self, id: &str) -> Reply<JobTransition> {
        self.orchestrator.resume(id).await.into()
    }

    pub async fn cancel_job(&self, id: &str) -> Reply<JobTransition> {
        self.orchestrator.cancel(id).await.into()
    }

    pub async fn report_progress(&self, id: &str, progress: i64) -> Reply<PrintJob> {
        self.orchestrator.report_progress(id, progress).await.into()
    }

    // -- File catalog --

    pub fn list_files(&self) -> Reply<Vec<FileEntry>> {
        self.catalog.list().into()
    }

    pub fn register_file(
        &self,
        name: &str,
        path: &str,
        size: u64,
        description: &str,
    ) -> Reply<FileEntry> {
        self.catalog.register(name, path, size, description).into()
    }

    pub fn remove_file(&self, id: &str) -> Reply<Success> {
        done(self.catalog.remove(id))
    }
}
