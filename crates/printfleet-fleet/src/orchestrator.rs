// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print-job orchestration.
//
// Jobs move `pending → running ⇄ paused`, and any non-terminal job can be
// cancelled.  `completed` is only reached through a progress report.
//
// Every transition holds the job's lock across the whole cycle: read the
// record, talk to the printers, write the record back.  Two commands for the
// same job therefore never interleave, while different jobs proceed in
// parallel.  Device commands are best effort; the record is committed
// regardless and the per-printer outcomes are returned alongside it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use printfleet_core::config::FleetConfig;
use printfleet_core::error::{FleetError, Result};
use printfleet_core::ids::IdKind;
use printfleet_core::types::{
    DEFAULT_MATERIAL, JobStatus, JobUpdate, NewJob, PrintJob, UNKNOWN_ESTIMATE,
};
use printfleet_device::{DeviceConnector, ListPurpose, StatusAggregator};
use printfleet_store::{Collection, EntityLocks, SequenceStore};

use crate::dispatch::{self, Dispatch, DispatchOutcome};
use crate::registry::Registry;

/// A job record after a transition, with what each printer was told.
#[derive(Debug, Clone, Serialize)]
pub struct JobTransition {
    #[serde(flatten)]
    pub job: PrintJob,
    pub dispatch: Vec<DispatchOutcome>,
}

pub struct Orchestrator {
    jobs: Arc<dyn Collection<PrintJob>>,
    sequences: Arc<SequenceStore>,
    registry: Arc<Registry>,
    aggregator: StatusAggregator,
    locks: EntityLocks,
    print_extension: String,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn Collection<PrintJob>>,
        sequences: Arc<SequenceStore>,
        registry: Arc<Registry>,
        connector: Arc<dyn DeviceConnector>,
        config: &FleetConfig,
    ) -> Self {
        Self {
            jobs,
            sequences,
            registry,
            aggregator: StatusAggregator::new(connector),
            locks: EntityLocks::new(),
            print_extension: config.print_file_extension.clone(),
        }
    }

    pub fn list(&self) -> Result<Vec<PrintJob>> {
        self.jobs.get_all()
    }

    pub fn get(&self, id: &str) -> Result<PrintJob> {
        self.jobs
            .get(id)?
            .ok_or_else(|| FleetError::JobNotFound(id.to_string()))
    }

    /// Create a pending job.
    #[instrument(skip_all, fields(name = %spec.name))]
    pub fn create(&self, spec: NewJob) -> Result<PrintJob> {
        let name = spec.name.trim();
        let filename = spec.filename.trim();
        if name.is_empty() {
            return Err(FleetError::Validation("job name is required".into()));
        }
        if filename.is_empty() {
            return Err(FleetError::Validation("job filename is required".into()));
        }
        let quantity = spec.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(FleetError::Validation("quantity must be at least 1".into()));
        }
        let assigned_printers = self.checked_printers(spec.assigned_printers)?;

        let existing = self.jobs.get_all()?;
        let floor = IdKind::Job.highest(existing.iter().map(|j| j.id.as_str()));
        let n = self.sequences.next(IdKind::Job.sequence_name(), floor)?;

        let job = PrintJob {
            id: IdKind::Job.format(n),
            name: name.to_string(),
            filename: filename.to_string(),
            quantity,
            priority: spec.priority.unwrap_or_default(),
            material: spec.material.unwrap_or_else(|| DEFAULT_MATERIAL.into()),
            assigned_printers,
            status: JobStatus::Pending,
            progress: 0,
            estimated_time: spec
                .estimated_time
                .unwrap_or_else(|| UNKNOWN_ESTIMATE.into()),
            created: Utc::now(),
            started: None,
            completed: None,
            modified: None,
            current_file_index: 0,
            files_printed: 0,
        };
        self.jobs.upsert(job.clone())?;

        info!(job_id = %job.id, printers = job.assigned_printers.len(), "job created");
        Ok(job)
    }

    /// Apply an allow-listed patch.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: JobUpdate) -> Result<PrintJob> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.get(id)?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(FleetError::Validation("job name cannot be blank".into()));
            }
            job.name = name;
        }
        if let Some(filename) = patch.filename {
            if filename.trim().is_empty() {
                return Err(FleetError::Validation("job filename cannot be blank".into()));
            }
            job.filename = filename;
        }
        if let Some(quantity) = patch.quantity {
            if quantity == 0 {
                return Err(FleetError::Validation("quantity must be at least 1".into()));
            }
            job.quantity = quantity;
        }
        if let Some(printers) = patch.assigned_printers {
            job.assigned_printers = self.checked_printers(printers)?;
        }
        if let Some(priority) = patch.priority {
            job.priority = priority;
        }
        if let Some(material) = patch.material {
            job.material = material;
        }
        if let Some(estimate) = patch.estimated_time {
            job.estimated_time = estimate;
        }
        if let Some(index) = patch.current_file_index {
            job.current_file_index = index;
        }
        if let Some(printed) = patch.files_printed {
            job.files_printed = printed;
        }
        job.modified = Some(Utc::now());

        self.jobs.upsert(job.clone())?;
        info!(job_id = id, "job updated");
        Ok(job)
    }

    /// Remove a job. Unknown ids are not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.locks.lock(id).await;
        if self.jobs.delete(id)? {
            info!(job_id = id, "job deleted");
        }
        Ok(())
    }

    /// Start a pending job on every assigned printer that is online and idle.
    ///
    /// The job becomes `running` as soon as at least one printer was
    /// available; whether `startPrint` succeeded there is only reported in
    /// the returned outcomes.
    #[instrument(skip(self))]
    pub async fn start(&self, id: &str) -> Result<JobTransition> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.get(id)?;
        ensure_transition(&job, "start", &[JobStatus::Pending])?;

        let printers: Vec<_> = job
            .assigned_printers
            .iter()
            .filter_map(|pid| match self.registry.find_printer(pid) {
                Ok(p) => Some(Ok(p)),
                Err(FleetError::PrinterNotFound(_)) => {
                    warn!(job_id = id, printer_id = %pid, "assigned printer no longer registered");
                    None
                }
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<_>>()?;

        let statuses = self.aggregator.fleet_status(&printers).await;
        let available: Vec<_> = printers
            .iter()
            .zip(&statuses)
            .filter(|(_, (_, status))| status.is_available())
            .map(|(printer, _)| printer)
            .collect();

        if available.is_empty() {
            warn!(job_id = id, "no assigned printer is online and idle");
            return Err(FleetError::NoAvailablePrinters(id.to_string()));
        }

        let connector = self.aggregator.connector();
        let extension = self.print_extension.as_str();
        let dispatch = join_all(available.into_iter().map(|printer| async move {
            let device = connector.connect(printer);
            let files = match device.list_files(ListPurpose::Browse).await {
                Ok(files) => files,
                Err(e) => return DispatchOutcome::from_result(&printer.id, "start", Err(e)),
            };
            match files.iter().find(|f| f.pathname.ends_with(extension)) {
                Some(file) => {
                    let result = device.start_print(&file.pathname).await;
                    DispatchOutcome::from_result(&printer.id, "start", result)
                }
                None => {
                    warn!(printer_id = %printer.id, "no printable file on printer");
                    DispatchOutcome::new(
                        &printer.id,
                        "start",
                        Dispatch::Skipped {
                            reason: format!("no {extension} file on printer"),
                        },
                    )
                }
            }
        }))
        .await;

        job.status = JobStatus::Running;
        job.started = Some(Utc::now());
        self.jobs.upsert(job.clone())?;

        let sent = dispatch.iter().filter(|d| d.result.is_sent()).count();
        info!(job_id = id, dispatched = dispatch.len(), sent, "job started");
        Ok(JobTransition { job, dispatch })
    }

    #[instrument(skip(self))]
    pub async fn pause(&self, id: &str) -> Result<JobTransition> {
        self.fan_out_transition(
            id,
            "pause",
            &[JobStatus::Running, JobStatus::Paused],
            JobStatus::Paused,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn resume(&self, id: &str) -> Result<JobTransition> {
        self.fan_out_transition(id, "resume", &[JobStatus::Paused], JobStatus::Running)
            .await
    }

    /// Cancel a job. A pending job was never dispatched, so no printer is
    /// contacted.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: &str) -> Result<JobTransition> {
        self.fan_out_transition(
            id,
            "cancel",
            &[JobStatus::Pending, JobStatus::Running, JobStatus::Paused],
            JobStatus::Cancelled,
        )
        .await
    }

    /// Record externally reported progress.
    ///
    /// The value is stored as given. A running job reported at 100 or more
    /// is completed.
    #[instrument(skip(self))]
    pub async fn report_progress(&self, id: &str, progress: i64) -> Result<PrintJob> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.get(id)?;
        job.progress = progress;
        if job.status == JobStatus::Running && progress >= 100 {
            job.status = JobStatus::Completed;
            job.completed = Some(Utc::now());
            info!(job_id = id, "job completed");
        }
        self.jobs.upsert(job.clone())?;
        Ok(job)
    }

    async fn fan_out_transition(
        &self,
        id: &str,
        action: &'static str,
        from: &[JobStatus],
        to: JobStatus,
    ) -> Result<JobTransition> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.get(id)?;
        ensure_transition(&job, action, from)?;

        let dispatch = if job.status == JobStatus::Pending {
            Vec::new()
        } else {
            dispatch::fan_out(
                &self.registry,
                self.aggregator.connector(),
                &job.assigned_printers,
                action,
                |device| async move {
                    match to {
                        JobStatus::Paused => device.pause_print().await,
                        JobStatus::Running => device.resume_print().await,
                        _ => device.cancel_print().await,
                    }
                },
            )
            .await
        };

        job.status = to;
        self.jobs.upsert(job.clone())?;

        let failed = dispatch.iter().filter(|d| !d.result.is_sent()).count();
        info!(job_id = id, status = %to, failed, "job transitioned");
        Ok(JobTransition { job, dispatch })
    }

    /// Validate and de-duplicate printer ids, keeping first occurrence order.
    fn checked_printers(&self, ids: Vec<String>) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.insert(id.clone()) {
                self.registry.find_printer(&id)?;
                out.push(id);
            }
        }
        Ok(out)
    }
}

fn ensure_transition(job: &PrintJob, action: &'static str, from: &[JobStatus]) -> Result<()> {
    if from.contains(&job.status) {
        Ok(())
    } else {
        Err(FleetError::InvalidTransition {
            job_id: job.id.clone(),
            action,
            status: job.status.to_string(),
        })
    }
}
