// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the PrintFleet orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Printers
// ---------------------------------------------------------------------------

/// Default Moonraker API port.
pub const DEFAULT_CONTROL_PORT: u16 = 7125;

/// Default webcam streamer port (mjpg-streamer / crowsnest).
pub const DEFAULT_WEBCAM_PORT: u16 = 8080;

/// Identity record for one networked printer controller.
///
/// Live status is never stored here; it is always fetched fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    pub id: String,
    pub name: String,
    /// IP address or hostname of the controller.
    pub address: String,
    pub control_port: u16,
    #[serde(rename = "webcamURL")]
    pub webcam_url: String,
    #[serde(rename = "controllerBaseURL")]
    pub controller_base_url: String,
}

impl Printer {
    /// Build a printer record, deriving the controller and webcam URLs.
    pub fn new(
        id: String,
        name: String,
        address: String,
        control_port: u16,
        webcam_port: u16,
    ) -> Self {
        let controller_base_url = format!("http://{address}:{control_port}");
        let webcam_url = format!("http://{address}:{webcam_port}/webcam/?action=stream");
        Self {
            id,
            name,
            address,
            control_port,
            webcam_url,
            controller_base_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Live device status
// ---------------------------------------------------------------------------

/// The `print_stats` object reported by the controller.
///
/// Only the fields the orchestrator reads are typed; everything else is kept
/// verbatim in `extra` so callers see the full controller payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintStats {
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_duration: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrintStats {
    /// Whether the controller reports it is not busy with a print.
    ///
    /// Klipper reports `standby` for an idle machine; `idle` is accepted as
    /// well for controllers that use the generic wording.
    pub fn is_idle(&self) -> bool {
        matches!(self.state.as_str(), "idle" | "standby")
    }
}

/// One entry from the controller's file listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(alias = "path")]
    pub pathname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteFile {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            size: None,
            modified: None,
            extra: Map::new(),
        }
    }
}

/// Colour channels of the controller's `led` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LedState {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}

impl LedState {
    /// Channel value a toggle should write: off if currently lit, else full.
    pub fn toggled_value(&self) -> u8 {
        if self.red > 0.0 { 0 } else { 255 }
    }
}

/// Snapshot of everything the controller reports when it is reachable.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineStatus {
    pub printer_info: Value,
    pub print_stats: PrintStats,
    pub temperature: Value,
    pub files: Vec<RemoteFile>,
}

/// Live status for one printer. Transient, never persisted.
///
/// Exactly one of the two shapes exists: a reachable printer carries the full
/// snapshot, an unreachable one carries only the error. Callers must read
/// `Offline` as "status unknown", not "device confirmed down".
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceStatus {
    Online {
        status: Box<OnlineStatus>,
        last_update: DateTime<Utc>,
    },
    Offline {
        error: String,
        last_update: DateTime<Utc>,
    },
}

impl DeviceStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }

    /// Print stats, when the printer is reachable.
    pub fn print_stats(&self) -> Option<&PrintStats> {
        match self {
            Self::Online { status, .. } => Some(&status.print_stats),
            Self::Offline { .. } => None,
        }
    }

    /// A printer is available for new work iff reachable and idle.
    pub fn is_available(&self) -> bool {
        self.print_stats().is_some_and(PrintStats::is_idle)
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        match self {
            Self::Online { last_update, .. } | Self::Offline { last_update, .. } => *last_update,
        }
    }
}

// Serialized flat with the boolean `online` discriminant, which serde's
// internally tagged enums cannot express.
impl Serialize for DeviceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Online {
                status,
                last_update,
            } => {
                let mut map = serializer.serialize_map(Some(6))?;
                map.serialize_entry("online", &true)?;
                map.serialize_entry("printerInfo", &status.printer_info)?;
                map.serialize_entry("printStats", &status.print_stats)?;
                map.serialize_entry("temperature", &status.temperature)?;
                map.serialize_entry("files", &status.files)?;
                map.serialize_entry("lastUpdate", last_update)?;
                map.end()
            }
            Self::Offline { error, last_update } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("online", &false)?;
                map.serialize_entry("error", error)?;
                map.serialize_entry("lastUpdate", last_update)?;
                map.end()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Print jobs
// ---------------------------------------------------------------------------

/// Lifecycle states of a print job.
///
/// `pending → running ⇄ paused`, `pending|running|paused → cancelled`.
/// `completed` is only reached from an external progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Default material for new jobs.
pub const DEFAULT_MATERIAL: &str = "PLA";

/// Placeholder estimate for jobs created without one.
pub const UNKNOWN_ESTIMATE: &str = "Unknown";

/// A unit of scheduled print work, possibly spanning several printers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: String,
    pub name: String,
    pub filename: String,
    pub quantity: u32,
    pub priority: Priority,
    pub material: String,
    /// Printer ids, in assignment order, without duplicates.
    #[serde(alias = "printers")]
    pub assigned_printers: Vec<String>,
    pub status: JobStatus,
    /// Externally reported percentage. Stored as given, without clamping.
    pub progress: i64,
    pub estimated_time: String,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    pub current_file_index: u32,
    pub files_printed: u32,
}

/// Request body for creating a job.
///
/// Required fields default to empty so that validation, not deserialization,
/// reports them missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default, alias = "printers")]
    pub assigned_printers: Vec<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}

/// The fields a caller may change on an existing job.
///
/// Identity, status, and timestamps are deliberately absent; unknown keys are
/// rejected so a patch cannot smuggle them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobUpdate {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub quantity: Option<u32>,
    pub priority: Option<Priority>,
    pub material: Option<String>,
    #[serde(alias = "printers")]
    pub assigned_printers: Option<Vec<String>>,
    pub estimated_time: Option<String>,
    pub current_file_index: Option<u32>,
    pub files_printed: Option<u32>,
}

impl JobUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.filename.is_none()
            && self.quantity.is_none()
            && self.priority.is_none()
            && self.material.is_none()
            && self.assigned_printers.is_none()
            && self.estimated_time.is_none()
            && self.current_file_index.is_none()
            && self.files_printed.is_none()
    }
}

// ---------------------------------------------------------------------------
// File catalog
// ---------------------------------------------------------------------------

/// Metadata for an artifact uploaded to the orchestrator.
///
/// Jobs reference these by filename only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub description: String,
    pub uploaded: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// File type label used by the catalog: the lower-cased last extension.
pub fn file_type_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "unknown".into(),
    }
}
