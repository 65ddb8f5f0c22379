// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_CONTROL_PORT, DEFAULT_WEBCAM_PORT};

/// Per-call timeouts for controller requests, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceTimeouts {
    /// Info, print stats, temperatures, and the status-time file listing.
    pub status_secs: u64,
    /// File listing when browsing or choosing a file to print.
    pub file_list_secs: u64,
    /// Start / pause / resume / cancel.
    pub control_secs: u64,
    pub upload_secs: u64,
    pub led_read_secs: u64,
    pub led_write_secs: u64,
}

impl Default for DeviceTimeouts {
    fn default() -> Self {
        Self {
            status_secs: 5,
            file_list_secs: 10,
            control_secs: 10,
            upload_secs: 30,
            led_read_secs: 5,
            led_write_secs: 10,
        }
    }
}

impl DeviceTimeouts {
    pub fn status(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }

    pub fn file_list(&self) -> Duration {
        Duration::from_secs(self.file_list_secs)
    }

    pub fn control(&self) -> Duration {
        Duration::from_secs(self.control_secs)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_secs)
    }

    pub fn led_read(&self) -> Duration {
        Duration::from_secs(self.led_read_secs)
    }

    pub fn led_write(&self) -> Duration {
        Duration::from_secs(self.led_write_secs)
    }
}

/// Persistent orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Directory holding the JSON collections. `None` means the platform
    /// data directory.
    pub data_dir: Option<PathBuf>,
    pub printers_file: String,
    pub jobs_file: String,
    pub files_file: String,
    pub sequences_file: String,
    /// Port assumed when a printer is added without one (default 7125).
    pub default_control_port: u16,
    /// Port of the webcam streamer on each printer (default 8080).
    pub webcam_port: u16,
    /// Seconds between fleet status sweeps in the monitor.
    pub status_interval_secs: u64,
    pub timeouts: DeviceTimeouts,
    /// Extensions accepted for upload to a printer (lower-case, no dot).
    pub allowed_extensions: Vec<String>,
    /// Suffix a remote file must carry to be picked when starting a job.
    pub print_file_extension: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            printers_file: "printers.json".into(),
            jobs_file: "jobs.json".into(),
            files_file: "files.json".into(),
            sequences_file: "sequences.json".into(),
            default_control_port: DEFAULT_CONTROL_PORT,
            webcam_port: DEFAULT_WEBCAM_PORT,
            status_interval_secs: 5,
            timeouts: DeviceTimeouts::default(),
            allowed_extensions: ["gcode", "g", "gco", "gcode.gz", "ufp", "3mf"]
                .into_iter()
                .map(String::from)
                .collect(),
            print_file_extension: ".gcode".into(),
        }
    }
}

impl FleetConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }

    /// Whether `filename` may be uploaded to a printer.
    ///
    /// Multi-part extensions such as `gcode.gz` are matched as suffixes.
    pub fn is_allowed_upload(&self, filename: &str) -> bool {
        let lower = filename.to_ascii_lowercase();
        let Some((stem, _)) = lower.split_once('.') else {
            return false;
        };
        if stem.is_empty() && lower.matches('.').count() == 1 {
            return false;
        }
        self.allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
    }
}
