// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PrintFleet.

use thiserror::Error;

/// Top-level error type for all PrintFleet operations.
#[derive(Debug, Error)]
pub enum FleetError {
    // -- Lookup errors --
    #[error("printer not found: {0}")]
    PrinterNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    // -- Orchestration errors --
    #[error("no available printers for job {0}")]
    NoAvailablePrinters(String),

    #[error("job {job_id} cannot {action} while {status}")]
    InvalidTransition {
        job_id: String,
        action: &'static str,
        status: String,
    },

    // -- Device errors --
    #[error("printer {printer_id} unreachable: {reason}")]
    DeviceUnreachable { printer_id: String, reason: String },

    #[error("printer {printer_id} returned an error: {reason}")]
    DeviceError { printer_id: String, reason: String },

    // -- Input errors --
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    // -- Storage / persistence --
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FleetError {
    /// Stable machine-readable code for the transport layer.
    ///
    /// The HTTP layer maps these to status codes; the core never does.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrinterNotFound(_) => "printer_not_found",
            Self::JobNotFound(_) => "job_not_found",
            Self::FileNotFound(_) => "file_not_found",
            Self::NoAvailablePrinters(_) => "no_available_printers",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::DeviceUnreachable { .. } => "device_unreachable",
            Self::DeviceError { .. } => "device_error",
            Self::Validation(_) => "validation_error",
            Self::UnsupportedFile(_) => "unsupported_file",
            Self::Persistence(_) | Self::Io(_) | Self::Serialization(_) => "persistence_error",
        }
    }

    /// Whether this error came from talking to a printer controller.
    pub fn is_device_failure(&self) -> bool {
        matches!(self, Self::DeviceUnreachable { .. } | Self::DeviceError { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_serde_errors_share_the_persistence_code() {
        let io = FleetError::from(std::io::Error::other("disk full"));
        assert_eq!(io.code(), "persistence_error");

        let serde = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(FleetError::from(serde).code(), "persistence_error");
    }

    #[test]
    fn device_failures_are_classified() {
        let err = FleetError::DeviceUnreachable {
            printer_id: "ZB3D-001".into(),
            reason: "timed out".into(),
        };
        assert!(err.is_device_failure());
        assert!(!FleetError::JobNotFound("job-001".into()).is_device_failure());
    }

    #[test]
    fn transition_message_names_the_state() {
        let err = FleetError::InvalidTransition {
            job_id: "job-004".into(),
            action: "pause",
            status: "cancelled".into(),
        };
        assert_eq!(err.to_string(), "job job-004 cannot pause while cancelled");
    }
}
