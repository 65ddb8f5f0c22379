// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintFleet — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use config::{DeviceTimeouts, FleetConfig};
pub use error::FleetError;
pub use ids::IdKind;
pub use types::*;
