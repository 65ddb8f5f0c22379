// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintFleet Fleet — the orchestration engine.  The registry owns printer
// records, the orchestrator owns print jobs and drives their state machine,
// and `FleetService` is the contract the HTTP layer calls into.

pub mod catalog;
pub mod control;
pub mod dispatch;
pub mod orchestrator;
pub mod registry;
pub mod service;

pub use catalog::FileCatalog;
pub use control::PrinterControl;
pub use dispatch::{Dispatch, DispatchOutcome};
pub use orchestrator::{JobTransition, Orchestrator};
pub use registry::Registry;
pub use service::{FleetService, Reply};
