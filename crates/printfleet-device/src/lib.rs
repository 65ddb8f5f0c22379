// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintFleet Device — typed access to one printer controller's REST API and
// the aggregation of several calls into one status snapshot.  Nothing here
// retries; callers decide whether a failure is fatal or just "offline".

pub mod client;
pub mod connector;
pub mod status;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{DeviceApi, ListPurpose, MoonrakerClient};
pub use connector::{DeviceConnector, HttpConnector};
pub use status::{StatusAggregator, StatusReport, SubCallOutcome};
