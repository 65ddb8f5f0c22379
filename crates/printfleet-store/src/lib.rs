// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintFleet Store — the persistence gateway.  Every collection is one
// human-readable JSON array rewritten whole on each mutation; id sequences
// and per-record locks live here too so the registry and orchestrator share
// one consistent view of storage.

pub mod collection;
pub mod locks;
pub mod sequence;

pub use collection::{Collection, JsonCollection, Record};
pub use locks::EntityLocks;
pub use sequence::SequenceStore;
