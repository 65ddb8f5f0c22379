// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent monotonic id sequences.
//
// Ids are never derived from the current collection length: removing a record
// would then hand its id to the next one.  Each sequence only moves forward
// and is written to disk before the new number is returned.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, instrument};

use printfleet_core::error::{FleetError, Result};

use crate::collection::write_atomically;

/// Named counters persisted as one JSON object (`{"printers": 3, ...}`).
pub struct SequenceStore {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, u64>>,
}

impl SequenceStore {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| FleetError::Persistence(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&raw)
                .map_err(|e| FleetError::Persistence(format!("parse {}: {e}", path.display())))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    /// Advance sequence `name` and return the new value.
    ///
    /// `floor` is the highest number already in use by existing records; it
    /// seeds the sequence for data written before sequences were persisted.
    pub fn next(&self, name: &str, floor: u64) -> Result<u64> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| FleetError::Persistence("sequence lock poisoned".into()))?;
        let current = values.get(name).copied().unwrap_or(0).max(floor);
        let next = current + 1;

        let mut updated = values.clone();
        updated.insert(name.to_string(), next);
        if let Some(path) = &self.path {
            write_atomically(path, &updated)?;
        }
        *values = updated;

        debug!(sequence = name, value = next, "sequence advanced");
        Ok(next)
    }

    /// Last value handed out for `name` (0 if never used).
    pub fn current(&self, name: &str) -> u64 {
        self.values
            .lock()
            .map(|v| v.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_only_move_forward() {
        let seq = SequenceStore::in_memory();
        assert_eq!(seq.next("printers", 0).unwrap(), 1);
        assert_eq!(seq.next("printers", 0).unwrap(), 2);
        // A lower floor never rewinds.
        assert_eq!(seq.next("printers", 1).unwrap(), 3);
        assert_eq!(seq.next("jobs", 0).unwrap(), 1);
    }

    #[test]
    fn floor_seeds_from_existing_records() {
        let seq = SequenceStore::in_memory();
        assert_eq!(seq.next("jobs", 7).unwrap(), 8);
        assert_eq!(seq.current("jobs"), 8);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sequences.json");
        {
            let seq = SequenceStore::open(&path).unwrap();
            seq.next("printers", 0).unwrap();
            seq.next("printers", 0).unwrap();
        }
        let seq = SequenceStore::open(&path).unwrap();
        assert_eq!(seq.current("printers"), 2);
        assert_eq!(seq.next("printers", 0).unwrap(), 3);
    }
}
