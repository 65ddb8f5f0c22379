// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-collection JSON persistence.
//
// Each collection lives in memory as an ordered `Vec` and on disk as a single
// pretty-printed JSON array.  Mutations build the new collection, write it to
// a temporary sibling file, rename it over the old one, and only then swap the
// in-memory copy.  A failed write therefore leaves memory and disk agreeing on
// the previous state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use printfleet_core::error::{FleetError, Result};
use printfleet_core::types::{FileEntry, PrintJob, Printer};

/// A persisted record with a stable string identity.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

impl Record for Printer {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for PrintJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for FileEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Store interface the registry, orchestrator, and catalog depend on.
///
/// Implementations serialize their own writes; callers that need a
/// read-modify-write cycle on one record hold an [`EntityLocks`] guard.
///
/// [`EntityLocks`]: crate::locks::EntityLocks
pub trait Collection<T: Record>: Send + Sync {
    /// All records in insertion order.
    fn get_all(&self) -> Result<Vec<T>>;

    fn get(&self, id: &str) -> Result<Option<T>>;

    /// Replace the record with the same id in place, or append it.
    fn upsert(&self, record: T) -> Result<()>;

    /// Remove a record. Returns whether anything was removed.
    fn delete(&self, id: &str) -> Result<bool>;
}

/// A collection backed by one JSON array file.
pub struct JsonCollection<T> {
    /// `None` for in-memory collections.
    path: Option<PathBuf>,
    records: Mutex<Vec<T>>,
}

impl<T: Record> JsonCollection<T> {
    /// Open (or create) the collection stored at `path`.
    ///
    /// A missing file is an empty collection.  A file that exists but does
    /// not parse is an error: silently starting empty would overwrite the
    /// operator's data on the next mutation.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| FleetError::Persistence(format!("read {}: {e}", path.display())))?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    FleetError::Persistence(format!("parse {}: {e}", path.display()))
                })?
            }
        } else {
            Vec::new()
        };

        info!(count = records.len(), "collection opened");
        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    /// An unpersisted collection (useful for tests).
    pub fn in_memory() -> Self {
        Self::with_records(Vec::new())
    }

    /// An unpersisted collection seeded with `records`.
    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            path: None,
            records: Mutex::new(records),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<T>>> {
        self.records
            .lock()
            .map_err(|_| FleetError::Persistence("collection lock poisoned".into()))
    }

    /// Persist `next` and make it the live collection.
    fn commit(&self, current: &mut Vec<T>, next: Vec<T>) -> Result<()> {
        if let Some(path) = &self.path {
            write_atomically(path, &next)?;
        }
        *current = next;
        Ok(())
    }
}

impl<T: Record> Collection<T> for JsonCollection<T> {
    fn get_all(&self) -> Result<Vec<T>> {
        Ok(self.guard()?.clone())
    }

    fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.guard()?.iter().find(|r| r.id() == id).cloned())
    }

    fn upsert(&self, record: T) -> Result<()> {
        let mut current = self.guard()?;
        let mut next = current.clone();
        match next.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => next.push(record),
        }
        self.commit(&mut current, next)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut current = self.guard()?;
        if !current.iter().any(|r| r.id() == id) {
            debug!(id, "delete of absent record");
            return Ok(false);
        }
        let next: Vec<T> = current.iter().filter(|r| r.id() != id).cloned().collect();
        self.commit(&mut current, next)?;
        Ok(true)
    }
}

/// Serialize `value` as pretty JSON and replace `path` with it atomically.
pub(crate) fn write_atomically<V: Serialize + ?Sized>(path: &Path, value: &V) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| FleetError::Persistence(format!("create {}: {e}", parent.display())))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".into());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    fs::write(&tmp, json)
        .map_err(|e| FleetError::Persistence(format!("write {}: {e}", tmp.display())))?;
    if let Err(e) = fs::rename(&tmp, path) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
        }
        return Err(FleetError::Persistence(format!(
            "replace {}: {e}",
            path.display()
        )));
    }
    Ok(())
}
