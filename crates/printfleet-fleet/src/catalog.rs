// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata catalog of print files known to the orchestrator.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use printfleet_core::error::{FleetError, Result};
use printfleet_core::ids::IdKind;
use printfleet_core::types::{FileEntry, file_type_of};
use printfleet_store::{Collection, SequenceStore};

/// Stores `FileEntry` metadata. The bytes themselves live wherever the
/// uploader put them; `path` records where.
pub struct FileCatalog {
    files: Arc<dyn Collection<FileEntry>>,
    sequences: Arc<SequenceStore>,
}

impl FileCatalog {
    pub fn new(files: Arc<dyn Collection<FileEntry>>, sequences: Arc<SequenceStore>) -> Self {
        Self { files, sequences }
    }

    #[instrument(skip(self, description))]
    pub fn register(&self, name: &str, path: &str, size: u64, description: &str) -> Result<FileEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FleetError::Validation("file name is required".into()));
        }

        let existing = self.files.get_all()?;
        let floor = IdKind::File.highest(existing.iter().map(|f| f.id.as_str()));
        let n = self.sequences.next(IdKind::File.sequence_name(), floor)?;
        let now = Utc::now();

        let entry = FileEntry {
            id: IdKind::File.format(n),
            name: name.to_string(),
            path: if path.is_empty() { name.to_string() } else { path.to_string() },
            size,
            file_type: file_type_of(name),
            description: description.to_string(),
            uploaded: now,
            modified: now,
        };
        self.files.upsert(entry.clone())?;
        info!(file_id = %entry.id, "file registered");
        Ok(entry)
    }

    pub fn list(&self) -> Result<Vec<FileEntry>> {
        self.files.get_all()
    }

    pub fn find(&self, id: &str) -> Result<FileEntry> {
        self.files
            .get(id)?
            .ok_or_else(|| FleetError::FileNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        if !self.files.delete(id)? {
            return Err(FleetError::FileNotFound(id.to_string()));
        }
        info!(file_id = id, "file removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use printfleet_store::JsonCollection;

    use super::*;

    fn catalog() -> FileCatalog {
        FileCatalog::new(
            Arc::new(JsonCollection::<FileEntry>::in_memory()),
            Arc::new(SequenceStore::in_memory()),
        )
    }

    #[test]
    fn register_find_remove() {
        let cat = catalog();
        let entry = cat
            .register("Benchy.GCODE", "uploads/benchy.gcode", 2048, "calibration")
            .unwrap();
        assert_eq!(entry.id, "file-001");
        assert_eq!(entry.file_type, "gcode");
        assert_eq!(entry.uploaded, entry.modified);
        assert_eq!(cat.find("file-001").unwrap(), entry);

        cat.remove("file-001").unwrap();
        assert!(matches!(cat.find("file-001"), Err(FleetError::FileNotFound(_))));
        assert!(matches!(cat.remove("file-001"), Err(FleetError::FileNotFound(_))));
    }

    #[test]
    fn ids_are_not_reused() {
        let cat = catalog();
        cat.register("a.gcode", "", 1, "").unwrap();
        let b = cat.register("b.gcode", "", 1, "").unwrap();
        cat.remove(&b.id).unwrap();
        let c = cat.register("c.gcode", "", 1, "").unwrap();
        assert_eq!(c.id, "file-003");
        assert_eq!(c.path, "c.gcode");
        assert_eq!(cat.list().unwrap().len(), 2);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(
            catalog().register(" ", "x", 0, ""),
            Err(FleetError::Validation(_))
        ));
    }
}
