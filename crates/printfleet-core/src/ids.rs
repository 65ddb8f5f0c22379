// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable record identifiers (`ZB3D-001`, `job-007`, `file-012`).

/// The kinds of records that receive sequential identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Printer,
    Job,
    File,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Printer => "ZB3D",
            Self::Job => "job",
            Self::File => "file",
        }
    }

    /// Name of the persisted sequence backing this kind.
    pub fn sequence_name(&self) -> &'static str {
        match self {
            Self::Printer => "printers",
            Self::Job => "jobs",
            Self::File => "files",
        }
    }

    /// Render sequence number `n` as `{prefix}-{n:03}`.
    pub fn format(&self, n: u64) -> String {
        format!("{}-{n:03}", self.prefix())
    }

    /// Extract the sequence number from an id of this kind.
    ///
    /// Returns `None` for foreign or hand-edited ids so they never disturb
    /// allocation.
    pub fn parse(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.prefix())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    /// Highest sequence number among `ids`, or 0 if none parse.
    pub fn highest<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> u64 {
        ids.into_iter()
            .filter_map(|id| self.parse(id))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_three_digit_padding() {
        assert_eq!(IdKind::Printer.format(1), "ZB3D-001");
        assert_eq!(IdKind::Job.format(42), "job-042");
        assert_eq!(IdKind::File.format(1234), "file-1234");
    }

    #[test]
    fn parse_round_trips_and_rejects_foreign_ids() {
        assert_eq!(IdKind::Printer.parse("ZB3D-017"), Some(17));
        assert_eq!(IdKind::Printer.parse("job-017"), None);
        assert_eq!(IdKind::Job.parse("job-abc"), None);
    }

    #[test]
    fn highest_ignores_unparseable() {
        let ids = ["job-001", "job-009", "custom", "job-003"];
        assert_eq!(IdKind::Job.highest(ids), 9);
        assert_eq!(IdKind::Job.highest(std::iter::empty()), 0);
    }
}
