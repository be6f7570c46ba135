use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::EntityKind;
use crate::pipeline::processing::catalog::Upsert;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounters {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeoCounters {
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-run counters. Passed by `&mut` through the resolver and merged per
/// record; reading them never changes what the importer does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    kinds: BTreeMap<EntityKind, KindCounters>,
    pub geolocation: GeoCounters,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one upsert outcome. An unchanged existing row counts as skipped.
    pub fn record<T>(&mut self, kind: EntityKind, outcome: &Upsert<T>) {
        let counters = self.kinds.entry(kind).or_default();
        match outcome {
            Upsert::Created(_) => counters.created += 1,
            Upsert::Updated(_) => counters.updated += 1,
            Upsert::Unchanged(_) => counters.skipped += 1,
        }
    }

    pub fn skip(&mut self, kind: EntityKind) {
        self.skip_many(kind, 1);
    }

    pub fn skip_many(&mut self, kind: EntityKind, n: usize) {
        if n > 0 {
            self.kinds.entry(kind).or_default().skipped += n;
        }
    }

    pub fn geo_success(&mut self) {
        self.geolocation.succeeded += 1;
    }

    pub fn geo_failure(&mut self) {
        self.geolocation.failed += 1;
    }

    pub fn get(&self, kind: EntityKind) -> KindCounters {
        self.kinds.get(&kind).copied().unwrap_or_default()
    }

    pub fn created(&self, kind: EntityKind) -> usize {
        self.get(kind).created
    }

    pub fn updated(&self, kind: EntityKind) -> usize {
        self.get(kind).updated
    }

    pub fn skipped(&self, kind: EntityKind) -> usize {
        self.get(kind).skipped
    }

    pub fn total_created(&self) -> usize {
        self.kinds.values().map(|c| c.created).sum()
    }

    pub fn merge(&mut self, other: ImportStats) {
        for (kind, counters) in other.kinds {
            let mine = self.kinds.entry(kind).or_default();
            mine.created += counters.created;
            mine.updated += counters.updated;
            mine.skipped += counters.skipped;
        }
        self.geolocation.succeeded += other.geolocation.succeeded;
        self.geolocation.failed += other.geolocation.failed;
    }

    /// One line per entity kind, then the geolocation line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = EntityKind::ALL
            .iter()
            .map(|kind| {
                let c = self.get(*kind);
                format!(
                    "{:<16} created: {:>5}  updated: {:>5}  skipped: {:>5}",
                    kind.label(),
                    c.created,
                    c.updated,
                    c.skipped
                )
            })
            .collect();
        lines.push(format!(
            "{:<16} success: {:>5}  failure: {:>5}",
            "Geolocation", self.geolocation.succeeded, self.geolocation.failed
        ));
        lines
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.summary_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_merge() {
        let mut run = ImportStats::new();
        run.record(EntityKind::Domain, &Upsert::Created(()));

        let mut record = ImportStats::new();
        record.record(EntityKind::Domain, &Upsert::Unchanged(()));
        record.record(EntityKind::Domain, &Upsert::Updated(()));
        record.skip(EntityKind::Accreditation);
        record.geo_failure();
        run.merge(record);

        assert_eq!(
            run.get(EntityKind::Domain),
            KindCounters {
                created: 1,
                updated: 1,
                skipped: 1
            }
        );
        assert_eq!(run.skipped(EntityKind::Accreditation), 1);
        assert_eq!(run.geolocation.failed, 1);
        assert_eq!(run.total_created(), 1);
    }

    #[test]
    fn summary_has_a_line_per_kind_plus_geolocation() {
        let lines = ImportStats::new().summary_lines();
        assert_eq!(lines.len(), EntityKind::ALL.len() + 1);
        assert!(lines[0].starts_with("Category"));
        assert!(lines.last().unwrap().starts_with("Geolocation"));
    }
}
