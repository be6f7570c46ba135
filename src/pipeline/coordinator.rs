use chrono::NaiveDate;
use clap::ValueEnum;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, instrument, warn};

use crate::domain::EntityKind;
use crate::error::{ImportError, Result};
use crate::pipeline::processing::catalog::{ResolveSettings, ResolvedRecord, Resolver};
use crate::pipeline::processing::enrich::GeoEnricher;
use crate::pipeline::processing::sanitize::{EstablishmentRecord, Sanitized};
use crate::pipeline::stats::ImportStats;

/// Lifecycle of one run. `Validating`, `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Loading,
    Validating,
    Importing,
    Committed,
    RolledBack,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Loading => "loading",
            RunState::Validating => "validating",
            RunState::Importing => "importing",
            RunState::Committed => "committed",
            RunState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Holds the current [`RunState`] and logs every transition.
#[derive(Debug)]
pub struct RunTracker {
    state: RunState,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self { state: RunState::Idle }
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) {
        info!(from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

/// How record failures interact with the surrounding transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
pub enum TransactionPolicy {
    /// One transaction; the first error rolls everything back
    Atomic,
    /// One transaction with a savepoint per record
    #[default]
    Isolated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub policy: TransactionPolicy,
    pub dry_run: bool,
    pub resolve: ResolveSettings,
}

impl ImportOptions {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            policy: TransactionPolicy::default(),
            dry_run: false,
            resolve: ResolveSettings::new(run_date),
        }
    }
}

/// What happened to one sanitized record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Imported(ResolvedRecord),
    /// Resolution failed and the record's savepoint was rolled back (dry-run only)
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub stats: ImportStats,
    pub state: RunState,
    pub dry_run: bool,
    pub policy: TransactionPolicy,
    pub records_total: usize,
    pub records_imported: usize,
    pub records_dropped: usize,
    /// `name: error` for each record skipped during resolution
    pub failures: Vec<String>,
}

/// Runs the resolver over a sanitized feed inside the transaction layout
/// selected by the [`TransactionPolicy`].
pub struct Importer {
    options: ImportOptions,
    enricher: Option<GeoEnricher>,
}

impl Importer {
    pub fn new(options: ImportOptions, enricher: Option<GeoEnricher>) -> Self {
        Self { options, enricher }
    }

    #[instrument(skip_all, fields(policy = ?self.options.policy, dry_run = self.options.dry_run))]
    pub async fn run(
        &self,
        conn: &mut Connection,
        sanitized: &Sanitized,
        tracker: &mut RunTracker,
    ) -> Result<ImportReport> {
        tracker.advance(RunState::Importing);

        let mut stats = ImportStats::new();
        sanitized.report.record_skips(&mut stats);

        let resolver = Resolver::new(self.enricher.as_ref(), self.options.resolve);
        let total = sanitized.records.len();
        let mut imported = 0;
        let mut failures = Vec::new();

        let mut tx = conn.transaction()?;
        for (i, record) in sanitized.records.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, record.name);

            let outcome = match self.options.policy {
                TransactionPolicy::Atomic => self.import_atomic(&tx, &resolver, record, &mut stats).await,
                TransactionPolicy::Isolated => {
                    self.import_isolated(&mut tx, &resolver, record, &mut stats).await
                }
            };

            match outcome {
                Ok(RecordOutcome::Imported(_)) => imported += 1,
                Ok(RecordOutcome::Skipped { reason }) => {
                    failures.push(format!("{}: {}", record.name, reason));
                }
                Err(e) => {
                    error!(error = %e, "import aborted, rolling back");
                    if let Err(rollback) = tx.rollback() {
                        warn!(error = %rollback, "rollback failed");
                    }
                    tracker.advance(RunState::RolledBack);
                    return Err(e);
                }
            }
        }

        if self.options.dry_run {
            tx.rollback()?;
            tracker.advance(RunState::RolledBack);
            info!("dry run: all changes rolled back");
        } else {
            tx.commit()?;
            tracker.advance(RunState::Committed);
        }

        Ok(ImportReport {
            stats,
            state: tracker.state(),
            dry_run: self.options.dry_run,
            policy: self.options.policy,
            records_total: total + sanitized.report.dropped_records,
            records_imported: imported,
            records_dropped: sanitized.report.dropped_records,
            failures,
        })
    }

    async fn import_atomic(
        &self,
        tx: &Transaction<'_>,
        resolver: &Resolver<'_>,
        record: &EstablishmentRecord,
        stats: &mut ImportStats,
    ) -> Result<RecordOutcome> {
        let mut record_stats = ImportStats::new();
        let resolved = resolver
            .resolve(tx, record, &mut record_stats)
            .await
            .map_err(|e| ImportError::for_record(&record.name, e))?;
        stats.merge(record_stats);
        Ok(RecordOutcome::Imported(resolved))
    }

    async fn import_isolated(
        &self,
        tx: &mut Transaction<'_>,
        resolver: &Resolver<'_>,
        record: &EstablishmentRecord,
        stats: &mut ImportStats,
    ) -> Result<RecordOutcome> {
        let mut record_stats = ImportStats::new();
        let savepoint = tx.savepoint()?;

        match resolver.resolve(&savepoint, record, &mut record_stats).await {
            Ok(resolved) => {
                savepoint.commit()?;
                stats.merge(record_stats);
                Ok(RecordOutcome::Imported(resolved))
            }
            Err(e) => {
                // dropping the savepoint rolls it back
                drop(savepoint);
                if self.options.dry_run {
                    warn!(record = %record.name, error = %e, "record failed, skipped");
                    stats.skip(EntityKind::Establishment);
                    Ok(RecordOutcome::Skipped { reason: e.to_string() })
                } else {
                    Err(ImportError::for_record(&record.name, e))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_starts_idle_and_follows_transitions() {
        let mut tracker = RunTracker::new();
        assert_eq!(tracker.state(), RunState::Idle);
        tracker.advance(RunState::Loading);
        tracker.advance(RunState::Importing);
        tracker.advance(RunState::Committed);
        assert_eq!(tracker.state(), RunState::Committed);
    }

    #[test]
    fn isolated_is_the_default_policy() {
        let options = ImportOptions::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(options.policy, TransactionPolicy::Isolated);
        assert!(!options.dry_run);
        assert!(options.resolve.departments && options.resolve.affiliations);
    }
}
