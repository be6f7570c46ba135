// Import pipeline: ingestion, processing and the transactional coordinator

pub mod coordinator;
pub mod ingestion;
pub mod processing;
pub mod stats;

use rusqlite::Connection;
use std::path::Path;
use tracing::{info, warn};

use crate::db;
use crate::error::Result;
pub use coordinator::{ImportOptions, ImportReport, Importer, RunState, RunTracker, TransactionPolicy};
use processing::sanitize::{sanitize, Sanitized};
use processing::validate::{validate, ValidationReport};
pub use stats::ImportStats;

/// Load the feed and check it against the structural rules. Never touches
/// the database.
pub fn run_validation(path: &Path, tracker: &mut RunTracker) -> Result<ValidationReport> {
    tracker.advance(RunState::Loading);
    let raw = ingestion::load_feed(path)?;
    tracker.advance(RunState::Validating);
    let report = validate(&raw);
    info!(
        records = report.total_records,
        invalid = report.invalid_records(),
        issues = report.issue_count(),
        "validation finished"
    );
    Ok(report)
}

/// Load and sanitize the feed at `path`.
pub fn load_sanitized(path: &Path, tracker: &mut RunTracker) -> Result<Sanitized> {
    tracker.advance(RunState::Loading);
    let raw = ingestion::load_feed(path)?;

    let sanitized = sanitize(&raw);
    let dropped = &sanitized.report;
    if dropped.dropped_records > 0 || dropped.dropped_domains > 0 || dropped.dropped_departments > 0 {
        warn!(
            records = dropped.dropped_records,
            departments = dropped.dropped_departments,
            domains = dropped.dropped_domains,
            references = dropped.stripped_references,
            "incomplete feed entries dropped"
        );
    }
    Ok(sanitized)
}

/// Load, sanitize and import the feed at `path` into an open catalog.
pub async fn run_import(
    path: &Path,
    conn: &mut Connection,
    importer: &Importer,
    tracker: &mut RunTracker,
) -> Result<ImportReport> {
    let sanitized = load_sanitized(path, tracker)?;
    importer.run(conn, &sanitized, tracker).await
}

/// Import the feed at `path` into the database file at `database`. The feed
/// is loaded first, so an unreadable feed leaves the filesystem untouched.
pub async fn import_file(
    path: &Path,
    database: &Path,
    importer: &Importer,
    tracker: &mut RunTracker,
) -> Result<(ImportReport, Connection)> {
    let sanitized = load_sanitized(path, tracker)?;
    let mut conn = db::open(database)?;
    let report = importer.run(&mut conn, &sanitized, tracker).await?;
    Ok((report, conn))
}
