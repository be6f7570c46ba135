use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::domain::EntityKind;
use crate::error::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Open (creating if needed) the catalog database at `path` and run migrations.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    info!("Opening catalog database at {}", path.display());
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(include_str!("../migrations/001_create_catalog.sql"))?;
    Ok(())
}

/// Row count of the table backing `kind`.
pub fn count(conn: &Connection, kind: EntityKind) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    let n = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(n)
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Uuid::parse_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        NaiveDate::parse_from_str(&t, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}
