//! SQLite catalog database utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers do not block the single writer
//! - `busy_timeout = 5s` to absorb transient lock contention
//! - `foreign_keys = ON` to protect relational integrity

pub mod edits;
pub mod fingerprints;
mod joins;
pub mod migrations;
pub mod performers;
pub mod redirects;
pub mod scenes;
pub mod schema;
pub mod studios;
pub mod tags;
pub mod users;

use crate::error::UnknownValue;
use crate::model::TargetType;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;
use std::{path::Path, time::Duration};
use uuid::Uuid;

/// Busy timeout used for catalog DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// File name of the catalog database inside the catalog directory.
pub const DB_FILE: &str = "catalog.sqlite3";

/// Open (or create) the catalog SQLite database, apply runtime pragmas,
/// and migrate schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_catalog(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create catalog db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open catalog database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply catalog migrations")?;

    Ok(conn)
}

/// Open a private in-memory catalog with the full schema.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory catalog")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply catalog migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

const fn entity_table(target_type: TargetType) -> (&'static str, &'static str) {
    match target_type {
        TargetType::Performer => ("performers", "performer_id"),
        TargetType::Scene => ("scenes", "scene_id"),
        TargetType::Studio => ("studios", "studio_id"),
        TargetType::Tag => ("tags", "tag_id"),
    }
}

/// Look up whether an entity exists and whether it is soft-deleted.
///
/// Returns `None` for an unknown id, `Some(true)` for a deleted entity.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn entity_deleted(
    conn: &Connection,
    target_type: TargetType,
    id: Uuid,
) -> rusqlite::Result<Option<bool>> {
    let (table, column) = entity_table(target_type);
    conn.query_row(
        &format!("SELECT is_deleted FROM {table} WHERE {column} = ?1"),
        params![id.to_string()],
        |row| row.get::<_, bool>(0),
    )
    .optional()
}

pub(crate) fn micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

pub(crate) fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}

pub(crate) fn get_opt_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        Uuid::parse_str(&raw).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error))
        })
    })
    .transpose()
}

pub(crate) fn get_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let us: i64 = row.get(idx)?;
    time_from_micros(idx, us)
}

pub(crate) fn get_opt_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let us: Option<i64> = row.get(idx)?;
    us.map(|us| time_from_micros(idx, us)).transpose()
}

fn time_from_micros(idx: usize, us: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(us).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {us} out of range").into(),
        )
    })
}

pub(crate) fn get_parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownValue>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}
