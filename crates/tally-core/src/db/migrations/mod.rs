//! Catalog schema versions.
//!
//! The version lives in two places: SQLite's `user_version` pragma, which
//! is what the upgrade path reads, and the `catalog_meta` row, which
//! `tally` surfaces to users. Both move together inside each step's
//! transaction.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Schema version a freshly initialized catalog ends up at.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// One upgrade step: the version it produces and the DDL that gets there.
struct Step {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    label: "catalog, edits and fingerprints",
    sql: schema::MIGRATION_V1_SQL,
}];

/// The catalog's schema version, from `PRAGMA user_version`. A database
/// that has never been migrated reports 0.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Bring the catalog up to [`LATEST_SCHEMA_VERSION`] and return the version
/// it ends at. Steps at or below the current version are skipped, so an
/// up-to-date catalog is left untouched.
///
/// # Errors
///
/// Returns an error if a step's DDL fails; that step's transaction is
/// rolled back and earlier steps stay applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    if start > LATEST_SCHEMA_VERSION {
        tracing::warn!(
            found = start,
            supported = LATEST_SCHEMA_VERSION,
            "catalog was written by a newer tally; leaving schema as is"
        );
        return Ok(start);
    }

    let mut at = start;
    for step in STEPS.iter().filter(|step| step.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.execute(
            "UPDATE catalog_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(step.version)],
        )?;
        tx.commit()?;
        tracing::debug!(version = step.version, step = step.label, "upgraded catalog schema");
        at = step.version;
    }

    Ok(at)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            )",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in [
            "users",
            "tags",
            "studios",
            "performers",
            "scenes",
            "scene_performers",
            "edits",
            "edit_votes",
            "edit_comments",
            "redirects",
            "fingerprints",
            "fingerprint_submissions",
            "catalog_meta",
        ] {
            assert!(
                sqlite_object_exists(&conn, "table", table)?,
                "missing table {table}"
            );
        }

        for index in schema::REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM catalog_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);

        let schema_version: i64 = conn.query_row(
            "SELECT schema_version FROM catalog_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(schema_version, i64::from(LATEST_SCHEMA_VERSION));

        Ok(())
    }

    #[test]
    fn newer_catalogs_are_left_alone() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "user_version", i64::from(LATEST_SCHEMA_VERSION + 1))?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION + 1);
        assert!(!sqlite_object_exists(&conn, "table", "edits")?);
        Ok(())
    }

    #[test]
    fn applied_requires_accepted_status() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        conn.execute(
            "INSERT INTO users (user_id, name, roles, created_at_us) VALUES ('u', 'u', 'edit', 0)",
            [],
        )?;

        let result = conn.execute(
            "INSERT INTO edits (edit_id, user_id, target_type, operation, status, applied, data, created_at_us)
             VALUES ('e', 'u', 'tag', 'create', 'pending', 1, '{}', 0)",
            [],
        );
        assert!(result.is_err(), "pending edit must not be marked applied");
        Ok(())
    }
}
