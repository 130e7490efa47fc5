//! Pointers from merged-away entities to the entity that absorbed them.

use super::{get_uuid, micros};
use crate::model::TargetType;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

/// Record `source -> target`, and repoint any redirect that pointed at
/// `source` so chains collapse to a single hop.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn record(
    conn: &Connection,
    target_type: TargetType,
    source: Uuid,
    target: Uuid,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    let repointed = conn.execute(
        "UPDATE redirects SET target_id = ?3 WHERE target_type = ?1 AND target_id = ?2",
        params![target_type.as_str(), source.to_string(), target.to_string()],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO redirects (target_type, source_id, target_id, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            target_type.as_str(),
            source.to_string(),
            target.to_string(),
            micros(now)
        ],
    )?;
    Ok(repointed)
}

/// The surviving id for a merged-away entity, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn resolve(
    conn: &Connection,
    target_type: TargetType,
    source: Uuid,
) -> rusqlite::Result<Option<Uuid>> {
    conn.query_row(
        "SELECT target_id FROM redirects WHERE target_type = ?1 AND source_id = ?2",
        params![target_type.as_str(), source.to_string()],
        |row| get_uuid(row, 0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::{record, resolve};
    use crate::db::open_in_memory;
    use crate::model::TargetType;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn chains_collapse_to_latest_target() {
        let conn = open_in_memory().expect("open");
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        record(&conn, TargetType::Tag, a, b, Utc::now()).expect("a -> b");
        let repointed = record(&conn, TargetType::Tag, b, c, Utc::now()).expect("b -> c");

        assert_eq!(repointed, 1);
        assert_eq!(resolve(&conn, TargetType::Tag, a).expect("resolve"), Some(c));
        assert_eq!(resolve(&conn, TargetType::Tag, b).expect("resolve"), Some(c));
        assert_eq!(resolve(&conn, TargetType::Studio, a).expect("resolve"), None);
    }
}
