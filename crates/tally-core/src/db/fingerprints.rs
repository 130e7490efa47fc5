//! Fingerprint rows and their submitter sets.
//!
//! A row is unique on `(scene_id, hash, algorithm)`. Its `submissions`
//! column mirrors the size of the submitter set in
//! `fingerprint_submissions`; both are maintained together here.

use super::{get_parsed, get_time, get_uuid, micros};
use crate::model::{Fingerprint, FingerprintAlgorithm, FingerprintKey};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

/// Storage handle for one fingerprint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintRow {
    pub id: i64,
    pub submissions: u32,
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn find_row(
    conn: &Connection,
    scene_id: Uuid,
    hash: &str,
    algorithm: FingerprintAlgorithm,
) -> rusqlite::Result<Option<FingerprintRow>> {
    conn.query_row(
        "SELECT fingerprint_id, submissions FROM fingerprints
         WHERE scene_id = ?1 AND hash = ?2 AND algorithm = ?3",
        params![scene_id.to_string(), hash, algorithm.as_str()],
        |row| {
            Ok(FingerprintRow {
                id: row.get(0)?,
                submissions: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Create an empty fingerprint row and return its id.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn insert_row(
    conn: &Connection,
    scene_id: Uuid,
    key: &FingerprintKey,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO fingerprints (scene_id, hash, algorithm, duration, submissions, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
        params![
            scene_id.to_string(),
            key.hash,
            key.algorithm.as_str(),
            key.duration,
            micros(now)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Add a submitter and bump the count. A repeat submitter is a no-op;
/// returns whether the user was added.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn add_submitter(
    conn: &Connection,
    fingerprint_id: i64,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO fingerprint_submissions (fingerprint_id, user_id, created_at_us)
         VALUES (?1, ?2, ?3)",
        params![fingerprint_id, user_id.to_string(), micros(now)],
    )?;
    if inserted > 0 {
        conn.execute(
            "UPDATE fingerprints SET submissions = submissions + 1, updated_at_us = ?2
             WHERE fingerprint_id = ?1",
            params![fingerprint_id, micros(now)],
        )?;
    }
    Ok(inserted > 0)
}

/// Remove a submitter and decrement the count. Returns the remaining
/// count, or `None` when the user was not a submitter.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn remove_submitter(
    conn: &Connection,
    fingerprint_id: i64,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> rusqlite::Result<Option<u32>> {
    let removed = conn.execute(
        "DELETE FROM fingerprint_submissions WHERE fingerprint_id = ?1 AND user_id = ?2",
        params![fingerprint_id, user_id.to_string()],
    )?;
    if removed == 0 {
        return Ok(None);
    }
    conn.execute(
        "UPDATE fingerprints SET submissions = MAX(submissions - 1, 0), updated_at_us = ?2
         WHERE fingerprint_id = ?1",
        params![fingerprint_id, micros(now)],
    )?;
    conn.query_row(
        "SELECT submissions FROM fingerprints WHERE fingerprint_id = ?1",
        params![fingerprint_id],
        |row| row.get(0),
    )
    .map(Some)
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn delete_row(conn: &Connection, fingerprint_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM fingerprint_submissions WHERE fingerprint_id = ?1",
        params![fingerprint_id],
    )?;
    conn.execute(
        "DELETE FROM fingerprints WHERE fingerprint_id = ?1",
        params![fingerprint_id],
    )?;
    Ok(())
}

/// Delete every fingerprint of a scene. Returns the number of rows removed.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn delete_for_scene(conn: &Connection, scene_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM fingerprint_submissions WHERE fingerprint_id IN (
            SELECT fingerprint_id FROM fingerprints WHERE scene_id = ?1
         )",
        params![scene_id.to_string()],
    )?;
    conn.execute(
        "DELETE FROM fingerprints WHERE scene_id = ?1",
        params![scene_id.to_string()],
    )
}

/// Submitters of one fingerprint, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn submitters(conn: &Connection, fingerprint_id: i64) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM fingerprint_submissions WHERE fingerprint_id = ?1
         ORDER BY created_at_us, user_id",
    )?;
    let rows = stmt.query_map(params![fingerprint_id], |row| get_uuid(row, 0))?;
    rows.collect()
}

/// Every fingerprint of a scene with its submitters.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn for_scene(conn: &Connection, scene_id: Uuid) -> rusqlite::Result<Vec<Fingerprint>> {
    let mut stmt = conn.prepare(
        "SELECT fingerprint_id, hash, algorithm, duration, submissions, created_at_us, updated_at_us
         FROM fingerprints WHERE scene_id = ?1 ORDER BY fingerprint_id",
    )?;
    let rows = stmt
        .query_map(params![scene_id.to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Fingerprint {
                    scene_id,
                    hash: row.get(1)?,
                    algorithm: get_parsed(row, 2)?,
                    duration: row.get(3)?,
                    submissions: row.get(4)?,
                    submitters: Vec::new(),
                    created_at: get_time(row, 5)?,
                    updated_at: get_time(row, 6)?,
                },
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, mut fingerprint)| {
            fingerprint.submitters = submitters(conn, id)?;
            Ok(fingerprint)
        })
        .collect()
}

/// `(row id, key)` pairs of a scene's fingerprints.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn keys_for_scene(
    conn: &Connection,
    scene_id: Uuid,
) -> rusqlite::Result<Vec<(i64, FingerprintKey)>> {
    let mut stmt = conn.prepare(
        "SELECT fingerprint_id, hash, algorithm, duration FROM fingerprints
         WHERE scene_id = ?1 ORDER BY fingerprint_id",
    )?;
    let rows = stmt.query_map(params![scene_id.to_string()], |row| {
        Ok((
            row.get(0)?,
            FingerprintKey {
                hash: row.get(1)?,
                algorithm: get_parsed(row, 2)?,
                duration: row.get(3)?,
            },
        ))
    })?;
    rows.collect()
}

/// Move a fingerprint row to another scene.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn move_to_scene(
    conn: &Connection,
    fingerprint_id: i64,
    scene_id: Uuid,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE fingerprints SET scene_id = ?2, updated_at_us = ?3 WHERE fingerprint_id = ?1",
        params![fingerprint_id, scene_id.to_string(), micros(now)],
    )
}

/// Live scenes with a fingerprint equal to `hash`, optionally restricted to
/// one algorithm. Ordered by the fingerprint's creation.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn scenes_with_hash(
    conn: &Connection,
    hash: &str,
    algorithm: Option<FingerprintAlgorithm>,
) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT f.scene_id FROM fingerprints f
         JOIN scenes s ON s.scene_id = f.scene_id AND s.is_deleted = 0
         WHERE f.hash = ?1 AND (?2 IS NULL OR f.algorithm = ?2)
         ORDER BY f.fingerprint_id",
    )?;
    let rows = stmt.query_map(
        params![hash, algorithm.map(FingerprintAlgorithm::as_str)],
        |row| get_uuid(row, 0),
    )?;
    rows.collect()
}

/// `(scene, hash)` for every perceptual hash on a live scene.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn live_phashes(conn: &Connection) -> rusqlite::Result<Vec<(Uuid, String)>> {
    let mut stmt = conn.prepare(
        "SELECT f.scene_id, f.hash FROM fingerprints f
         JOIN scenes s ON s.scene_id = f.scene_id AND s.is_deleted = 0
         WHERE f.algorithm = 'PHASH'
         ORDER BY f.fingerprint_id",
    )?;
    let rows = stmt.query_map([], |row| Ok((get_uuid(row, 0)?, row.get(1)?)))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::{
        add_submitter, find_row, for_scene, insert_row, remove_submitter, scenes_with_hash,
    };
    use crate::db::{open_in_memory, scenes, users};
    use crate::model::{FingerprintAlgorithm, FingerprintKey, RoleSet, Scene, User};
    use chrono::Utc;
    use rusqlite::Connection;
    use uuid::Uuid;

    fn seed_user(conn: &Connection, name: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            roles: RoleSet::default(),
            created_at: Utc::now(),
        };
        users::insert(conn, &user).expect("user");
        user.id
    }

    fn key(hash: &str) -> FingerprintKey {
        FingerprintKey {
            hash: hash.into(),
            algorithm: FingerprintAlgorithm::Md5,
            duration: 120,
        }
    }

    #[test]
    fn submitter_count_tracks_submission_set() {
        let conn = open_in_memory().expect("open");
        let scene = Scene::new(Uuid::new_v4(), Utc::now());
        scenes::insert(&conn, &scene).expect("scene");
        let (u1, u2) = (seed_user(&conn, "u1"), seed_user(&conn, "u2"));

        let id = insert_row(&conn, scene.id, &key("abc"), Utc::now()).expect("row");
        assert!(add_submitter(&conn, id, u1, Utc::now()).expect("u1"));
        assert!(!add_submitter(&conn, id, u1, Utc::now()).expect("u1 again"));
        assert!(add_submitter(&conn, id, u2, Utc::now()).expect("u2"));

        let row = find_row(&conn, scene.id, "abc", FingerprintAlgorithm::Md5)
            .expect("find")
            .expect("present");
        assert_eq!(row.submissions, 2);

        assert_eq!(remove_submitter(&conn, id, u1, Utc::now()).expect("remove"), Some(1));
        assert_eq!(remove_submitter(&conn, id, u1, Utc::now()).expect("again"), None);

        let stored = for_scene(&conn, scene.id).expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].submitters, vec![u2]);
    }

    #[test]
    fn hash_lookup_ignores_deleted_scenes() {
        let conn = open_in_memory().expect("open");
        let live = Scene::new(Uuid::new_v4(), Utc::now());
        let gone = Scene::new(Uuid::new_v4(), Utc::now());
        scenes::insert(&conn, &live).expect("live");
        scenes::insert(&conn, &gone).expect("gone");
        insert_row(&conn, live.id, &key("abc"), Utc::now()).expect("live fp");
        insert_row(&conn, gone.id, &key("abc"), Utc::now()).expect("gone fp");
        scenes::soft_delete(&conn, gone.id, Utc::now()).expect("delete");

        let found = scenes_with_hash(&conn, "abc", None).expect("lookup");
        assert_eq!(found, vec![live.id]);
        let none = scenes_with_hash(&conn, "abc", Some(FingerprintAlgorithm::Phash)).expect("lookup");
        assert!(none.is_empty());
    }
}
