//! Performer rows, their owned collections, and scene appearances.

use super::{get_time, get_uuid, joins, micros};
use crate::model::Performer;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

const OWNED_TABLES: [&str; 5] = [
    "performer_aliases",
    "performer_urls",
    "performer_images",
    "performer_tattoos",
    "performer_piercings",
];

/// A performer's billing on one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    pub scene_id: Uuid,
    pub alias: Option<String>,
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn insert(conn: &Connection, performer: &Performer) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO performers (
            performer_id, name, disambiguation, gender, birthdate, ethnicity, country,
            eye_color, hair_color, height, career_start_year, career_end_year,
            is_deleted, created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            performer.id.to_string(),
            performer.name,
            performer.disambiguation,
            performer.gender,
            performer.birthdate,
            performer.ethnicity,
            performer.country,
            performer.eye_color,
            performer.hair_color,
            performer.height,
            performer.career_start_year,
            performer.career_end_year,
            performer.deleted,
            micros(performer.created_at),
            micros(performer.updated_at),
        ],
    )?;
    write_collections(conn, performer)
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn update(conn: &Connection, performer: &Performer) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE performers SET
            name = ?2, disambiguation = ?3, gender = ?4, birthdate = ?5, ethnicity = ?6,
            country = ?7, eye_color = ?8, hair_color = ?9, height = ?10,
            career_start_year = ?11, career_end_year = ?12, updated_at_us = ?13
         WHERE performer_id = ?1",
        params![
            performer.id.to_string(),
            performer.name,
            performer.disambiguation,
            performer.gender,
            performer.birthdate,
            performer.ethnicity,
            performer.country,
            performer.eye_color,
            performer.hair_color,
            performer.height,
            performer.career_start_year,
            performer.career_end_year,
            micros(performer.updated_at),
        ],
    )?;
    write_collections(conn, performer)
}

fn write_collections(conn: &Connection, performer: &Performer) -> rusqlite::Result<()> {
    let id = performer.id;
    joins::replace_strings(
        conn,
        "performer_aliases",
        "performer_id",
        "alias",
        id,
        &performer.aliases,
    )?;
    joins::replace_urls(conn, "performer_urls", "performer_id", id, &performer.urls)?;
    joins::replace_ids(
        conn,
        "performer_images",
        "performer_id",
        "image_id",
        id,
        &performer.images,
    )?;
    joins::replace_body_mods(
        conn,
        "performer_tattoos",
        "performer_id",
        id,
        &performer.tattoos,
    )?;
    joins::replace_body_mods(
        conn,
        "performer_piercings",
        "performer_id",
        id,
        &performer.piercings,
    )
}

/// Fetch a performer by id, including soft-deleted performers.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Performer>> {
    let performer = conn
        .query_row(
            "SELECT performer_id, name, disambiguation, gender, birthdate, ethnicity, country,
                    eye_color, hair_color, height, career_start_year, career_end_year,
                    is_deleted, created_at_us, updated_at_us
             FROM performers WHERE performer_id = ?1",
            params![id.to_string()],
            |row| {
                Ok(Performer {
                    id: get_uuid(row, 0)?,
                    name: row.get(1)?,
                    disambiguation: row.get(2)?,
                    gender: row.get(3)?,
                    birthdate: row.get(4)?,
                    ethnicity: row.get(5)?,
                    country: row.get(6)?,
                    eye_color: row.get(7)?,
                    hair_color: row.get(8)?,
                    height: row.get(9)?,
                    career_start_year: row.get(10)?,
                    career_end_year: row.get(11)?,
                    aliases: Vec::new(),
                    urls: Vec::new(),
                    images: Vec::new(),
                    tattoos: Vec::new(),
                    piercings: Vec::new(),
                    deleted: row.get(12)?,
                    created_at: get_time(row, 13)?,
                    updated_at: get_time(row, 14)?,
                })
            },
        )
        .optional()?;

    performer
        .map(|mut performer| {
            let id = performer.id;
            performer.aliases =
                joins::load_strings(conn, "performer_aliases", "performer_id", "alias", id)?;
            performer.urls = joins::load_urls(conn, "performer_urls", "performer_id", id)?;
            performer.images =
                joins::load_ids(conn, "performer_images", "performer_id", "image_id", id)?;
            performer.tattoos =
                joins::load_body_mods(conn, "performer_tattoos", "performer_id", id)?;
            performer.piercings =
                joins::load_body_mods(conn, "performer_piercings", "performer_id", id)?;
            Ok(performer)
        })
        .transpose()
}

/// Mark a performer deleted and drop its owned collections.
///
/// Scene appearances are left to the caller: a destroy removes them, a merge
/// has already moved them.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn soft_delete(conn: &Connection, id: Uuid, now: DateTime<Utc>) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE performers SET is_deleted = 1, updated_at_us = ?2 WHERE performer_id = ?1",
        params![id.to_string(), micros(now)],
    )?;
    for table in OWNED_TABLES {
        joins::clear(conn, table, "performer_id", id)?;
    }
    Ok(())
}

/// Every scene the performer appears on.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn appearances(conn: &Connection, performer_id: Uuid) -> rusqlite::Result<Vec<Appearance>> {
    let mut stmt = conn.prepare(
        "SELECT scene_id, alias FROM scene_performers WHERE performer_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![performer_id.to_string()], |row| {
        Ok(Appearance {
            scene_id: get_uuid(row, 0)?,
            alias: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn appears_in(conn: &Connection, scene_id: Uuid, performer_id: Uuid) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM scene_performers WHERE scene_id = ?1 AND performer_id = ?2)",
        params![scene_id.to_string(), performer_id.to_string()],
        |row| row.get(0),
    )
}

/// Credit `to` with the appearance `from` had on a scene. When
/// `fallback_alias` is given it fills in a missing billing alias.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn reassign_appearance(
    conn: &Connection,
    scene_id: Uuid,
    from: Uuid,
    to: Uuid,
    fallback_alias: Option<&str>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE scene_performers
         SET performer_id = ?3, alias = COALESCE(alias, ?4)
         WHERE scene_id = ?1 AND performer_id = ?2",
        params![
            scene_id.to_string(),
            from.to_string(),
            to.to_string(),
            fallback_alias
        ],
    )
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn remove_appearance(
    conn: &Connection,
    scene_id: Uuid,
    performer_id: Uuid,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM scene_performers WHERE scene_id = ?1 AND performer_id = ?2",
        params![scene_id.to_string(), performer_id.to_string()],
    )
}

/// Remove the performer from every scene.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn remove_all_appearances(conn: &Connection, performer_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM scene_performers WHERE performer_id = ?1",
        params![performer_id.to_string()],
    )
}

/// After a rename from `old_name` to `new_name`: bill un-aliased
/// appearances under the old name, and drop aliases that now equal the
/// performer's name. Returns the number of rows touched.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn rebill_after_rename(
    conn: &Connection,
    performer_id: Uuid,
    old_name: &str,
    new_name: &str,
) -> rusqlite::Result<usize> {
    let id = performer_id.to_string();
    let backfilled = conn.execute(
        "UPDATE scene_performers SET alias = ?2 WHERE performer_id = ?1 AND alias IS NULL",
        params![id, old_name],
    )?;
    let cleared = conn.execute(
        "UPDATE scene_performers SET alias = NULL WHERE performer_id = ?1 AND alias = ?2",
        params![id, new_name],
    )?;
    Ok(backfilled + cleared)
}
