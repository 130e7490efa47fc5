//! Studio rows, their owned collections, and inbound references from scenes
//! and child studios.

use super::{get_opt_uuid, get_time, get_uuid, joins, micros};
use crate::model::Studio;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

/// # Errors
///
/// Returns an error if the write fails.
pub fn insert(conn: &Connection, studio: &Studio) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO studios (studio_id, name, parent_studio_id, is_deleted, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            studio.id.to_string(),
            studio.name,
            studio.parent_id.map(|id| id.to_string()),
            studio.deleted,
            micros(studio.created_at),
            micros(studio.updated_at),
        ],
    )?;
    write_collections(conn, studio)
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn update(conn: &Connection, studio: &Studio) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE studios SET name = ?2, parent_studio_id = ?3, updated_at_us = ?4
         WHERE studio_id = ?1",
        params![
            studio.id.to_string(),
            studio.name,
            studio.parent_id.map(|id| id.to_string()),
            micros(studio.updated_at),
        ],
    )?;
    write_collections(conn, studio)
}

fn write_collections(conn: &Connection, studio: &Studio) -> rusqlite::Result<()> {
    joins::replace_strings(
        conn,
        "studio_aliases",
        "studio_id",
        "alias",
        studio.id,
        &studio.aliases,
    )?;
    joins::replace_urls(conn, "studio_urls", "studio_id", studio.id, &studio.urls)?;
    joins::replace_ids(
        conn,
        "studio_images",
        "studio_id",
        "image_id",
        studio.id,
        &studio.images,
    )
}

/// Fetch a studio by id, including soft-deleted studios.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Studio>> {
    let studio = conn
        .query_row(
            "SELECT studio_id, name, parent_studio_id, is_deleted, created_at_us, updated_at_us
             FROM studios WHERE studio_id = ?1",
            params![id.to_string()],
            |row| {
                Ok(Studio {
                    id: get_uuid(row, 0)?,
                    name: row.get(1)?,
                    parent_id: get_opt_uuid(row, 2)?,
                    aliases: Vec::new(),
                    urls: Vec::new(),
                    images: Vec::new(),
                    deleted: row.get(3)?,
                    created_at: get_time(row, 4)?,
                    updated_at: get_time(row, 5)?,
                })
            },
        )
        .optional()?;

    studio
        .map(|mut studio| {
            studio.aliases =
                joins::load_strings(conn, "studio_aliases", "studio_id", "alias", studio.id)?;
            studio.urls = joins::load_urls(conn, "studio_urls", "studio_id", studio.id)?;
            studio.images =
                joins::load_ids(conn, "studio_images", "studio_id", "image_id", studio.id)?;
            Ok(studio)
        })
        .transpose()
}

/// Mark a studio deleted and drop its owned collections.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn soft_delete(conn: &Connection, id: Uuid, now: DateTime<Utc>) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE studios SET is_deleted = 1, updated_at_us = ?2 WHERE studio_id = ?1",
        params![id.to_string(), micros(now)],
    )?;
    joins::clear(conn, "studio_aliases", "studio_id", id)?;
    joins::clear(conn, "studio_urls", "studio_id", id)?;
    joins::clear(conn, "studio_images", "studio_id", id)?;
    Ok(())
}

/// Move every scene of `from` to `to`. Returns the number of scenes moved.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn reassign_scenes(conn: &Connection, from: Uuid, to: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE scenes SET studio_id = ?2 WHERE studio_id = ?1",
        params![from.to_string(), to.to_string()],
    )
}

/// Detach every scene from the studio.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn clear_scenes(conn: &Connection, studio_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE scenes SET studio_id = NULL WHERE studio_id = ?1",
        params![studio_id.to_string()],
    )
}

/// Studios whose parent is `parent_id`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn children(conn: &Connection, parent_id: Uuid) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT studio_id FROM studios WHERE parent_studio_id = ?1 ORDER BY created_at_us, studio_id",
    )?;
    let rows = stmt.query_map(params![parent_id.to_string()], |row| get_uuid(row, 0))?;
    rows.collect()
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn set_parent(
    conn: &Connection,
    studio_id: Uuid,
    parent_id: Option<Uuid>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE studios SET parent_studio_id = ?2 WHERE studio_id = ?1",
        params![studio_id.to_string(), parent_id.map(|id| id.to_string())],
    )
}

/// Orphan every child studio of `parent_id`.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn clear_children(conn: &Connection, parent_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE studios SET parent_studio_id = NULL WHERE parent_studio_id = ?1",
        params![parent_id.to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::{children, clear_children, find, insert};
    use crate::db::open_in_memory;
    use crate::model::{Studio, Url};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn collections_round_trip() {
        let conn = open_in_memory().expect("open");
        let mut studio = Studio::new(Uuid::new_v4(), "Acme", Utc::now());
        studio.aliases = vec!["ACME Inc".into()];
        studio.urls = vec![Url {
            url: "https://acme.test".into(),
            site: "home".into(),
        }];
        studio.images = vec![Uuid::new_v4()];
        insert(&conn, &studio).expect("insert");

        let loaded = find(&conn, studio.id).expect("find").expect("present");
        assert_eq!(loaded.aliases, studio.aliases);
        assert_eq!(loaded.urls, studio.urls);
        assert_eq!(loaded.images, studio.images);
    }

    #[test]
    fn clearing_children_orphans_them() {
        let conn = open_in_memory().expect("open");
        let parent = Studio::new(Uuid::new_v4(), "Parent", Utc::now());
        let mut child = Studio::new(Uuid::new_v4(), "Child", Utc::now());
        child.parent_id = Some(parent.id);
        insert(&conn, &parent).expect("insert parent");
        insert(&conn, &child).expect("insert child");

        assert_eq!(children(&conn, parent.id).expect("children"), vec![child.id]);
        assert_eq!(clear_children(&conn, parent.id).expect("clear"), 1);
        let loaded = find(&conn, child.id).expect("find").expect("present");
        assert_eq!(loaded.parent_id, None);
    }
}
