//! Scene rows and their owned collections (URLs, images, tags, performers).
//!
//! Fingerprints belong to the fingerprint store in [`super::fingerprints`].

use super::{get_opt_uuid, get_time, get_uuid, joins, micros};
use crate::model::{PerformerAppearance, Scene};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

const OWNED_TABLES: [&str; 4] = ["scene_urls", "scene_images", "scene_tags", "scene_performers"];

/// # Errors
///
/// Returns an error if the write fails.
pub fn insert(conn: &Connection, scene: &Scene) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO scenes (
            scene_id, title, details, date, studio_id, duration, director, code,
            is_deleted, created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            scene.id.to_string(),
            scene.title,
            scene.details,
            scene.date,
            scene.studio_id.map(|id| id.to_string()),
            scene.duration,
            scene.director,
            scene.code,
            scene.deleted,
            micros(scene.created_at),
            micros(scene.updated_at),
        ],
    )?;
    write_collections(conn, scene)
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn update(conn: &Connection, scene: &Scene) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scenes SET
            title = ?2, details = ?3, date = ?4, studio_id = ?5, duration = ?6,
            director = ?7, code = ?8, updated_at_us = ?9
         WHERE scene_id = ?1",
        params![
            scene.id.to_string(),
            scene.title,
            scene.details,
            scene.date,
            scene.studio_id.map(|id| id.to_string()),
            scene.duration,
            scene.director,
            scene.code,
            micros(scene.updated_at),
        ],
    )?;
    write_collections(conn, scene)
}

fn write_collections(conn: &Connection, scene: &Scene) -> rusqlite::Result<()> {
    joins::replace_urls(conn, "scene_urls", "scene_id", scene.id, &scene.urls)?;
    joins::replace_ids(conn, "scene_images", "scene_id", "image_id", scene.id, &scene.images)?;
    joins::replace_ids(conn, "scene_tags", "scene_id", "tag_id", scene.id, &scene.tags)?;

    joins::clear(conn, "scene_performers", "scene_id", scene.id)?;
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO scene_performers (scene_id, performer_id, alias) VALUES (?1, ?2, ?3)",
    )?;
    for appearance in &scene.performers {
        stmt.execute(params![
            scene.id.to_string(),
            appearance.performer_id.to_string(),
            appearance.alias
        ])?;
    }
    Ok(())
}

/// Fetch a scene by id, including soft-deleted scenes.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Scene>> {
    let scene = conn
        .query_row(
            "SELECT scene_id, title, details, date, studio_id, duration, director, code,
                    is_deleted, created_at_us, updated_at_us
             FROM scenes WHERE scene_id = ?1",
            params![id.to_string()],
            |row| {
                Ok(Scene {
                    id: get_uuid(row, 0)?,
                    title: row.get(1)?,
                    details: row.get(2)?,
                    date: row.get(3)?,
                    studio_id: get_opt_uuid(row, 4)?,
                    duration: row.get(5)?,
                    director: row.get(6)?,
                    code: row.get(7)?,
                    urls: Vec::new(),
                    images: Vec::new(),
                    tags: Vec::new(),
                    performers: Vec::new(),
                    deleted: row.get(8)?,
                    created_at: get_time(row, 9)?,
                    updated_at: get_time(row, 10)?,
                })
            },
        )
        .optional()?;

    scene
        .map(|mut scene| {
            scene.urls = joins::load_urls(conn, "scene_urls", "scene_id", scene.id)?;
            scene.images = joins::load_ids(conn, "scene_images", "scene_id", "image_id", scene.id)?;
            scene.tags = joins::load_ids(conn, "scene_tags", "scene_id", "tag_id", scene.id)?;
            scene.performers = load_performers(conn, scene.id)?;
            Ok(scene)
        })
        .transpose()
}

fn load_performers(conn: &Connection, scene_id: Uuid) -> rusqlite::Result<Vec<PerformerAppearance>> {
    let mut stmt = conn.prepare(
        "SELECT performer_id, alias FROM scene_performers WHERE scene_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![scene_id.to_string()], |row| {
        Ok(PerformerAppearance {
            performer_id: get_uuid(row, 0)?,
            alias: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Fetch several live scenes, preserving the order of `ids` and skipping
/// missing or deleted ones.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn find_live(conn: &Connection, ids: &[Uuid]) -> rusqlite::Result<Vec<Scene>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(scene) = find(conn, *id)?
            && !scene.deleted
        {
            out.push(scene);
        }
    }
    Ok(out)
}

/// Mark a scene deleted and drop its owned collections.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn soft_delete(conn: &Connection, id: Uuid, now: DateTime<Utc>) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scenes SET is_deleted = 1, updated_at_us = ?2 WHERE scene_id = ?1",
        params![id.to_string(), micros(now)],
    )?;
    for table in OWNED_TABLES {
        joins::clear(conn, table, "scene_id", id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{find, find_live, insert, soft_delete};
    use crate::db::{open_in_memory, performers, tags};
    use crate::model::{Performer, PerformerAppearance, Scene, Tag};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn relations_round_trip() {
        let conn = open_in_memory().expect("open");
        let now = Utc::now();
        let tag = Tag::new(Uuid::new_v4(), "Outdoor", now);
        let performer = Performer::new(Uuid::new_v4(), "Jane", now);
        tags::insert(&conn, &tag).expect("tag");
        performers::insert(&conn, &performer).expect("performer");

        let mut scene = Scene::new(Uuid::new_v4(), now);
        scene.title = Some("Title".into());
        scene.tags = vec![tag.id];
        scene.performers = vec![PerformerAppearance {
            performer_id: performer.id,
            alias: Some("J".into()),
        }];
        insert(&conn, &scene).expect("insert");

        let loaded = find(&conn, scene.id).expect("find").expect("present");
        assert_eq!(loaded.tags, vec![tag.id]);
        assert_eq!(loaded.performers, scene.performers);
    }

    #[test]
    fn find_live_skips_deleted() {
        let conn = open_in_memory().expect("open");
        let a = Scene::new(Uuid::new_v4(), Utc::now());
        let b = Scene::new(Uuid::new_v4(), Utc::now());
        insert(&conn, &a).expect("a");
        insert(&conn, &b).expect("b");
        soft_delete(&conn, a.id, Utc::now()).expect("delete");

        let live = find_live(&conn, &[a.id, b.id, Uuid::new_v4()]).expect("find");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, b.id);
    }
}
