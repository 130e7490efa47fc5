//! Tag rows, their aliases, and the scene-tag relation.

use super::{get_time, get_uuid, joins, micros};
use crate::model::Tag;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

/// Insert a new tag and its aliases.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn insert(conn: &Connection, tag: &Tag) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tags (tag_id, name, description, is_deleted, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tag.id.to_string(),
            tag.name,
            tag.description,
            tag.deleted,
            micros(tag.created_at),
            micros(tag.updated_at),
        ],
    )?;
    write_aliases(conn, tag)
}

/// Persist every mutable field of an existing tag.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn update(conn: &Connection, tag: &Tag) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tags SET name = ?2, description = ?3, updated_at_us = ?4 WHERE tag_id = ?1",
        params![
            tag.id.to_string(),
            tag.name,
            tag.description,
            micros(tag.updated_at),
        ],
    )?;
    write_aliases(conn, tag)
}

fn write_aliases(conn: &Connection, tag: &Tag) -> rusqlite::Result<()> {
    joins::replace_strings(conn, "tag_aliases", "tag_id", "alias", tag.id, &tag.aliases)
}

/// Fetch a tag by id, including soft-deleted tags.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT tag_id, name, description, is_deleted, created_at_us, updated_at_us
             FROM tags WHERE tag_id = ?1",
            params![id.to_string()],
            |row| {
                Ok(Tag {
                    id: get_uuid(row, 0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    aliases: Vec::new(),
                    deleted: row.get(3)?,
                    created_at: get_time(row, 4)?,
                    updated_at: get_time(row, 5)?,
                })
            },
        )
        .optional()?;

    tag.map(|mut tag| {
        tag.aliases = joins::load_strings(conn, "tag_aliases", "tag_id", "alias", tag.id)?;
        Ok(tag)
    })
    .transpose()
}

/// Mark a tag deleted and drop its aliases.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn soft_delete(conn: &Connection, id: Uuid, now: DateTime<Utc>) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tags SET is_deleted = 1, updated_at_us = ?2 WHERE tag_id = ?1",
        params![id.to_string(), micros(now)],
    )?;
    joins::clear(conn, "tag_aliases", "tag_id", id)?;
    Ok(())
}

/// Scenes carrying the tag, in insertion order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn tagged_scenes(conn: &Connection, tag_id: Uuid) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT scene_id FROM scene_tags WHERE tag_id = ?1 ORDER BY rowid")?;
    let rows = stmt.query_map(params![tag_id.to_string()], |row| get_uuid(row, 0))?;
    rows.collect()
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn scene_has_tag(conn: &Connection, scene_id: Uuid, tag_id: Uuid) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM scene_tags WHERE scene_id = ?1 AND tag_id = ?2)",
        params![scene_id.to_string(), tag_id.to_string()],
        |row| row.get(0),
    )
}

/// Point one scene's link at `to` instead of `from`.
///
/// # Errors
///
/// Returns an error if the write fails (including when the scene already
/// carries `to`; callers check first).
pub fn retag_scene(
    conn: &Connection,
    scene_id: Uuid,
    from: Uuid,
    to: Uuid,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE scene_tags SET tag_id = ?3 WHERE scene_id = ?1 AND tag_id = ?2",
        params![scene_id.to_string(), from.to_string(), to.to_string()],
    )
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn untag_scene(conn: &Connection, scene_id: Uuid, tag_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM scene_tags WHERE scene_id = ?1 AND tag_id = ?2",
        params![scene_id.to_string(), tag_id.to_string()],
    )
}

/// Remove the tag from every scene.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn untag_all(conn: &Connection, tag_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM scene_tags WHERE tag_id = ?1",
        params![tag_id.to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::{find, insert, soft_delete, update};
    use crate::db::open_in_memory;
    use crate::model::Tag;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn insert_find_update_round_trip() {
        let conn = open_in_memory().expect("open");
        let mut tag = Tag::new(Uuid::new_v4(), "Foo", Utc::now());
        tag.aliases = vec!["f".into(), "foo".into()];
        insert(&conn, &tag).expect("insert");

        let loaded = find(&conn, tag.id).expect("find").expect("present");
        assert_eq!(loaded.name, "Foo");
        assert_eq!(loaded.aliases, vec!["f".to_string(), "foo".to_string()]);

        tag.name = "Bar".into();
        tag.aliases = vec!["b".into()];
        update(&conn, &tag).expect("update");
        let loaded = find(&conn, tag.id).expect("find").expect("present");
        assert_eq!(loaded.name, "Bar");
        assert_eq!(loaded.aliases, vec!["b".to_string()]);
    }

    #[test]
    fn soft_delete_keeps_row_and_clears_aliases() {
        let conn = open_in_memory().expect("open");
        let mut tag = Tag::new(Uuid::new_v4(), "Foo", Utc::now());
        tag.aliases = vec!["f".into()];
        insert(&conn, &tag).expect("insert");

        soft_delete(&conn, tag.id, Utc::now()).expect("delete");
        let loaded = find(&conn, tag.id).expect("find").expect("row kept");
        assert!(loaded.deleted);
        assert!(loaded.aliases.is_empty());
    }
}
