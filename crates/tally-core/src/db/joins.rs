//! Owned child collections stored in `<entity>_<field>` join tables.
//!
//! Collections are rewritten wholesale: the entity's diff has already been
//! folded into the in-memory value, so the rows simply mirror it.

use crate::model::{BodyModification, Url};
use rusqlite::{Connection, params};
use uuid::Uuid;

pub(crate) fn load_strings(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    value_col: &str,
    owner: Uuid,
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {value_col} FROM {table} WHERE {owner_col} = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![owner.to_string()], |row| row.get(0))?;
    rows.collect()
}

pub(crate) fn replace_strings(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    value_col: &str,
    owner: Uuid,
    values: &[String],
) -> rusqlite::Result<()> {
    clear(conn, table, owner_col, owner)?;
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table} ({owner_col}, {value_col}) VALUES (?1, ?2)"
    ))?;
    for value in values {
        stmt.execute(params![owner.to_string(), value])?;
    }
    Ok(())
}

pub(crate) fn load_ids(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    value_col: &str,
    owner: Uuid,
) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {value_col} FROM {table} WHERE {owner_col} = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![owner.to_string()], |row| super::get_uuid(row, 0))?;
    rows.collect()
}

pub(crate) fn replace_ids(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    value_col: &str,
    owner: Uuid,
    values: &[Uuid],
) -> rusqlite::Result<()> {
    let values: Vec<String> = values.iter().map(Uuid::to_string).collect();
    replace_strings(conn, table, owner_col, value_col, owner, &values)
}

pub(crate) fn load_urls(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    owner: Uuid,
) -> rusqlite::Result<Vec<Url>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT url, site FROM {table} WHERE {owner_col} = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![owner.to_string()], |row| {
        Ok(Url {
            url: row.get(0)?,
            site: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub(crate) fn replace_urls(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    owner: Uuid,
    urls: &[Url],
) -> rusqlite::Result<()> {
    clear(conn, table, owner_col, owner)?;
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table} ({owner_col}, url, site) VALUES (?1, ?2, ?3)"
    ))?;
    for url in urls {
        stmt.execute(params![owner.to_string(), url.url, url.site])?;
    }
    Ok(())
}

pub(crate) fn load_body_mods(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    owner: Uuid,
) -> rusqlite::Result<Vec<BodyModification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT location, description FROM {table} WHERE {owner_col} = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![owner.to_string()], |row| {
        Ok(BodyModification {
            location: row.get(0)?,
            description: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub(crate) fn replace_body_mods(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    owner: Uuid,
    mods: &[BodyModification],
) -> rusqlite::Result<()> {
    clear(conn, table, owner_col, owner)?;
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {table} ({owner_col}, location, description) VALUES (?1, ?2, ?3)"
    ))?;
    for body_mod in mods {
        stmt.execute(params![
            owner.to_string(),
            body_mod.location,
            body_mod.description
        ])?;
    }
    Ok(())
}

pub(crate) fn clear(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    owner: Uuid,
) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_col} = ?1"),
        params![owner.to_string()],
    )
}
