//! Edit rows, their votes and comments, and filtered edit listings.

use super::{get_opt_time, get_opt_uuid, get_parsed, get_time, get_uuid, micros};
use crate::diff::EditDetails;
use crate::error::UnknownValue;
use crate::model::{
    Edit, EditComment, EditStatus, EditVote, Operation, TargetType, VoteValue,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sort order for edit listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently proposed first.
    #[default]
    CreatedDesc,
    /// Oldest first.
    CreatedAsc,
    /// Most recently touched first; untouched edits sort by creation.
    UpdatedDesc,
    /// Highest net vote first.
    Votes,
}

impl SortOrder {
    const fn sql_clause(self) -> &'static str {
        match self {
            Self::CreatedDesc => "ORDER BY created_at_us DESC, edit_id ASC",
            Self::CreatedAsc => "ORDER BY created_at_us ASC, edit_id ASC",
            Self::UpdatedDesc => {
                "ORDER BY COALESCE(updated_at_us, created_at_us) DESC, edit_id ASC"
            }
            Self::Votes => "ORDER BY vote_count DESC, created_at_us ASC, edit_id ASC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatedDesc => f.write_str("created_desc"),
            Self::CreatedAsc => f.write_str("created_asc"),
            Self::UpdatedDesc => f.write_str("updated_desc"),
            Self::Votes => f.write_str("votes"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created_desc" | "created-desc" | "newest" => Ok(Self::CreatedDesc),
            "created_asc" | "created-asc" | "oldest" => Ok(Self::CreatedAsc),
            "updated_desc" | "updated-desc" | "recent" => Ok(Self::UpdatedDesc),
            "votes" | "top" => Ok(Self::Votes),
            other => Err(UnknownValue {
                kind: "sort order",
                value: other.to_string(),
                expected: "created_desc, created_asc, updated_desc, votes",
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter criteria for edit listings. Set fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct EditFilter {
    pub status: Option<EditStatus>,
    pub target_type: Option<TargetType>,
    pub operation: Option<Operation>,
    /// Proposer.
    pub user_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub applied: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort: SortOrder,
}

const SELECT_EDIT: &str = "SELECT edit_id, user_id, target_type, operation, status, applied, \
     target_id, merge_source_ids, data, vote_count, update_count, \
     created_at_us, updated_at_us, closed_at_us FROM edits";

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}

fn to_json<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))
}

fn row_to_edit(row: &Row<'_>) -> rusqlite::Result<Edit> {
    Ok(Edit {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        target_type: get_parsed(row, 2)?,
        operation: get_parsed(row, 3)?,
        status: get_parsed(row, 4)?,
        applied: row.get(5)?,
        target_id: get_opt_uuid(row, 6)?,
        merge_source_ids: json_column::<Vec<Uuid>>(row, 7)?,
        details: json_column::<EditDetails>(row, 8)?,
        vote_count: row.get(9)?,
        update_count: row.get(10)?,
        created_at: get_time(row, 11)?,
        updated_at: get_opt_time(row, 12)?,
        closed_at: get_opt_time(row, 13)?,
        votes: Vec::new(),
        comments: Vec::new(),
    })
}

/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn insert(conn: &Connection, edit: &Edit) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO edits (
            edit_id, user_id, target_type, operation, status, applied, target_id,
            merge_source_ids, data, vote_count, update_count,
            created_at_us, updated_at_us, closed_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            edit.id.to_string(),
            edit.user_id.to_string(),
            edit.target_type.as_str(),
            edit.operation.as_str(),
            edit.status.as_str(),
            edit.applied,
            edit.target_id.map(|id| id.to_string()),
            to_json(&edit.merge_source_ids)?,
            to_json(&edit.details)?,
            edit.vote_count,
            edit.update_count,
            micros(edit.created_at),
            edit.updated_at.map(micros),
            edit.closed_at.map(micros),
        ],
    )?;
    Ok(())
}

/// Persist every mutable column of an edit. Votes and comments are
/// written through their own functions.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn update(conn: &Connection, edit: &Edit) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE edits SET
            status = ?2, applied = ?3, target_id = ?4, merge_source_ids = ?5, data = ?6,
            vote_count = ?7, update_count = ?8, updated_at_us = ?9, closed_at_us = ?10
         WHERE edit_id = ?1",
        params![
            edit.id.to_string(),
            edit.status.as_str(),
            edit.applied,
            edit.target_id.map(|id| id.to_string()),
            to_json(&edit.merge_source_ids)?,
            to_json(&edit.details)?,
            edit.vote_count,
            edit.update_count,
            edit.updated_at.map(micros),
            edit.closed_at.map(micros),
        ],
    )?;
    Ok(())
}

/// Fetch an edit with its votes and comments.
///
/// # Errors
///
/// Returns an error if the query fails or stored JSON is malformed.
pub fn find(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Edit>> {
    let edit = conn
        .query_row(
            &format!("{SELECT_EDIT} WHERE edit_id = ?1"),
            params![id.to_string()],
            row_to_edit,
        )
        .optional()?;

    edit.map(|mut edit| {
        edit.votes = votes(conn, edit.id)?;
        edit.comments = comments(conn, edit.id)?;
        Ok(edit)
    })
    .transpose()
}

/// List edits matching `filter`. Votes and comments are not loaded.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn query(conn: &Connection, filter: &EditFilter) -> rusqlite::Result<Vec<Edit>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        param_values.push(Box::new(status.as_str()));
        conditions.push(format!("status = ?{}", param_values.len()));
    }
    if let Some(target_type) = filter.target_type {
        param_values.push(Box::new(target_type.as_str()));
        conditions.push(format!("target_type = ?{}", param_values.len()));
    }
    if let Some(operation) = filter.operation {
        param_values.push(Box::new(operation.as_str()));
        conditions.push(format!("operation = ?{}", param_values.len()));
    }
    if let Some(user_id) = filter.user_id {
        param_values.push(Box::new(user_id.to_string()));
        conditions.push(format!("user_id = ?{}", param_values.len()));
    }
    if let Some(target_id) = filter.target_id {
        param_values.push(Box::new(target_id.to_string()));
        conditions.push(format!("target_id = ?{}", param_values.len()));
    }
    if let Some(applied) = filter.applied {
        param_values.push(Box::new(applied));
        conditions.push(format!("applied = ?{}", param_values.len()));
    }

    let mut sql = String::from(SELECT_EDIT);
    if !conditions.is_empty() {
        let _ = write!(sql, " WHERE {}", conditions.join(" AND "));
    }
    let _ = write!(sql, " {}", filter.sort.sql_clause());
    match (filter.limit, filter.offset) {
        (Some(limit), Some(offset)) => {
            let _ = write!(sql, " LIMIT {limit} OFFSET {offset}");
        }
        (Some(limit), None) => {
            let _ = write!(sql, " LIMIT {limit}");
        }
        (None, Some(offset)) => {
            let _ = write!(sql, " LIMIT -1 OFFSET {offset}");
        }
        (None, None) => {}
    }

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();
    let rows = stmt.query_map(params_from_iter(params_ref), row_to_edit)?;
    rows.collect()
}

/// Ids of pending edits, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn pending_ids(conn: &Connection) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT edit_id FROM edits WHERE status = 'pending' ORDER BY created_at_us ASC, edit_id ASC",
    )?;
    let rows = stmt.query_map([], |row| get_uuid(row, 0))?;
    rows.collect()
}

/// Record a user's vote, replacing any earlier vote by the same user.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn upsert_vote(conn: &Connection, vote: &EditVote) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO edit_votes (edit_id, user_id, vote, created_at_us) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (edit_id, user_id) DO UPDATE SET vote = excluded.vote, created_at_us = excluded.created_at_us",
        params![
            vote.edit_id.to_string(),
            vote.user_id.to_string(),
            vote.vote.as_str(),
            micros(vote.created_at),
        ],
    )?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn votes(conn: &Connection, edit_id: Uuid) -> rusqlite::Result<Vec<EditVote>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, vote, created_at_us FROM edit_votes WHERE edit_id = ?1
         ORDER BY created_at_us ASC, user_id ASC",
    )?;
    let rows = stmt.query_map(params![edit_id.to_string()], |row| {
        Ok(EditVote {
            edit_id,
            user_id: get_uuid(row, 0)?,
            vote: get_parsed::<VoteValue>(row, 1)?,
            created_at: get_time(row, 2)?,
        })
    })?;
    rows.collect()
}

/// Drop every vote on an edit. Returns the number removed.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn clear_votes(conn: &Connection, edit_id: Uuid) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM edit_votes WHERE edit_id = ?1",
        params![edit_id.to_string()],
    )
}

/// # Errors
///
/// Returns an error if the write fails.
pub fn insert_comment(conn: &Connection, comment: &EditComment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO edit_comments (comment_id, edit_id, user_id, body, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            comment.id.to_string(),
            comment.edit_id.to_string(),
            comment.user_id.to_string(),
            comment.body,
            micros(comment.created_at),
        ],
    )?;
    Ok(())
}

/// Comments on an edit, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn comments(conn: &Connection, edit_id: Uuid) -> rusqlite::Result<Vec<EditComment>> {
    let mut stmt = conn.prepare(
        "SELECT comment_id, user_id, body, created_at_us FROM edit_comments WHERE edit_id = ?1
         ORDER BY created_at_us ASC, comment_id ASC",
    )?;
    let rows = stmt.query_map(params![edit_id.to_string()], |row| {
        Ok(EditComment {
            id: get_uuid(row, 0)?,
            edit_id,
            user_id: get_uuid(row, 1)?,
            body: row.get(2)?,
            created_at: get_time(row, 3)?,
        })
    })?;
    rows.collect()
}
