//! Edit lifecycle: proposal, amendment, voting, and application.
//!
//! Every operation here takes a [`Session`] and runs inside its
//! transaction. Validation happens before the first write, so a rejected
//! request leaves no trace; a failure after the first write aborts the
//! whole transaction.

mod apply;
mod merge;
mod propose;
mod vote;

pub use apply::ApplyOutcome;
pub use merge::{MergeStats, RelationOutcome};
pub use propose::{EditOptions, ProposeEdit, propose_edit, update_edit};
pub use vote::{
    SweepReport, VoteTally, apply_edit, cancel_edit, close_completed, comment_edit,
    resolve_status, vote_edit,
};

use crate::db::edits::{self, EditFilter};
use crate::db::entity_deleted;
use crate::error::{CatalogError, Result};
use crate::model::{Edit, Role, TargetType};
use crate::session::Session;
use rusqlite::Connection;
use uuid::Uuid;

/// Fetch one edit with its votes and comments. Requires the read role.
///
/// # Errors
///
/// Returns [`CatalogError::Unauthorized`] or [`CatalogError::NotFound`].
pub fn find_edit(session: &Session<'_>, edit_id: Uuid) -> Result<Edit> {
    session.actor().require(Role::Read)?;
    load(session.conn(), edit_id)
}

/// List edits matching `filter`. Requires the read role.
///
/// # Errors
///
/// Returns [`CatalogError::Unauthorized`] or a storage error.
pub fn query_edits(session: &Session<'_>, filter: &EditFilter) -> Result<Vec<Edit>> {
    session.actor().require(Role::Read)?;
    Ok(edits::query(session.conn(), filter)?)
}

fn load(conn: &Connection, edit_id: Uuid) -> Result<Edit> {
    edits::find(conn, edit_id)?.ok_or_else(|| CatalogError::not_found("edit", edit_id))
}

fn load_open(conn: &Connection, edit_id: Uuid) -> Result<Edit> {
    let edit = load(conn, edit_id)?;
    if edit.status.is_terminal() {
        return Err(CatalogError::AlreadyTerminal {
            status: edit.status,
        });
    }
    Ok(edit)
}

/// The entity must exist and be live. A deleted target is an invalid
/// request rather than a missing one.
fn require_target(conn: &Connection, target_type: TargetType, id: Uuid) -> Result<()> {
    match entity_deleted(conn, target_type, id)? {
        None => Err(CatalogError::not_found(target_type.as_str(), id)),
        Some(true) => Err(CatalogError::invalid(format!(
            "{target_type} {id} is deleted"
        ))),
        Some(false) => Ok(()),
    }
}

/// A linked entity must exist and be live; a deleted one counts as missing.
fn require_reference(conn: &Connection, target_type: TargetType, id: Uuid) -> Result<()> {
    match entity_deleted(conn, target_type, id)? {
        Some(false) => Ok(()),
        None | Some(true) => Err(CatalogError::not_found(target_type.as_str(), id)),
    }
}
