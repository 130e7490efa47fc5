use super::{apply, load, load_open};
use crate::config::VotingConfig;
use crate::db::{edits, users};
use crate::error::{CatalogError, Result};
use crate::model::{Edit, EditComment, EditStatus, EditVote, Role, VoteValue};
use crate::session::Session;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

const MAX_COMMENT_LEN: usize = 8192;

/// Counted votes on one edit. Immediate votes never count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub accept: u32,
    pub reject: u32,
    /// Whether any reject vote was cast by an administrator.
    pub admin_reject: bool,
}

impl VoteTally {
    #[must_use]
    pub fn net(&self) -> i64 {
        i64::from(self.accept) - i64::from(self.reject)
    }

    fn load(conn: &Connection, edit_id: Uuid) -> Result<Self> {
        let mut tally = Self::default();
        for vote in edits::votes(conn, edit_id)? {
            match vote.vote {
                VoteValue::Accept => tally.accept += 1,
                VoteValue::Reject => {
                    tally.reject += 1;
                    if users::find(conn, vote.user_id)?.is_some_and(|u| u.roles.has(Role::Admin)) {
                        tally.admin_reject = true;
                    }
                }
                VoteValue::ImmediateAccept | VoteValue::ImmediateReject => {}
            }
        }
        Ok(tally)
    }
}

/// Status a pending edit should move to given its votes and age.
///
/// An admin reject closes the edit at once. An edit past its voting
/// period is rejected, whatever its votes. Otherwise, with a non-zero
/// threshold, the edit is accepted once net votes reach it (destructive
/// edits also wait out the minimum destructive period) and rejected once
/// net votes reach its negative.
#[must_use]
pub fn resolve_status(
    tally: VoteTally,
    config: &VotingConfig,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    destructive: bool,
) -> EditStatus {
    if tally.admin_reject {
        return EditStatus::Rejected;
    }

    let elapsed = now - created_at;
    if elapsed >= config.voting_period() {
        return EditStatus::Rejected;
    }

    let threshold = i64::from(config.accept_threshold);
    if threshold > 0 {
        let net = tally.net();
        if net >= threshold && (!destructive || elapsed >= config.min_destructive_voting_period())
        {
            return EditStatus::Accepted;
        }
        if -net >= threshold {
            return EditStatus::Rejected;
        }
    }
    EditStatus::Pending
}

/// Cast or replace the actor's vote on a pending edit, then re-evaluate it.
/// A vote that accepts the edit applies it in the same transaction.
///
/// # Errors
///
/// - [`CatalogError::Unauthorized`] without the vote role, or on one's own
///   edit
/// - [`CatalogError::InvalidOperation`] for an immediate vote value
/// - [`CatalogError::NotFound`] / [`CatalogError::AlreadyTerminal`]
/// - any apply failure when the vote accepts the edit
pub fn vote_edit(session: &Session<'_>, edit_id: Uuid, vote: VoteValue) -> Result<Edit> {
    let actor = session.actor();
    actor.require(Role::Vote)?;
    if matches!(vote, VoteValue::ImmediateAccept | VoteValue::ImmediateReject) {
        return Err(CatalogError::invalid(
            "immediate votes are cast through apply and cancel",
        ));
    }

    let conn = session.conn();
    let mut edit = load_open(conn, edit_id)?;
    if edit.user_id == actor.user_id {
        return Err(CatalogError::Unauthorized);
    }

    edits::upsert_vote(
        conn,
        &EditVote {
            edit_id,
            user_id: actor.user_id,
            vote,
            created_at: session.now(),
        },
    )?;
    let tally = VoteTally::load(conn, edit_id)?;
    edit.vote_count = tally.net();
    tracing::debug!(edit_id = %edit_id, vote = %vote, net = edit.vote_count, "recorded vote");

    let status = resolve_status(
        tally,
        &session.config().voting,
        edit.created_at,
        session.now(),
        edit.is_destructive(),
    );
    if status == EditStatus::Pending {
        edits::update(conn, &edit)?;
    } else {
        finalize(session, &mut edit, status)?;
    }
    load(conn, edit_id)
}

/// Close a pending edit as immediately accepted and apply it. Requires the
/// modify role.
///
/// # Errors
///
/// - [`CatalogError::Unauthorized`] without the modify role
/// - [`CatalogError::NotFound`] / [`CatalogError::AlreadyTerminal`]
/// - any apply failure
pub fn apply_edit(session: &Session<'_>, edit_id: Uuid) -> Result<Edit> {
    session.actor().require(Role::Modify)?;
    let mut edit = load_open(session.conn(), edit_id)?;
    accept_immediately(session, &mut edit)?;
    load(session.conn(), edit_id)
}

pub(super) fn accept_immediately(session: &Session<'_>, edit: &mut Edit) -> Result<()> {
    session.actor().require(Role::Modify)?;
    edits::upsert_vote(
        session.conn(),
        &EditVote {
            edit_id: edit.id,
            user_id: session.actor().user_id,
            vote: VoteValue::ImmediateAccept,
            created_at: session.now(),
        },
    )?;
    finalize(session, edit, EditStatus::ImmediateAccepted)
}

/// Withdraw a pending edit. The proposer cancels it; an administrator
/// rejects it immediately. Nothing is applied either way.
///
/// # Errors
///
/// - [`CatalogError::NotFound`] for an unknown edit
/// - [`CatalogError::Unauthorized`] for anyone else
/// - [`CatalogError::AlreadyTerminal`] for a closed edit
pub fn cancel_edit(session: &Session<'_>, edit_id: Uuid) -> Result<Edit> {
    let actor = session.actor();
    let conn = session.conn();
    let mut edit = load(conn, edit_id)?;

    let status = if edit.user_id == actor.user_id {
        EditStatus::Canceled
    } else if actor.has(Role::Admin) {
        EditStatus::ImmediateRejected
    } else {
        return Err(CatalogError::Unauthorized);
    };
    if edit.status.is_terminal() {
        return Err(CatalogError::AlreadyTerminal {
            status: edit.status,
        });
    }

    if status == EditStatus::ImmediateRejected {
        edits::upsert_vote(
            conn,
            &EditVote {
                edit_id,
                user_id: actor.user_id,
                vote: VoteValue::ImmediateReject,
                created_at: session.now(),
            },
        )?;
    }
    finalize(session, &mut edit, status)?;
    load(conn, edit_id)
}

/// Attach a comment and return the edit with its comment thread. Allowed
/// on any status for voters and the proposer.
///
/// # Errors
///
/// - [`CatalogError::NotFound`] for an unknown edit
/// - [`CatalogError::Unauthorized`] without the vote role when not the
///   proposer
/// - [`CatalogError::InvalidOperation`] for a blank, oversized, or
///   control-character body
pub fn comment_edit(session: &Session<'_>, edit_id: Uuid, body: &str) -> Result<Edit> {
    let actor = session.actor();
    let conn = session.conn();
    let edit = load(conn, edit_id)?;
    if edit.user_id != actor.user_id && !actor.has(Role::Vote) {
        return Err(CatalogError::Unauthorized);
    }

    let body = validate_comment(body)?;
    let comment = EditComment {
        id: Uuid::new_v4(),
        edit_id,
        user_id: actor.user_id,
        body,
        created_at: session.now(),
    };
    edits::insert_comment(conn, &comment)?;
    tracing::debug!(edit_id = %edit_id, comment_id = %comment.id, "added comment");
    load(conn, edit_id)
}

fn validate_comment(body: &str) -> Result<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(CatalogError::invalid("comment body must not be empty"));
    }
    let len = body.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(CatalogError::invalid(format!(
            "comment body is {len} characters; the limit is {MAX_COMMENT_LEN}"
        )));
    }
    if body.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Err(CatalogError::invalid(
            "comment body contains control characters",
        ));
    }
    Ok(body.to_string())
}

/// Outcome of one [`close_completed`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub accepted: Vec<Uuid>,
    pub rejected: Vec<Uuid>,
    /// Edits whose resolution failed, with the error message. They stay
    /// pending.
    pub failed: Vec<(Uuid, String)>,
}

/// Re-evaluate every pending edit against the clock. Each edit resolves in
/// its own savepoint, so one failing apply does not block the others.
/// Requires the admin role.
///
/// # Errors
///
/// Returns [`CatalogError::Unauthorized`] for non-admins, or a storage
/// error when the pending set cannot be read.
pub fn close_completed(session: &Session<'_>) -> Result<SweepReport> {
    session.actor().require(Role::Admin)?;
    let conn = session.conn();
    let mut report = SweepReport::default();

    for edit_id in edits::pending_ids(conn)? {
        let resolved = session.savepoint("sweep_edit", || {
            let mut edit = load(conn, edit_id)?;
            let tally = VoteTally::load(conn, edit_id)?;
            let status = resolve_status(
                tally,
                &session.config().voting,
                edit.created_at,
                session.now(),
                edit.is_destructive(),
            );
            if status != EditStatus::Pending {
                finalize(session, &mut edit, status)?;
            }
            Ok(status)
        });

        match resolved {
            Ok(EditStatus::Pending) => {}
            Ok(status) if status.is_accepted() => report.accepted.push(edit_id),
            Ok(_) => report.rejected.push(edit_id),
            Err(error) => {
                tracing::warn!(edit_id = %edit_id, error = %error, "sweep could not close edit");
                report.failed.push((edit_id, error.to_string()));
            }
        }
    }

    tracing::info!(
        accepted = report.accepted.len(),
        rejected = report.rejected.len(),
        failed = report.failed.len(),
        "sweep finished"
    );
    Ok(report)
}

/// Close an edit with `status`, applying it first when the status is an
/// accepting one.
fn finalize(session: &Session<'_>, edit: &mut Edit, status: EditStatus) -> Result<()> {
    if status.is_accepted() {
        let outcome = apply::apply(session, edit)?;
        edit.applied = true;
        tracing::debug!(edit_id = %edit.id, target_id = %outcome.target_id, "edit applied");
    }
    edit.status = status;
    edit.closed_at = Some(session.now());
    edit.updated_at = Some(session.now());
    edits::update(session.conn(), edit)?;
    tracing::info!(
        edit_id = %edit.id,
        status = %status,
        target_type = %edit.target_type,
        "closed edit"
    );
    Ok(())
}
