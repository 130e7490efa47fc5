use super::{load, require_reference, require_target, vote};
use crate::db::{edits, fingerprints, performers, scenes, studios, tags};
use crate::diff::{EditDetails, EditInput, PerformerDiff, SceneDiff, StudioDiff, TagDiff};
use crate::error::{CatalogError, Result};
use crate::model::{Edit, EditStatus, Operation, Role, TargetType};
use crate::session::Session;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Behavior switches attached to a proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditOptions {
    /// Performer rename: bill existing un-aliased appearances under the old
    /// name.
    pub preserve_alias_on_modify: bool,
    /// Performer merge: bill moved appearances under the source's name.
    pub preserve_alias_on_merge: bool,
    /// Close the edit as immediately accepted. Needs the modify role.
    pub apply_immediately: bool,
}

/// A request to propose an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposeEdit {
    pub operation: Operation,
    pub target_id: Option<Uuid>,
    pub merge_source_ids: Vec<Uuid>,
    pub details: EditInput,
    pub options: EditOptions,
}

impl ProposeEdit {
    #[must_use]
    pub fn create(details: EditInput) -> Self {
        Self {
            operation: Operation::Create,
            target_id: None,
            merge_source_ids: Vec::new(),
            details,
            options: EditOptions::default(),
        }
    }

    #[must_use]
    pub fn modify(target_id: Uuid, details: EditInput) -> Self {
        Self {
            operation: Operation::Modify,
            target_id: Some(target_id),
            ..Self::create(details)
        }
    }

    #[must_use]
    pub fn destroy(target_type: TargetType, target_id: Uuid) -> Self {
        Self {
            operation: Operation::Destroy,
            target_id: Some(target_id),
            ..Self::create(EditInput::empty(target_type))
        }
    }

    #[must_use]
    pub fn merge(target_id: Uuid, sources: Vec<Uuid>, details: EditInput) -> Self {
        Self {
            operation: Operation::Merge,
            target_id: Some(target_id),
            merge_source_ids: sources,
            ..Self::create(details)
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: EditOptions) -> Self {
        self.options = options;
        self
    }
}

/// Validate a proposal, build its diff against the target's current state,
/// and persist it as a pending edit.
///
/// With `apply_immediately` the edit is closed as immediately accepted and
/// applied in the same transaction.
///
/// # Errors
///
/// - [`CatalogError::Unauthorized`] without the edit role (or the modify
///   role for `apply_immediately`)
/// - [`CatalogError::NotImplemented`] for a disabled target type
/// - [`CatalogError::NotFound`] for a missing target, source, or reference
/// - [`CatalogError::InvalidOperation`] for a malformed request
pub fn propose_edit(session: &Session<'_>, request: ProposeEdit) -> Result<Edit> {
    let actor = session.actor();
    actor.require(Role::Edit)?;
    if request.options.apply_immediately {
        actor.require(Role::Modify)?;
    }

    let target_type = request.details.target_type();
    if !session.config().edits.is_enabled(target_type) {
        return Err(CatalogError::NotImplemented(target_type));
    }

    let conn = session.conn();
    let input = request.details.clone().normalized();
    check_shape(conn, &request, target_type, &input)?;

    let details = build_details(
        conn,
        request.operation,
        request.target_id,
        &input,
        request.options,
    )?;
    check_details(conn, request.operation, request.target_id, &details)?;

    let mut edit = Edit {
        id: Uuid::new_v4(),
        user_id: actor.user_id,
        target_type,
        operation: request.operation,
        status: EditStatus::Pending,
        applied: false,
        target_id: request.target_id,
        merge_source_ids: request.merge_source_ids,
        details,
        vote_count: 0,
        update_count: 0,
        created_at: session.now(),
        updated_at: None,
        closed_at: None,
        votes: Vec::new(),
        comments: Vec::new(),
    };
    edits::insert(conn, &edit)?;
    tracing::info!(
        edit_id = %edit.id,
        target_type = %edit.target_type,
        operation = %edit.operation,
        user = %actor.name,
        "proposed edit"
    );

    if request.options.apply_immediately {
        vote::accept_immediately(session, &mut edit)?;
    }
    Ok(edit)
}

/// Replace the details of a pending edit. Only the proposer may amend,
/// at most `edits.update_limit` times. Existing votes are discarded.
///
/// # Errors
///
/// - [`CatalogError::NotFound`] for an unknown edit
/// - [`CatalogError::Unauthorized`] when the actor is not the proposer
/// - [`CatalogError::AlreadyTerminal`] for a closed edit
/// - [`CatalogError::InvalidOperation`] when the limit is reached, the
///   target type differs, or the new details are invalid
pub fn update_edit(session: &Session<'_>, edit_id: Uuid, details: EditInput) -> Result<Edit> {
    let conn = session.conn();
    let mut edit = load(conn, edit_id)?;
    if edit.user_id != session.actor().user_id {
        return Err(CatalogError::Unauthorized);
    }
    if edit.status.is_terminal() {
        return Err(CatalogError::AlreadyTerminal {
            status: edit.status,
        });
    }
    let limit = session.config().edits.update_limit;
    if edit.update_count >= limit {
        return Err(CatalogError::invalid(format!(
            "edit has reached its update limit of {limit}"
        )));
    }
    if details.target_type() != edit.target_type {
        return Err(CatalogError::invalid(format!(
            "cannot change a {} edit into a {} edit",
            edit.target_type,
            details.target_type()
        )));
    }

    let input = details.normalized();
    if edit.operation == Operation::Destroy && input != EditInput::empty(edit.target_type) {
        return Err(CatalogError::invalid("destroy edits carry no changes"));
    }
    if let Some(target) = edit.target_id
        && edit.operation != Operation::Create
    {
        require_target(conn, edit.target_type, target)?;
    }

    let options = match &edit.details {
        EditDetails::Performer(diff) => EditOptions {
            preserve_alias_on_modify: diff.preserve_alias_on_modify,
            preserve_alias_on_merge: diff.preserve_alias_on_merge,
            apply_immediately: false,
        },
        _ => EditOptions::default(),
    };
    if edit.operation == Operation::Create {
        check_create_name(&input)?;
    }
    let rebuilt = build_details(conn, edit.operation, edit.target_id, &input, options)?;
    check_details(conn, edit.operation, edit.target_id, &rebuilt)?;

    let cleared = edits::clear_votes(conn, edit.id)?;
    edit.details = rebuilt;
    edit.vote_count = 0;
    edit.update_count += 1;
    edit.updated_at = Some(session.now());
    edit.votes.clear();
    edits::update(conn, &edit)?;
    tracing::info!(
        edit_id = %edit.id,
        update_count = edit.update_count,
        votes_cleared = cleared,
        "amended edit"
    );
    Ok(edit)
}

fn check_shape(
    conn: &Connection,
    request: &ProposeEdit,
    target_type: TargetType,
    input: &EditInput,
) -> Result<()> {
    match request.operation {
        Operation::Create => {
            if request.target_id.is_some() {
                return Err(CatalogError::invalid("create edits take no target"));
            }
            if !request.merge_source_ids.is_empty() {
                return Err(CatalogError::invalid("only merge edits take merge sources"));
            }
            check_create_name(input)?;
        }
        Operation::Modify | Operation::Destroy => {
            let target = request
                .target_id
                .ok_or_else(|| CatalogError::invalid(format!("{} edits need a target", request.operation)))?;
            if !request.merge_source_ids.is_empty() {
                return Err(CatalogError::invalid("only merge edits take merge sources"));
            }
            require_target(conn, target_type, target)?;
            if request.operation == Operation::Destroy && *input != EditInput::empty(target_type) {
                return Err(CatalogError::invalid("destroy edits carry no changes"));
            }
        }
        Operation::Merge => {
            let target = request
                .target_id
                .ok_or_else(|| CatalogError::invalid("merge edits need a target"))?;
            if request.merge_source_ids.is_empty() {
                return Err(CatalogError::invalid("merge edits need at least one source"));
            }
            let mut seen = HashSet::new();
            for source in &request.merge_source_ids {
                if *source == target {
                    return Err(CatalogError::invalid("cannot merge an entity into itself"));
                }
                if !seen.insert(*source) {
                    return Err(CatalogError::invalid(format!("duplicate merge source {source}")));
                }
            }
            require_target(conn, target_type, target)?;
            for source in &request.merge_source_ids {
                require_target(conn, target_type, *source)?;
            }
        }
    }
    Ok(())
}

fn check_create_name(input: &EditInput) -> Result<()> {
    let name = match input {
        EditInput::Tag(tag) => tag.name.as_ref(),
        EditInput::Studio(studio) => studio.name.as_ref(),
        EditInput::Performer(performer) => performer.name.as_ref(),
        EditInput::Scene(_) => return Ok(()),
    };
    if name.is_none() {
        return Err(CatalogError::invalid(format!(
            "a new {} needs a name",
            input.target_type()
        )));
    }
    Ok(())
}

fn check_details(
    conn: &Connection,
    operation: Operation,
    target_id: Option<Uuid>,
    details: &EditDetails,
) -> Result<()> {
    if let EditDetails::Studio(diff) = details
        && let Some(parent) = diff.parent_id
    {
        if Some(parent) == target_id {
            return Err(CatalogError::invalid("a studio cannot be its own parent"));
        }
        if let Some(studio) = target_id
            && is_ancestor(conn, studio, parent)?
        {
            return Err(CatalogError::invalid(format!(
                "studio {parent} is a descendant of {studio}"
            )));
        }
    }

    for (target_type, id) in details.references() {
        require_reference(conn, target_type, id)?;
    }

    if operation == Operation::Modify && details.is_empty() {
        return Err(CatalogError::invalid("edit contains no changes"));
    }
    Ok(())
}

/// Whether `ancestor` sits on the parent chain above `studio`.
fn is_ancestor(conn: &Connection, ancestor: Uuid, studio: Uuid) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut cursor = Some(studio);
    while let Some(id) = cursor {
        if id == ancestor {
            return Ok(true);
        }
        if !seen.insert(id) {
            break;
        }
        cursor = studios::find(conn, id)?.and_then(|s| s.parent_id);
    }
    Ok(false)
}

/// Build the stored diff. Creates diff against nothing; every other
/// operation diffs against the target's current state.
fn build_details(
    conn: &Connection,
    operation: Operation,
    target_id: Option<Uuid>,
    input: &EditInput,
    options: EditOptions,
) -> Result<EditDetails> {
    let target = match operation {
        Operation::Create => None,
        _ => target_id,
    };

    let details = match input {
        EditInput::Tag(input) => {
            let current = target.map(|id| tags::find(conn, id)).transpose()?.flatten();
            EditDetails::Tag(TagDiff::build(input, current.as_ref()))
        }
        EditInput::Studio(input) => {
            let current = target
                .map(|id| studios::find(conn, id))
                .transpose()?
                .flatten();
            EditDetails::Studio(StudioDiff::build(input, current.as_ref()))
        }
        EditInput::Performer(input) => {
            let current = target
                .map(|id| performers::find(conn, id))
                .transpose()?
                .flatten();
            let mut diff = PerformerDiff::build(input, current.as_ref());
            diff.preserve_alias_on_modify = options.preserve_alias_on_modify;
            diff.preserve_alias_on_merge = options.preserve_alias_on_merge;
            EditDetails::Performer(diff)
        }
        EditInput::Scene(input) => {
            let current = target
                .map(|id| scenes::find(conn, id))
                .transpose()?
                .flatten();
            let keys = match target {
                Some(id) => fingerprints::keys_for_scene(conn, id)?
                    .into_iter()
                    .map(|(_, key)| key)
                    .collect(),
                None => Vec::new(),
            };
            EditDetails::Scene(SceneDiff::build(input, current.as_ref(), &keys))
        }
    };
    Ok(details)
}
