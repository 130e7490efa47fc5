use super::merge::{self, MergeStats};
use super::require_reference;
use crate::db::{fingerprints, performers, scenes, studios, tags};
use crate::diff::{EditDetails, SceneDiff};
use crate::error::{CatalogError, Result};
use crate::fingerprint;
use crate::model::{Edit, Operation, Performer, Scene, Studio, Tag, TargetType};
use crate::session::Session;
use serde::Serialize;
use uuid::Uuid;

/// What applying an edit changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// The created, modified, destroyed, or surviving entity.
    pub target_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeStats>,
}

/// Apply an accepted edit to the catalog inside the session's transaction.
/// Sets `target_id` on creates.
pub(super) fn apply(session: &Session<'_>, edit: &mut Edit) -> Result<ApplyOutcome> {
    if edit.applied {
        return Err(CatalogError::AlreadyTerminal {
            status: edit.status,
        });
    }

    let conn = session.conn();
    for (target_type, id) in edit.details.references() {
        require_reference(conn, target_type, id)?;
    }

    let outcome = match edit.operation {
        Operation::Create => {
            let id = create(session, edit)?;
            edit.target_id = Some(id);
            ApplyOutcome {
                target_id: id,
                merge: None,
            }
        }
        Operation::Modify => {
            let id = target(edit)?;
            modify(session, edit, id)?;
            ApplyOutcome {
                target_id: id,
                merge: None,
            }
        }
        Operation::Destroy => {
            let id = target(edit)?;
            destroy(session, edit.target_type, id)?;
            ApplyOutcome {
                target_id: id,
                merge: None,
            }
        }
        Operation::Merge => {
            let id = target(edit)?;
            let stats = merge::merge(session, edit, id)?;
            modify(session, edit, id)?;
            ApplyOutcome {
                target_id: id,
                merge: Some(stats),
            }
        }
    };

    tracing::info!(
        edit_id = %edit.id,
        target_type = %edit.target_type,
        operation = %edit.operation,
        target_id = %outcome.target_id,
        "applied edit"
    );
    Ok(outcome)
}

fn target(edit: &Edit) -> Result<Uuid> {
    edit.target_id
        .ok_or_else(|| CatalogError::invalid(format!("{} edit has no target", edit.operation)))
}

fn create(session: &Session<'_>, edit: &Edit) -> Result<Uuid> {
    let conn = session.conn();
    let now = session.now();
    let id = Uuid::new_v4();

    match &edit.details {
        EditDetails::Tag(diff) => {
            let mut tag = Tag::new(id, String::new(), now);
            diff.apply_to(&mut tag);
            tags::insert(conn, &tag)?;
        }
        EditDetails::Studio(diff) => {
            let mut studio = Studio::new(id, String::new(), now);
            diff.apply_to(&mut studio);
            studios::insert(conn, &studio)?;
        }
        EditDetails::Performer(diff) => {
            let mut performer = Performer::new(id, String::new(), now);
            diff.apply_to(&mut performer);
            performers::insert(conn, &performer)?;
        }
        EditDetails::Scene(diff) => {
            let mut scene = Scene::new(id, now);
            diff.apply_to(&mut scene);
            scenes::insert(conn, &scene)?;
            apply_fingerprints(session, edit.user_id, id, diff)?;
        }
    }
    Ok(id)
}

/// Apply the diff's changes to a live target.
pub(super) fn modify(session: &Session<'_>, edit: &Edit, id: Uuid) -> Result<()> {
    let conn = session.conn();
    let now = session.now();

    match &edit.details {
        EditDetails::Tag(diff) => {
            let mut tag = live(tags::find(conn, id)?, |t: &Tag| t.deleted, TargetType::Tag, id)?;
            diff.apply_to(&mut tag);
            tag.updated_at = now;
            tags::update(conn, &tag)?;
        }
        EditDetails::Studio(diff) => {
            let mut studio = live(
                studios::find(conn, id)?,
                |s: &Studio| s.deleted,
                TargetType::Studio,
                id,
            )?;
            if diff.parent_id == Some(id) {
                return Err(CatalogError::invalid("a studio cannot be its own parent"));
            }
            diff.apply_to(&mut studio);
            studio.updated_at = now;
            studios::update(conn, &studio)?;
        }
        EditDetails::Performer(diff) => {
            let mut performer = live(
                performers::find(conn, id)?,
                |p: &Performer| p.deleted,
                TargetType::Performer,
                id,
            )?;
            let old_name = performer.name.clone();
            diff.apply_to(&mut performer);
            performer.updated_at = now;
            performers::update(conn, &performer)?;

            if diff.preserve_alias_on_modify
                && let Some(new_name) = &diff.name
                && *new_name != old_name
            {
                let rebilled = performers::rebill_after_rename(conn, id, &old_name, new_name)?;
                tracing::debug!(performer_id = %id, rebilled, "kept old name as billing alias");
            }
        }
        EditDetails::Scene(diff) => {
            let mut scene = live(
                scenes::find(conn, id)?,
                |s: &Scene| s.deleted,
                TargetType::Scene,
                id,
            )?;
            diff.apply_to(&mut scene);
            scene.updated_at = now;
            scenes::update(conn, &scene)?;
            apply_fingerprints(session, edit.user_id, id, diff)?;
        }
    }
    Ok(())
}

/// Added fingerprints are submitted on the proposer's behalf; removed ones
/// are dropped along with their submitters.
fn apply_fingerprints(
    session: &Session<'_>,
    proposer: Uuid,
    scene_id: Uuid,
    diff: &SceneDiff,
) -> Result<()> {
    let conn = session.conn();
    for key in &diff.fingerprints.added {
        fingerprint::record_submission(conn, scene_id, key, proposer, session.now())?;
    }
    for key in &diff.fingerprints.removed {
        if let Some(row) = fingerprints::find_row(conn, scene_id, &key.hash, key.algorithm)? {
            fingerprints::delete_row(conn, row.id)?;
        }
    }
    Ok(())
}

/// Soft-delete the target and detach everything that points at it.
fn destroy(session: &Session<'_>, target_type: TargetType, id: Uuid) -> Result<()> {
    let conn = session.conn();
    let now = session.now();
    require_reference(conn, target_type, id)?;

    match target_type {
        TargetType::Performer => {
            let removed = performers::remove_all_appearances(conn, id)?;
            performers::soft_delete(conn, id, now)?;
            tracing::debug!(performer_id = %id, appearances = removed, "destroyed performer");
        }
        TargetType::Studio => {
            let orphaned = studios::clear_scenes(conn, id)?;
            let children = studios::clear_children(conn, id)?;
            studios::soft_delete(conn, id, now)?;
            tracing::debug!(studio_id = %id, scenes = orphaned, children, "destroyed studio");
        }
        TargetType::Tag => {
            let untagged = tags::untag_all(conn, id)?;
            tags::soft_delete(conn, id, now)?;
            tracing::debug!(tag_id = %id, scenes = untagged, "destroyed tag");
        }
        TargetType::Scene => {
            let removed = fingerprints::delete_for_scene(conn, id)?;
            scenes::soft_delete(conn, id, now)?;
            tracing::debug!(scene_id = %id, fingerprints = removed, "destroyed scene");
        }
    }
    Ok(())
}

/// Unwrap a loaded entity, treating a deleted one as missing.
fn live<T>(
    entity: Option<T>,
    is_deleted: fn(&T) -> bool,
    target_type: TargetType,
    id: Uuid,
) -> Result<T> {
    match entity {
        Some(entity) if !is_deleted(&entity) => Ok(entity),
        _ => Err(CatalogError::not_found(target_type.as_str(), id)),
    }
}
