//! Folding merge sources into their target.
//!
//! Each source's inbound relations move to the target. A relation the
//! target already has is dropped instead of duplicated; the check is an
//! explicit lookup, never a constraint violation. Then the source gets a
//! redirect and is soft-deleted.

use super::require_reference;
use crate::db::{fingerprints, performers, redirects, scenes, studios, tags};
use crate::diff::EditDetails;
use crate::error::Result;
use crate::model::{Edit, TargetType};
use crate::session::Session;
use serde::Serialize;
use uuid::Uuid;

/// What happened to one inbound relation of a merge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOutcome {
    /// Moved to the target.
    Reassigned,
    /// The target already had an equivalent relation; the source's copy
    /// was dropped.
    ConflictSkipped,
}

impl RelationOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reassigned => "reassigned",
            Self::ConflictSkipped => "conflict_skipped",
        }
    }
}

/// Counters for one applied merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub sources: usize,
    pub reassigned: usize,
    pub conflict_skipped: usize,
    /// Older redirects that pointed at a source and now point at the target.
    pub redirects_repointed: usize,
}

struct Relations<'s, 'c> {
    session: &'s Session<'c>,
    edit_id: Uuid,
    source: Uuid,
    target: Uuid,
    stats: &'s mut MergeStats,
}

impl Relations<'_, '_> {
    fn record(&mut self, relation: &'static str, related: Uuid, outcome: RelationOutcome) {
        match outcome {
            RelationOutcome::Reassigned => {
                self.stats.reassigned += 1;
                tracing::debug!(
                    edit_id = %self.edit_id,
                    source = %self.source,
                    target = %self.target,
                    relation,
                    related = %related,
                    outcome = outcome.as_str(),
                    "merge relation"
                );
            }
            RelationOutcome::ConflictSkipped => {
                self.stats.conflict_skipped += 1;
                tracing::info!(
                    edit_id = %self.edit_id,
                    source = %self.source,
                    target = %self.target,
                    relation,
                    related = %related,
                    outcome = outcome.as_str(),
                    "merge relation already present on target"
                );
            }
        }
    }

    fn performer_appearances(&mut self, billing_name: Option<&str>) -> Result<()> {
        let conn = self.session.conn();
        for appearance in performers::appearances(conn, self.source)? {
            let scene = appearance.scene_id;
            let outcome = if performers::appears_in(conn, scene, self.target)? {
                performers::remove_appearance(conn, scene, self.source)?;
                RelationOutcome::ConflictSkipped
            } else {
                performers::reassign_appearance(conn, scene, self.source, self.target, billing_name)?;
                RelationOutcome::Reassigned
            };
            self.record("scene_performer", scene, outcome);
        }
        Ok(())
    }

    fn scene_tags(&mut self) -> Result<()> {
        let conn = self.session.conn();
        for scene in tags::tagged_scenes(conn, self.source)? {
            let outcome = if tags::scene_has_tag(conn, scene, self.target)? {
                tags::untag_scene(conn, scene, self.source)?;
                RelationOutcome::ConflictSkipped
            } else {
                tags::retag_scene(conn, scene, self.source, self.target)?;
                RelationOutcome::Reassigned
            };
            self.record("scene_tag", scene, outcome);
        }
        Ok(())
    }

    fn studio_links(&mut self) -> Result<()> {
        let conn = self.session.conn();
        let moved = studios::reassign_scenes(conn, self.source, self.target)?;
        self.stats.reassigned += moved;
        tracing::debug!(source = %self.source, target = %self.target, scenes = moved, "moved studio scenes");

        for child in studios::children(conn, self.source)? {
            if child == self.target {
                studios::set_parent(conn, child, None)?;
                self.record("studio_parent", child, RelationOutcome::ConflictSkipped);
            } else {
                studios::set_parent(conn, child, Some(self.target))?;
                self.record("studio_parent", child, RelationOutcome::Reassigned);
            }
        }
        Ok(())
    }

    fn scene_fingerprints(&mut self) -> Result<()> {
        let conn = self.session.conn();
        let now = self.session.now();
        for (row_id, key) in fingerprints::keys_for_scene(conn, self.source)? {
            match fingerprints::find_row(conn, self.target, &key.hash, key.algorithm)? {
                Some(existing) => {
                    for user in fingerprints::submitters(conn, row_id)? {
                        let outcome = if fingerprints::add_submitter(conn, existing.id, user, now)? {
                            RelationOutcome::Reassigned
                        } else {
                            RelationOutcome::ConflictSkipped
                        };
                        self.record("fingerprint_submitter", user, outcome);
                    }
                    fingerprints::delete_row(conn, row_id)?;
                }
                None => {
                    fingerprints::move_to_scene(conn, row_id, self.target, now)?;
                    self.stats.reassigned += 1;
                }
            }
        }
        Ok(())
    }
}

/// Fold every source of a merge edit into `target`, in order. The diff
/// itself is applied to the target by the caller afterwards.
pub(super) fn merge(session: &Session<'_>, edit: &Edit, target: Uuid) -> Result<MergeStats> {
    let conn = session.conn();
    let target_type = edit.target_type;
    require_reference(conn, target_type, target)?;

    let preserve_alias = matches!(
        &edit.details,
        EditDetails::Performer(diff) if diff.preserve_alias_on_merge
    );

    let mut stats = MergeStats::default();
    for &source in &edit.merge_source_ids {
        require_reference(conn, target_type, source)?;

        let mut relations = Relations {
            session,
            edit_id: edit.id,
            source,
            target,
            stats: &mut stats,
        };
        match target_type {
            TargetType::Performer => {
                let billing_name = if preserve_alias {
                    performers::find(conn, source)?.map(|p| p.name)
                } else {
                    None
                };
                relations.performer_appearances(billing_name.as_deref())?;
            }
            TargetType::Tag => relations.scene_tags()?,
            TargetType::Studio => relations.studio_links()?,
            TargetType::Scene => relations.scene_fingerprints()?,
        }

        stats.redirects_repointed += redirects::record(conn, target_type, source, target, session.now())?;
        soft_delete(session, target_type, source)?;
        stats.sources += 1;
    }

    tracing::info!(
        edit_id = %edit.id,
        target_type = %target_type,
        target = %target,
        sources = stats.sources,
        reassigned = stats.reassigned,
        conflict_skipped = stats.conflict_skipped,
        "merged entities"
    );
    Ok(stats)
}

fn soft_delete(session: &Session<'_>, target_type: TargetType, id: Uuid) -> Result<()> {
    let conn = session.conn();
    let now = session.now();
    match target_type {
        TargetType::Performer => performers::soft_delete(conn, id, now)?,
        TargetType::Tag => tags::soft_delete(conn, id, now)?,
        TargetType::Studio => studios::soft_delete(conn, id, now)?,
        TargetType::Scene => scenes::soft_delete(conn, id, now)?,
    }
    Ok(())
}
