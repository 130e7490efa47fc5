//! Fingerprint consensus: per-user submissions and scene lookups.
//!
//! A fingerprint row is identified by `(scene, hash, algorithm)` and carries
//! the set of users who vouched for it. Submitting is idempotent per user;
//! unmatching removes one user, and the row disappears with its last
//! submitter. Lookups only ever return live scenes.

mod similarity;

pub use similarity::{Hamming, SimilarityComparator};

use crate::db::{self, fingerprints, scenes};
use crate::error::{CatalogError, Result};
use crate::model::{FingerprintAlgorithm, FingerprintKey, Role, Scene, TargetType};
use crate::session::Session;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// One client report about a scene's fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSubmission {
    pub scene_id: Uuid,
    #[serde(flatten)]
    pub key: FingerprintKey,
    /// Retract the caller's earlier submission instead of adding one.
    #[serde(default)]
    pub unmatch: bool,
}

/// A hash to look up, with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintQuery {
    pub hash: String,
    pub algorithm: FingerprintAlgorithm,
}

/// Record (or with `unmatch`, retract) the actor's vouching for a scene
/// fingerprint. Requires the read role.
///
/// Returns false when nothing changed for a reason the client can ignore:
/// the scene is deleted, or an unmatch names a fingerprint the actor never
/// submitted. A repeat submission returns true.
///
/// # Errors
///
/// - [`CatalogError::InvalidOperation`] for a blank hash or non-positive
///   duration
/// - [`CatalogError::NotFound`] for an unknown scene, or an unmatch of a
///   fingerprint that does not exist
pub fn submit_fingerprint(session: &Session<'_>, submission: &FingerprintSubmission) -> Result<bool> {
    let actor = session.actor();
    actor.require(Role::Read)?;

    let hash = submission.key.hash.trim();
    if hash.is_empty() {
        return Err(CatalogError::invalid("fingerprint hash must not be empty"));
    }
    if !submission.unmatch && submission.key.duration <= 0 {
        return Err(CatalogError::invalid("fingerprint duration must be positive"));
    }

    let conn = session.conn();
    let scene_id = submission.scene_id;
    match db::entity_deleted(conn, TargetType::Scene, scene_id)? {
        None => return Err(CatalogError::not_found("scene", scene_id)),
        Some(true) => {
            tracing::debug!(scene_id = %scene_id, "ignoring fingerprint for deleted scene");
            return Ok(false);
        }
        Some(false) => {}
    }

    let key = FingerprintKey {
        hash: hash.to_string(),
        ..submission.key.clone()
    };
    if submission.unmatch {
        retract_submission(conn, scene_id, &key, actor.user_id, session.now())
    } else {
        record_submission(conn, scene_id, &key, actor.user_id, session.now())?;
        Ok(true)
    }
}

/// Add `user_id` to the submitters of a scene fingerprint, creating the row
/// on first sight. Returns whether the user was newly added.
pub(crate) fn record_submission(
    conn: &Connection,
    scene_id: Uuid,
    key: &FingerprintKey,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let row_id = match fingerprints::find_row(conn, scene_id, &key.hash, key.algorithm)? {
        Some(row) => row.id,
        None => fingerprints::insert_row(conn, scene_id, key, now)?,
    };
    let added = fingerprints::add_submitter(conn, row_id, user_id, now)?;
    tracing::debug!(
        scene_id = %scene_id,
        hash = %key.hash,
        algorithm = %key.algorithm,
        added,
        "fingerprint submission"
    );
    Ok(added)
}

fn retract_submission(
    conn: &Connection,
    scene_id: Uuid,
    key: &FingerprintKey,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let row = fingerprints::find_row(conn, scene_id, &key.hash, key.algorithm)?
        .ok_or_else(|| CatalogError::not_found("fingerprint", format!("{} {}", key.algorithm, key.hash)))?;

    match fingerprints::remove_submitter(conn, row.id, user_id, now)? {
        None => Ok(false),
        Some(0) => {
            fingerprints::delete_row(conn, row.id)?;
            tracing::info!(
                scene_id = %scene_id,
                hash = %key.hash,
                algorithm = %key.algorithm,
                "removed fingerprint after last unmatch"
            );
            Ok(true)
        }
        Some(remaining) => {
            tracing::debug!(scene_id = %scene_id, hash = %key.hash, remaining, "unmatched fingerprint");
            Ok(true)
        }
    }
}

/// Live scenes carrying `query.hash` under `query.algorithm`.
///
/// # Errors
///
/// Returns [`CatalogError::Unauthorized`] without the read role.
pub fn find_scenes_by_fingerprint(session: &Session<'_>, query: &FingerprintQuery) -> Result<Vec<Scene>> {
    session.actor().require(Role::Read)?;
    let conn = session.conn();
    let ids = fingerprints::scenes_with_hash(conn, query.hash.trim(), Some(query.algorithm))?;
    Ok(scenes::find_live(conn, &ids)?)
}

/// Live scenes carrying any of `hashes`, under any algorithm.
///
/// # Errors
///
/// Returns [`CatalogError::TooManyFingerprints`] past `fingerprints.max_batch`.
pub fn find_scenes_by_fingerprints(session: &Session<'_>, hashes: &[String]) -> Result<Vec<Scene>> {
    session.actor().require(Role::Read)?;
    check_batch(hashes.len(), session.config().fingerprints.max_batch)?;
    let conn = session.conn();

    let mut ids = Vec::new();
    for hash in hashes {
        ids.extend(fingerprints::scenes_with_hash(conn, hash.trim(), None)?);
    }
    Ok(scenes::find_live(conn, &dedup(ids))?)
}

/// Live scenes matching any of `queries`, comparing perceptual hashes by
/// [`Hamming`] distance.
///
/// # Errors
///
/// Returns [`CatalogError::TooManyFingerprints`] past `fingerprints.max_batch`.
pub fn find_scenes_by_full_fingerprints(
    session: &Session<'_>,
    queries: &[FingerprintQuery],
) -> Result<Vec<Scene>> {
    find_scenes_by_full_fingerprints_with(session, queries, &Hamming)
}

/// [`find_scenes_by_full_fingerprints`] with a caller-chosen comparator.
///
/// With `fingerprints.phash_distance == 0` every query is an exact hash
/// lookup regardless of algorithm.
///
/// # Errors
///
/// Returns [`CatalogError::TooManyFingerprints`] past `fingerprints.max_batch`.
pub fn find_scenes_by_full_fingerprints_with(
    session: &Session<'_>,
    queries: &[FingerprintQuery],
    comparator: &dyn SimilarityComparator,
) -> Result<Vec<Scene>> {
    session.actor().require(Role::Read)?;
    check_batch(queries.len(), session.config().fingerprints.max_batch)?;
    let conn = session.conn();
    let ids = match_queries(conn, queries, session.config().fingerprints.phash_distance, comparator)?;
    Ok(scenes::find_live(conn, &ids)?)
}

/// One result list per group of queries, in group order.
///
/// # Errors
///
/// Returns [`CatalogError::TooManyScenes`] past
/// `fingerprints.max_scene_batch` groups.
pub fn find_scenes_by_scene_fingerprints(
    session: &Session<'_>,
    groups: &[Vec<FingerprintQuery>],
) -> Result<Vec<Vec<Scene>>> {
    session.actor().require(Role::Read)?;
    let max = session.config().fingerprints.max_scene_batch;
    if groups.len() > max {
        return Err(CatalogError::TooManyScenes {
            got: groups.len(),
            max,
        });
    }

    let conn = session.conn();
    let distance = session.config().fingerprints.phash_distance;
    groups
        .iter()
        .map(|group| {
            let ids = match_queries(conn, group, distance, &Hamming)?;
            Ok(scenes::find_live(conn, &ids)?)
        })
        .collect()
}

fn check_batch(got: usize, max: usize) -> Result<()> {
    if got > max {
        return Err(CatalogError::TooManyFingerprints { got, max });
    }
    Ok(())
}

fn match_queries(
    conn: &Connection,
    queries: &[FingerprintQuery],
    phash_distance: u32,
    comparator: &dyn SimilarityComparator,
) -> Result<Vec<Uuid>> {
    let mut ids = Vec::new();
    if phash_distance == 0 {
        for query in queries {
            ids.extend(fingerprints::scenes_with_hash(conn, query.hash.trim(), None)?);
        }
        return Ok(dedup(ids));
    }

    let mut phashes: Option<Vec<(Uuid, String)>> = None;
    for query in queries {
        let hash = query.hash.trim();
        if query.algorithm == FingerprintAlgorithm::Phash {
            if phashes.is_none() {
                phashes = Some(fingerprints::live_phashes(conn)?);
            }
            let candidates = phashes.as_deref().unwrap_or_default();
            ids.extend(
                candidates
                    .iter()
                    .filter(|(_, stored)| {
                        comparator
                            .distance(hash, stored)
                            .is_some_and(|d| d <= phash_distance)
                    })
                    .map(|(scene, _)| *scene),
            );
        } else {
            ids.extend(fingerprints::scenes_with_hash(conn, hash, Some(query.algorithm))?);
        }
    }
    Ok(dedup(ids))
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
