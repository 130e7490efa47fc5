//! `tally fingerprint`: vouch for scene fingerprints and look scenes up
//! by them.

use super::{read_json, run_as};
use crate::cmd::entity::SceneView;
use crate::output::{OutputMode, render_list, render_mode};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::path::Path;
use tally_core::db::fingerprints;
use tally_core::fingerprint::{
    FingerprintQuery, FingerprintSubmission, find_scenes_by_fingerprint,
    find_scenes_by_fingerprints, find_scenes_by_full_fingerprints,
    find_scenes_by_scene_fingerprints, submit_fingerprint,
};
use tally_core::model::{FingerprintAlgorithm, FingerprintKey, Role};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    #[command(subcommand)]
    pub command: FingerprintCommand,
}

#[derive(Subcommand, Debug)]
pub enum FingerprintCommand {
    /// Submit (or with --unmatch, retract) a fingerprint for a scene.
    Submit {
        scene: Uuid,
        hash: String,
        #[arg(long, default_value = "oshash")]
        algorithm: FingerprintAlgorithm,
        /// Content duration in seconds.
        #[arg(long, required_unless_present = "unmatch")]
        duration: Option<i64>,
        #[arg(long)]
        unmatch: bool,
    },
    /// Find scenes carrying any of the hashes.
    Find {
        #[arg(required = true)]
        hashes: Vec<String>,
        /// Restrict to one algorithm; perceptual hashes then match by distance.
        #[arg(long)]
        algorithm: Option<FingerprintAlgorithm>,
    },
    /// Batch lookup: a JSON array of query groups, one result list per group.
    FindScenes {
        /// `[[{"hash": "...", "algorithm": "MD5"}], ...]`, `@file`, or `-`.
        queries: String,
    },
    /// Fingerprints recorded for a scene.
    List { scene: Uuid },
}

/// # Errors
///
/// Returns an error if the catalog operation fails.
pub fn run_fingerprint(
    args: &FingerprintArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    match &args.command {
        FingerprintCommand::Submit {
            scene,
            hash,
            algorithm,
            duration,
            unmatch,
        } => {
            let submission = FingerprintSubmission {
                scene_id: *scene,
                key: FingerprintKey {
                    hash: hash.clone(),
                    algorithm: *algorithm,
                    duration: duration.unwrap_or_default(),
                },
                unmatch: *unmatch,
            };
            let changed = run_as(user_flag, output, project_root, |s| {
                submit_fingerprint(s, &submission)
            })?;
            let report = serde_json::json!({ "scene_id": scene, "changed": changed });
            render_mode(
                output,
                &report,
                |_, w| writeln!(w, "{changed}"),
                |_, w| {
                    let verb = if *unmatch { "Unmatched" } else { "Submitted" };
                    if changed {
                        writeln!(w, "✓ {verb} {algorithm} {hash} for {scene}")
                    } else {
                        writeln!(w, "No change for {scene}")
                    }
                },
            )
        }
        FingerprintCommand::Find { hashes, algorithm } => {
            let scenes = run_as(user_flag, output, project_root, |s| match (algorithm, hashes.as_slice()) {
                (Some(algorithm), [hash]) => find_scenes_by_fingerprint(
                    s,
                    &FingerprintQuery {
                        hash: hash.clone(),
                        algorithm: *algorithm,
                    },
                ),
                (Some(algorithm), _) => {
                    let queries: Vec<FingerprintQuery> = hashes
                        .iter()
                        .map(|hash| FingerprintQuery {
                            hash: hash.clone(),
                            algorithm: *algorithm,
                        })
                        .collect();
                    find_scenes_by_full_fingerprints(s, &queries)
                }
                (None, _) => find_scenes_by_fingerprints(s, hashes),
            })?;
            let views: Vec<SceneView> = scenes.into_iter().map(SceneView).collect();
            render_list(&views, output)?;
            Ok(())
        }
        FingerprintCommand::FindScenes { queries } => {
            let groups: Vec<Vec<FingerprintQuery>> =
                serde_json::from_value(read_json(queries)?).context("parse query groups")?;
            let results = run_as(user_flag, output, project_root, |s| {
                find_scenes_by_scene_fingerprints(s, &groups)
            })?;
            render_mode(
                output,
                &results,
                |r, w| {
                    for (index, group) in r.iter().enumerate() {
                        for scene in group {
                            writeln!(w, "{index}\t{}", scene.id)?;
                        }
                    }
                    Ok(())
                },
                |r, w| {
                    for (index, group) in r.iter().enumerate() {
                        writeln!(w, "Group {index}: {} scene(s)", group.len())?;
                        for scene in group {
                            writeln!(w, "  {}  {}", scene.id, scene.title.as_deref().unwrap_or("-"))?;
                        }
                    }
                    Ok(())
                },
            )
        }
        FingerprintCommand::List { scene } => {
            let rows = run_as(user_flag, output, project_root, |s| {
                s.actor().require(Role::Read)?;
                Ok(fingerprints::for_scene(s.conn(), *scene)?)
            })?;
            render_mode(
                output,
                &rows,
                |r, w| {
                    for fp in r {
                        writeln!(w, "{}\t{}\t{}\t{}", fp.algorithm, fp.hash, fp.duration, fp.submissions)?;
                    }
                    Ok(())
                },
                |r, w| {
                    if r.is_empty() {
                        return writeln!(w, "No fingerprints for {scene}");
                    }
                    for fp in r {
                        writeln!(
                            w,
                            "{:<7} {}  {}s  submitted by {}",
                            fp.algorithm.as_str(),
                            fp.hash,
                            fp.duration,
                            fp.submissions
                        )?;
                    }
                    Ok(())
                },
            )
        }
    }
}
