//! Closing edits outside of voting: `apply`, `cancel`, and the
//! `close-completed` sweep.

use super::run_as;
use crate::cmd::show::EditView;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_item, render_mode};
use anyhow::Result;
use clap::Args;
use std::path::Path;
use tally_core::edit::{apply_edit, cancel_edit, close_completed};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct EditIdArgs {
    pub edit: Uuid,
}

/// Execute `tally apply`: immediately accept and apply (modify role).
///
/// # Errors
///
/// Returns an error if the edit cannot be applied.
pub fn run_apply(
    args: &EditIdArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let edit = run_as(user_flag, output, project_root, |s| apply_edit(s, args.edit))?;
    render_item(&EditView(edit), output)?;
    Ok(())
}

/// Execute `tally cancel`: the proposer withdraws, an admin rejects.
///
/// # Errors
///
/// Returns an error if the edit cannot be canceled.
pub fn run_cancel(
    args: &EditIdArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let edit = run_as(user_flag, output, project_root, |s| cancel_edit(s, args.edit))?;
    render_item(&EditView(edit), output)?;
    Ok(())
}

/// Execute `tally close-completed`: resolve every pending edit whose
/// voting outcome is settled (admin role).
///
/// # Errors
///
/// Returns an error if the sweep cannot run.
pub fn run_close_completed(
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let report = run_as(user_flag, output, project_root, close_completed)?;
    render_mode(
        output,
        &report,
        |r, w| {
            for id in &r.accepted {
                writeln!(w, "accepted\t{id}")?;
            }
            for id in &r.rejected {
                writeln!(w, "rejected\t{id}")?;
            }
            for (id, reason) in &r.failed {
                writeln!(w, "failed\t{id}\t{reason}")?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Sweep")?;
            pretty_kv(w, "Accepted", r.accepted.len().to_string())?;
            pretty_kv(w, "Rejected", r.rejected.len().to_string())?;
            pretty_kv(w, "Failed", r.failed.len().to_string())?;
            for (id, reason) in &r.failed {
                writeln!(w, "  {id}: {reason}")?;
            }
            Ok(())
        },
    )
}
