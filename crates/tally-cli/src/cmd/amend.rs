use super::propose::edit_input;
use super::{read_json, run_as};
use crate::cmd::show::EditView;
use crate::output::{OutputMode, render_item};
use anyhow::Result;
use clap::Args;
use std::path::Path;
use tally_core::edit::{find_edit, update_edit};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct AmendArgs {
    pub edit: Uuid,

    /// Replacement desired state as JSON, `@file`, or `-` for stdin.
    #[arg(long)]
    pub details: String,
}

/// Execute `tally amend`: replace a pending edit's details. Votes cast so
/// far are discarded.
///
/// # Errors
///
/// Returns an error if the payload is malformed or the amendment is rejected.
pub fn run_amend(
    args: &AmendArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let payload = read_json(&args.details)?;
    let edit = run_as(user_flag, output, project_root, |s| {
        let current = find_edit(s, args.edit)?;
        let input = edit_input(current.target_type, Some(payload))?;
        update_edit(s, args.edit, input)
    })?;
    render_item(&EditView(edit), output)?;
    Ok(())
}
