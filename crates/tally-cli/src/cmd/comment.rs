use super::run_as;
use crate::cmd::show::EditView;
use crate::output::{OutputMode, render_item};
use anyhow::Result;
use clap::Args;
use std::path::Path;
use tally_core::edit::comment_edit;
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub edit: Uuid,
    pub body: String,
}

/// Execute `tally comment`. Prints the edit with its comment thread.
///
/// # Errors
///
/// Returns an error if the comment is rejected.
pub fn run_comment(
    args: &CommentArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let edit = run_as(user_flag, output, project_root, |s| {
        comment_edit(s, args.edit, &args.body)
    })?;
    render_item(&EditView(edit), output)?;
    Ok(())
}
