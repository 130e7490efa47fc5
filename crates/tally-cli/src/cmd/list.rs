use super::run_as;
use crate::cmd::show::EditView;
use crate::output::{OutputMode, render_list};
use anyhow::Result;
use clap::Args;
use std::path::Path;
use tally_core::CatalogError;
use tally_core::db::edits::{EditFilter, SortOrder};
use tally_core::db::users;
use tally_core::edit::query_edits;
use tally_core::model::{EditStatus, Operation, TargetType};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub status: Option<EditStatus>,

    #[arg(long = "type")]
    pub target_type: Option<TargetType>,

    #[arg(long)]
    pub operation: Option<Operation>,

    /// Proposer's user name.
    #[arg(long)]
    pub proposer: Option<String>,

    #[arg(long)]
    pub target: Option<Uuid>,

    /// Only applied (`true`) or unapplied (`false`) edits.
    #[arg(long)]
    pub applied: Option<bool>,

    /// newest, oldest, recent, or top.
    #[arg(long, default_value = "newest")]
    pub sort: SortOrder,

    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub offset: Option<u32>,
}

/// Execute `tally list`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn run_list(
    args: &ListArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let edits = run_as(user_flag, output, project_root, |s| {
        let user_id = match args.proposer.as_deref() {
            Some(name) => Some(
                users::find_by_name(s.conn(), name)?
                    .ok_or_else(|| CatalogError::not_found("user", name))?
                    .id,
            ),
            None => None,
        };
        let filter = EditFilter {
            status: args.status,
            target_type: args.target_type,
            operation: args.operation,
            user_id,
            target_id: args.target,
            applied: args.applied,
            limit: args.limit,
            offset: args.offset,
            sort: args.sort,
        };
        query_edits(s, &filter)
    })?;

    let views: Vec<EditView> = edits.into_iter().map(EditView).collect();
    render_list(&views, output)?;
    Ok(())
}
