use super::run_as;
use crate::cmd::show::EditView;
use crate::output::{OutputMode, render_item};
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::Path;
use tally_core::edit::vote_edit;
use tally_core::model::VoteValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Ballot {
    Accept,
    Reject,
}

impl From<Ballot> for VoteValue {
    fn from(ballot: Ballot) -> Self {
        match ballot {
            Ballot::Accept => Self::Accept,
            Ballot::Reject => Self::Reject,
        }
    }
}

#[derive(Args, Debug)]
pub struct VoteArgs {
    pub edit: Uuid,
    pub ballot: Ballot,
}

/// Execute `tally vote`. Reaching the threshold closes (and on accept,
/// applies) the edit in the same step.
///
/// # Errors
///
/// Returns an error if the vote is rejected.
pub fn run_vote(
    args: &VoteArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let edit = run_as(user_flag, output, project_root, |s| {
        vote_edit(s, args.edit, args.ballot.into())
    })?;
    render_item(&EditView(edit), output)?;
    Ok(())
}
