//! `tally show`: one edit with its diff, votes, and comments.

use super::run_as;
use crate::output::{OutputMode, Renderable, pretty_kv, pretty_rule, pretty_section, render_item};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Args;
use std::io::{self, Write};
use std::path::Path;
use tally_core::edit::find_edit;
use tally_core::model::Edit;
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub edit: Uuid,
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn short(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// An edit as shown by `show`, `list`, and every mutating command.
pub struct EditView(pub Edit);

impl Renderable for EditView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let edit = &self.0;
        pretty_section(
            w,
            &format!("{} {} [{}]", edit.operation, edit.target_type, edit.status),
        )?;
        pretty_kv(w, "Edit", edit.id.to_string())?;
        pretty_kv(w, "Proposer", edit.user_id.to_string())?;
        if let Some(target) = edit.target_id {
            pretty_kv(w, "Target", target.to_string())?;
        }
        for source in &edit.merge_source_ids {
            pretty_kv(w, "Merging", source.to_string())?;
        }
        pretty_kv(w, "Applied", if edit.applied { "yes" } else { "no" })?;
        pretty_kv(w, "Votes", format!("{:+}", edit.vote_count))?;
        pretty_kv(w, "Updates", edit.update_count.to_string())?;
        pretty_kv(w, "Created", local_time(edit.created_at))?;
        if let Some(closed) = edit.closed_at {
            pretty_kv(w, "Closed", local_time(closed))?;
        }

        let details = serde_json::to_string_pretty(&edit.details).map_err(io::Error::other)?;
        writeln!(w)?;
        pretty_section(w, "Changes")?;
        writeln!(w, "{details}")?;

        if !edit.votes.is_empty() {
            writeln!(w)?;
            pretty_section(w, "Votes")?;
            for vote in &edit.votes {
                writeln!(w, "  {:<18} {}", vote.vote.as_str(), vote.user_id)?;
            }
        }
        if !edit.comments.is_empty() {
            writeln!(w)?;
            pretty_section(w, "Comments")?;
            for comment in &edit.comments {
                writeln!(w, "  [{}] {}", local_time(comment.created_at), comment.user_id)?;
                for line in comment.body.lines() {
                    writeln!(w, "    {line}")?;
                }
            }
        }
        pretty_rule(w)?;
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, &self.0).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let edit = &self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            edit.id,
            edit.status,
            edit.target_type,
            edit.operation,
            edit.target_id.map_or_else(|| "-".to_string(), short),
            edit.vote_count
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["id", "status", "type", "operation", "target", "votes"]
    }
}

/// # Errors
///
/// Returns an error if the edit cannot be loaded or rendered.
pub fn run_show(
    args: &ShowArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let edit = run_as(user_flag, output, project_root, |s| find_edit(s, args.edit))?;
    render_item(&EditView(edit), output)?;
    Ok(())
}
