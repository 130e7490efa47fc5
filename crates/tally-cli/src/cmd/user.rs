//! `tally user`: register and list catalog users.

use super::run_as;
use crate::output::{OutputMode, Renderable, pretty_kv, render_item, render_list};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::Path;
use tally_core::db::users;
use tally_core::model::{Role, RoleSet, User};
use tally_core::session::register_user;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a user (admin only).
    Add {
        name: String,
        /// Role to grant; repeat for several.
        #[arg(long = "role", default_value = "read")]
        roles: Vec<Role>,
    },
    /// List registered users.
    List,
}

struct UserView(User);

impl Renderable for UserView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_kv(w, "User", &self.0.name)?;
        pretty_kv(w, "ID", self.0.id.to_string())?;
        pretty_kv(w, "Roles", self.0.roles.to_db_string())?;
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, &self.0).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}", self.0.id, self.0.name, self.0.roles.to_db_string())
    }

    fn table_headers() -> &'static [&'static str] {
        &["id", "name", "roles"]
    }
}

/// # Errors
///
/// Returns an error if the catalog operation fails.
pub fn run_user(
    args: &UserArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    match &args.command {
        UserCommand::Add { name, roles } => {
            let roles = RoleSet::new(roles.iter().copied());
            let user = run_as(user_flag, output, project_root, |s| {
                register_user(s, name, roles)
            })?;
            render_item(&UserView(user), output)?;
        }
        UserCommand::List => {
            let all = run_as(user_flag, output, project_root, |s| {
                s.actor().require(Role::Read)?;
                Ok(users::list(s.conn())?)
            })?;
            let views: Vec<UserView> = all.into_iter().map(UserView).collect();
            render_list(&views, output)?;
        }
    }
    Ok(())
}
