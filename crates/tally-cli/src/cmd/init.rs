use crate::output::{OutputMode, render_mode};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use tally_core::Catalog;
use tally_core::config::CATALOG_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Seed the first administrator. Ignored when users already exist.
    #[arg(long)]
    pub admin: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitReport {
    catalog: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<String>,
}

/// Execute `tally init`. Creates `.tally/` with a default `config.toml`
/// and a migrated database. Safe to rerun.
///
/// # Errors
///
/// Returns an error if the catalog cannot be created.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let catalog = Catalog::init(project_root)?;
    let mut admin = None;
    if let Some(name) = args.admin.as_deref() {
        let mut conn = catalog.connect()?;
        match conn.bootstrap_admin(name)? {
            Some(user) => admin = Some(user.name),
            None => eprintln!("Note: users already exist; --admin ignored."),
        }
    }

    let report = InitReport {
        catalog: project_root.join(CATALOG_DIR).display().to_string(),
        admin,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}", r.catalog),
        |r, w| {
            writeln!(w, "✓ Initialized catalog at {}", r.catalog)?;
            if let Some(admin) = &r.admin {
                writeln!(w, "  Administrator: {admin}")?;
                writeln!(w)?;
                writeln!(w, "Next steps:")?;
                writeln!(w, "  export TALLY_USER={admin}")?;
                writeln!(w, "  tally user add <name> --role edit")?;
            }
            Ok(())
        },
    )
}
