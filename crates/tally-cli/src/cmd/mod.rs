pub mod amend;
pub mod comment;
pub mod entity;
pub mod fingerprint;
pub mod init;
pub mod list;
pub mod propose;
pub mod resolve;
pub mod show;
pub mod user;
pub mod vote;

use crate::identity;
use crate::output::{CliError, OutputMode, render_error};
use anyhow::Context as _;
use std::fmt;
use std::io::Read as _;
use std::path::Path;
use tally_core::config::{CATALOG_DIR, load_user_config};
use tally_core::{Actor, Catalog, CatalogConn, CatalogError, ErrorCode, Session};

/// A failure whose error document is already on stderr. `main` exits
/// non-zero without printing it again.
#[derive(Debug)]
pub struct Reported(String);

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Reported {}

/// Whether `err` was rendered where it was raised.
pub fn is_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Reported>().is_some()
}

/// Render a core error and turn it into the command's failure.
pub fn fail(output: OutputMode, err: CatalogError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        return render_err;
    }
    anyhow::Error::new(Reported(err.to_string()))
}

/// Render a CLI-level error and bail with its message.
pub fn fail_with(output: OutputMode, error: &CliError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, error) {
        return render_err;
    }
    anyhow::Error::new(Reported(error.message.clone()))
}

/// Open the catalog under `project_root`, explaining how to create one
/// when it is missing.
///
/// # Errors
///
/// Returns an error if the catalog is missing or cannot be opened.
pub fn open_catalog(output: OutputMode, project_root: &Path) -> anyhow::Result<CatalogConn> {
    if !project_root.join(CATALOG_DIR).is_dir() {
        let code = ErrorCode::NotInitialized;
        return Err(fail_with(
            output,
            &CliError::with_details(
                code.message(),
                code.hint().unwrap_or_default(),
                code.code(),
            ),
        ));
    }
    let catalog = Catalog::open(project_root).map_err(|err| {
        let code = ErrorCode::ConfigParseError;
        fail_with(
            output,
            &CliError::with_details(
                format!("{err:#}"),
                code.hint().unwrap_or_default(),
                code.code(),
            ),
        )
    })?;
    catalog.connect()
}

/// Resolve who is acting and load them from the catalog.
///
/// # Errors
///
/// Returns an error if no identity is configured or the user is unknown.
pub fn acting_user(
    conn: &CatalogConn,
    user_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<Actor> {
    let configured = load_user_config()?.user;
    let name = identity::require_user(user_flag, configured.as_deref()).map_err(|err| {
        fail_with(
            output,
            &CliError::with_details(&err.message, "run `tally user add <name>` as an admin", err.code),
        )
    })?;
    conn.actor(&name).map_err(|err| fail(output, err))
}

/// Open the catalog, resolve the actor, and run `work` in one transaction.
///
/// # Errors
///
/// Returns an error if setup fails or `work` returns a catalog error,
/// which is rendered first.
pub fn run_as<T>(
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
    work: impl FnOnce(&Session<'_>) -> tally_core::Result<T>,
) -> anyhow::Result<T> {
    let mut conn = open_catalog(output, project_root)?;
    let actor = acting_user(&conn, user_flag, output)?;
    conn.with_txn(&actor, work).map_err(|err| fail(output, err))
}

/// Read a JSON payload given inline, as `@path`, or as `-` for stdin.
///
/// # Errors
///
/// Returns an error if the source cannot be read or is not valid JSON.
pub fn read_json(raw: &str) -> anyhow::Result<serde_json::Value> {
    let text = if raw == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read JSON from stdin")?;
        buf
    } else if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("read {path}"))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text).context("parse JSON payload")
}

#[cfg(test)]
mod tests {
    use super::{Reported, is_reported, read_json};

    #[test]
    fn inline_json_parses() {
        let value = read_json(r#"{"name": "Foo"}"#).expect("parse");
        assert_eq!(value["name"], "Foo");
    }

    #[test]
    fn json_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("details.json");
        std::fs::write(&path, r#"{"aliases": ["x"]}"#).expect("write");
        let value = read_json(&format!("@{}", path.display())).expect("parse");
        assert_eq!(value["aliases"][0], "x");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = read_json("{not json").expect_err("invalid");
        assert!(!is_reported(&err));
    }

    #[test]
    fn rendered_failures_are_marked() {
        let err = anyhow::Error::new(Reported("not authorized".into()));
        assert!(is_reported(&err));
        assert_eq!(err.to_string(), "not authorized");
        assert!(!is_reported(&anyhow::anyhow!("disk full")));
    }
}
