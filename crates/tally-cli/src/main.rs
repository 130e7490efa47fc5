#![forbid(unsafe_code)]

mod cmd;
mod identity;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tally: a collaborative catalog with voted edits",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format: pretty, text, or json (defaults by TTY, or `FORMAT`).
    #[arg(long, global = true)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Act as this user (overrides `TALLY_USER` and config).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    fn user_flag(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a catalog",
        long_about = "Create .tally/ with a default config and a migrated database.",
        after_help = "EXAMPLES:\n    # Initialize and seed the first administrator\n    tally init --admin root"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Setup", about = "Register and list users")]
    User(cmd::user::UserArgs),

    #[command(
        next_help_heading = "Edits",
        about = "Propose an edit",
        long_about = "Propose a create, modify, destroy, or merge edit against a catalog entity.",
        after_help = "EXAMPLES:\n    # Propose a new tag\n    tally propose tag create --details '{\"name\": \"Outdoor\"}'\n\n    # Merge two performers, keeping the old name as an alias\n    tally propose performer merge --target <id> --merge-source <id> --preserve-alias-on-merge\n\n    # Read details from a file\n    tally propose scene modify --target <id> --details @scene.json"
    )]
    Propose(cmd::propose::ProposeArgs),

    #[command(next_help_heading = "Edits", about = "Replace the details of a pending edit")]
    Amend(cmd::amend::AmendArgs),

    #[command(
        next_help_heading = "Edits",
        about = "Vote on a pending edit",
        after_help = "EXAMPLES:\n    tally vote <edit-id> accept\n    tally vote <edit-id> reject"
    )]
    Vote(cmd::vote::VoteArgs),

    #[command(next_help_heading = "Edits", about = "Comment on an edit")]
    Comment(cmd::comment::CommentArgs),

    #[command(next_help_heading = "Edits", about = "Accept and apply an edit immediately")]
    Apply(cmd::resolve::EditIdArgs),

    #[command(next_help_heading = "Edits", about = "Withdraw or reject a pending edit")]
    Cancel(cmd::resolve::EditIdArgs),

    #[command(
        next_help_heading = "Edits",
        about = "Close pending edits whose outcome is settled",
        long_about = "Resolve every pending edit that has reached its vote threshold or voting deadline."
    )]
    CloseCompleted,

    #[command(next_help_heading = "Read", about = "Show one edit")]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "List edits",
        after_help = "EXAMPLES:\n    # Pending tag edits, newest first\n    tally list --status pending --type tag\n\n    # Edits by one user\n    tally list --proposer alice --json"
    )]
    List(cmd::list::ListArgs),

    #[command(next_help_heading = "Read", about = "Show a catalog entity")]
    Entity(cmd::entity::EntityArgs),

    #[command(next_help_heading = "Fingerprints", about = "Submit and look up scene fingerprints")]
    Fingerprint(cmd::fingerprint::FingerprintArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "tally=debug,tally_core=debug,info"
        } else {
            "tally=info,tally_core=info,warn"
        })
    });

    let format = env::var("TALLY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("verbose mode enabled");
    }

    let output = cli.output_mode();
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !cmd::is_reported(&err) {
                let error = CliError {
                    message: format!("{err:#}"),
                    suggestion: None,
                    error_code: None,
                };
                if let Err(render_err) = render_error(output, &error) {
                    tracing::error!(error = %err, render_error = %render_err, "could not report failure");
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Dispatch the parsed command. Errors raised from catalog operations are
/// rendered before they reach here; anything else is rendered by `main`.
fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let user = cli.user_flag();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::User(args) => cmd::user::run_user(args, user, output, &project_root),
        Commands::Propose(args) => cmd::propose::run_propose(args, user, output, &project_root),
        Commands::Amend(args) => cmd::amend::run_amend(args, user, output, &project_root),
        Commands::Vote(args) => cmd::vote::run_vote(args, user, output, &project_root),
        Commands::Comment(args) => cmd::comment::run_comment(args, user, output, &project_root),
        Commands::Apply(args) => cmd::resolve::run_apply(args, user, output, &project_root),
        Commands::Cancel(args) => cmd::resolve::run_cancel(args, user, output, &project_root),
        Commands::CloseCompleted => {
            cmd::resolve::run_close_completed(user, output, &project_root)
        }
        Commands::Show(args) => cmd::show::run_show(args, user, output, &project_root),
        Commands::List(args) => cmd::list::run_list(args, user, output, &project_root),
        Commands::Entity(args) => cmd::entity::run_entity(args, user, output, &project_root),
        Commands::Fingerprint(args) => {
            cmd::fingerprint::run_fingerprint(args, user, output, &project_root)
        }
    }
}
