//! sitekit: keep a site's local config document in sync with its backend.
//!
//! # Usage
//!
//! ```text
//! sitekit init <site> --url <url> --anon-key <key> [--settings-id <id>]
//! sitekit status [--site <site>] [--json]
//! sitekit push <site> | --all [--only settings|team|news|social|quotes] [--dry-run]
//! sitekit pull <site> [--force]
//! sitekit diff <site> [--offline]
//! sitekit reset <site>
//! sitekit check <site>
//! sitekit login <site> --email <email> [--password <password>]
//! sitekit logout <site>
//! sitekit daemon start|stop|status|sync [site]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    auth::{LoginArgs, LogoutArgs},
    check::CheckArgs,
    daemon::DaemonCommand,
    diff::DiffArgs,
    init::InitArgs,
    pull::PullArgs,
    push::PushArgs,
    reset::ResetArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sitekit",
    version,
    about = "Sync a site's config document with its PostgREST backend",
    long_about = None,
)]
struct Cli {
    /// Log sync activity to stderr (`RUST_LOG` takes precedence).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a site and write its default document.
    Init(InitArgs),

    /// Show sync state of every site.
    Status(StatusArgs),

    /// Send local edits to the backend.
    Push(PushArgs),

    /// Replace the local document with the backend's.
    Pull(PullArgs),

    /// Show a unified diff of local edits against the backend.
    Diff(DiffArgs),

    /// Restore the local document to defaults.
    Reset(ResetArgs),

    /// Probe the backend tables a site uses.
    Check(CheckArgs),

    /// Sign in as an operator and store the session.
    Login(LoginArgs),

    /// Forget the stored operator session.
    Logout(LogoutArgs),

    /// Run or control the background push daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !matches!(cli.command, Commands::Daemon { .. }) {
        init_tracing(cli.verbose);
    }
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Push(args) => args.run(),
        Commands::Pull(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Reset(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Login(args) => args.run(),
        Commands::Logout(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
