//! ghsnap — keep a local, change-aware snapshot of your GitHub repositories.
//!
//! # Usage
//!
//! ```text
//! ghsnap setup [--user <login>] [--json a,b,c]
//! ghsnap list [-f] [-v] [--user <login>] [--limit N] [--json a,b,c] [--output <path>]
//! ghsnap user
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{list::ListArgs, setup::SetupArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ghsnap",
    version,
    about = "Snapshot and reconcile your GitHub repository listing",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create (or reset) the config, snapshot and fetch log for a user.
    Setup(SetupArgs),

    /// Fetch when due, merge into the snapshot, and report.
    List(ListArgs),

    /// Print the signed-in GitHub login.
    User,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Setup(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::User => commands::user::run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
