//! `ghsnap setup [--user <login>] [--json a,b,c]`

use anyhow::{Context, Result};
use clap::Args;

use ghsnap_core::store;
use ghsnap_sync::{setup, GhCli};

use super::FieldListArg;

/// Create (or reset) the store for a user.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// GitHub login to set up; defaults to the signed-in account.
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Comma-separated fields to track instead of the defaults.
    #[arg(long = "json", value_name = "FIELDS")]
    pub fields: Option<FieldListArg>,
}

impl SetupArgs {
    pub fn run(self) -> Result<()> {
        let home = store::home().context("could not determine home directory")?;
        let gh = GhCli::default();
        let config = setup(&home, &gh, self.user.as_deref(), self.fields.map(Into::into))
            .context("setup failed")?;

        println!("✓ Initialised store for '{}'", config.user);
        println!("  Config:   {}", store::config_path_at(&home, &config.user).display());
        println!("  Snapshot: {}", store::snapshot_path_at(&home, &config.user).display());
        println!("  Tracking: {}", config.tracked_fields.join(", "));
        Ok(())
    }
}
