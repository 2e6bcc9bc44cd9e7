//! `ghsnap user`

use anyhow::{Context, Result};

use ghsnap_sync::{GhCli, RepoSource};

pub fn run() -> Result<()> {
    let login = GhCli::default()
        .current_user()
        .context("could not read the signed-in GitHub account")?;
    println!("{login}");
    Ok(())
}
