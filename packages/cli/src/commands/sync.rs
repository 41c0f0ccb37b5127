use super::{open_session, GlobalOptions};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Template whose bars should follow their labels
    pub template: PathBuf,
}

/// Bar sync runs when a session opens; print the normalized body
pub fn sync(args: SyncArgs, cwd: &str, globals: &GlobalOptions) -> Result<()> {
    let config = Config::load(cwd)?;
    let session = open_session(&args.template, &config, cwd, globals, None)?;
    println!("{}", session.body_markup());
    Ok(())
}
