use super::{open_session, report_notifications, write_output, GlobalOptions};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Template to save
    pub template: PathBuf,

    /// Output file; defaults to a name derived from the template title
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Ignore any saved state and save the template as opened
    #[arg(long)]
    pub fresh: bool,
}

/// Save a template as a new standalone document, applying the saved
/// state from the store when there is one
pub fn save(args: SaveArgs, cwd: &str, globals: &GlobalOptions) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut session = open_session(&args.template, &config, cwd, globals, None)?;

    if session.saved_state_available() && !args.fresh {
        session.restore_saved_state()?;
        eprintln!("{}", "Using saved state".green());
    }

    let output = session.save_as_template(config.compile.clone())?;
    report_notifications(&mut session);

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(cwd).join(session.suggested_file_name()));
    write_output(Some(&out), &output)
}
