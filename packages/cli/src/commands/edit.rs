use super::script::{parse_script, run_command};
use super::{open_session, report_notifications, write_output, GlobalOptions};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use vellum_editor::ManualClock;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Template to edit
    pub template: PathBuf,

    /// JSON edit script
    #[arg(short, long)]
    pub script: PathBuf,

    /// Where to write the saved template (stdout when omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Start from the saved state when one is available
    #[arg(long)]
    pub restore: bool,
}

pub fn edit(args: EditArgs, cwd: &str, globals: &GlobalOptions) -> Result<()> {
    let config = Config::load(cwd)?;
    let source =
        fs::read_to_string(&args.script).with_context(|| format!("Cannot read script {}", args.script.display()))?;
    let commands = parse_script(&source)?;

    let clock = ManualClock::new();
    let mut session = open_session(&args.template, &config, cwd, globals, Some(Box::new(clock.clone())))?;

    if session.saved_state_available() {
        if args.restore {
            session.restore_saved_state()?;
            eprintln!("{}", "Restored saved state".green());
        } else {
            eprintln!("{}", "Saved state available (use --restore to start from it)".yellow());
        }
    }

    eprintln!(
        "{} {} ({} commands)",
        "✏️  Editing".bright_blue().bold(),
        args.template.display(),
        commands.len()
    );

    for (index, command) in commands.iter().enumerate() {
        match run_command(&mut session, &clock, command) {
            Ok(message) => eprintln!("  {} {:>3} {}", "✓".green(), index + 1, message),
            Err(e) => eprintln!("  {} {:>3} {}", "✗".red(), index + 1, e.to_string().red()),
        }
        report_notifications(&mut session);
    }

    let output = session.save_as_template(config.compile.clone())?;
    report_notifications(&mut session);
    write_output(args.out.as_deref(), &output)?;

    eprintln!(
        "{} {} history entries",
        "✅".green(),
        session.history().len()
    );
    Ok(())
}
