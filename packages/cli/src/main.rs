mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{edit, inspect, save, sync, EditArgs, GlobalOptions, InspectArgs, SaveArgs, SyncArgs};
use std::path::PathBuf;

/// Vellum CLI - edit HTML visual templates from the command line
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory for saved editor state (overrides vellum.config.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show color variables, editable regions and chart/bar bindings
    Inspect(InspectArgs),

    /// Replay an edit script and save the result
    Edit(EditArgs),

    /// Normalize bar spans and print the body markup
    Sync(SyncArgs),

    /// Save as a new standalone template
    Save(SaveArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("VELLUM_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let globals = GlobalOptions { store: cli.store };

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Inspect(args) => inspect(args, &cwd, &globals),
                Command::Edit(args) => edit(args, &cwd, &globals),
                Command::Sync(args) => sync(args, &cwd, &globals),
                Command::Save(args) => save(args, &cwd, &globals),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
