pub mod edit;
pub mod inspect;
pub mod save;
pub mod script;
pub mod sync;

pub use edit::{edit, EditArgs};
pub use inspect::{inspect, InspectArgs};
pub use save::{save, SaveArgs};
pub use sync::{sync, SyncArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use vellum_editor::{Clock, EditSession, FileStore};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub store: Option<PathBuf>,
}

/// Read a template and open a session on it, attaching the file store
/// when one is configured
pub fn open_session(
    path: &Path,
    config: &Config,
    cwd: &str,
    globals: &GlobalOptions,
    clock: Option<Box<dyn Clock>>,
) -> Result<EditSession> {
    let raw = fs::read_to_string(path).with_context(|| format!("Cannot read template {}", path.display()))?;
    let name = path.display().to_string();
    let mut session = EditSession::open(&name, &raw, config.session.clone());
    if let Some(clock) = clock {
        session = session.with_clock(clock);
    }
    if let Some(dir) = config.get_store_dir(cwd, globals.store.as_ref()) {
        let store = FileStore::open(&dir).with_context(|| format!("Cannot open store {}", dir.display()))?;
        session = session.with_store(Box::new(store));
    }
    Ok(session)
}

/// Print and drain session notifications
pub fn report_notifications(session: &mut EditSession) {
    for note in session.take_notifications() {
        eprintln!("  {} {}", "!".yellow(), note.message);
    }
}

/// Write `content` to `out`, or stdout when no path is given
pub fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))?;
            println!("  {} {}", "✓".green(), path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
