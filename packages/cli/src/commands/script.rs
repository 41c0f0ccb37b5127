//! Edit scripts: a JSON list of session commands replayed in order.
//!
//! ```json
//! [
//!   { "command": "setText", "region": "r0.1", "text": "Q3 revenue" },
//!   { "command": "select", "region": "r0.1" },
//!   { "command": "format", "op": "toggle", "format": "bold" },
//!   { "command": "setColor", "name": "--brand", "value": "#112233" },
//!   { "command": "wait", "ms": 500 }
//! ]
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vellum_editor::{EditSession, FormatOp, ManualClock, NodeId, TextRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ScriptCommand {
    /// Replace a region's text and blur it
    SetText { region: String, text: String },
    /// Select a region's full text
    Select { region: String },
    /// Add or remove a region from the multi-selection
    ToggleRegion { region: String },
    Format(FormatOp),
    SetColor { name: String, value: String },
    /// Let debounced work fire
    Wait { ms: u64 },
    Undo,
    Redo,
    ChartPercentage { percent: f64 },
    /// Progress popover for the n-th bar row
    BarPercentage { bar: usize, percent: f64 },
    /// Select a structural element by child-index path from the body
    SelectElement { path: Vec<usize> },
    Copy,
    Paste,
    Delete,
    Escape,
}

pub fn parse_script(source: &str) -> Result<Vec<ScriptCommand>> {
    Ok(serde_json::from_str(source)?)
}

fn region(session: &EditSession, id: &str) -> Result<NodeId> {
    session
        .bindings()
        .region_by_id(id)
        .map(|region| region.node)
        .ok_or_else(|| anyhow!("Unknown region: {}", id))
}

/// Apply one command. Returns a short description of what happened.
pub fn run_command(session: &mut EditSession, clock: &ManualClock, command: &ScriptCommand) -> Result<String> {
    let message = match command {
        ScriptCommand::SetText { region: id, text } => {
            let node = region(session, id)?;
            session.set_region_text(node, text);
            let recorded = session.blur().map(|r| r.outcome.is_recorded()).unwrap_or(false);
            format!("set text of {} ({})", id, if recorded { "recorded" } else { "unchanged" })
        }
        ScriptCommand::Select { region: id } => {
            let node = region(session, id)?;
            let range = TextRange::covering(session.dom(), node).ok_or_else(|| anyhow!("Region {} has no text", id))?;
            session.set_selection(range);
            format!("selected {}", id)
        }
        ScriptCommand::ToggleRegion { region: id } => {
            let node = region(session, id)?;
            let selected = session.toggle_region(node);
            format!("{} {}", if selected { "added" } else { "removed" }, id)
        }
        ScriptCommand::Format(op) => {
            let outcome = session.apply_format(op);
            format!(
                "format: primary {}, {} region(s)",
                if outcome.primary_applied { "applied" } else { "skipped" },
                outcome.regions_applied
            )
        }
        ScriptCommand::SetColor { name, value } => {
            session.set_color(name, value)?;
            format!("{} = {}", name, value)
        }
        ScriptCommand::Wait { ms } => {
            clock.advance(Duration::from_millis(*ms));
            let fired = session.tick();
            format!("waited {}ms ({} fired)", ms, fired.len())
        }
        ScriptCommand::Undo => format!("undo: {}", session.undo()),
        ScriptCommand::Redo => format!("redo: {}", session.redo()),
        ScriptCommand::ChartPercentage { percent } => {
            let report = session.set_chart_percentage(*percent);
            format!("{} chart(s), {} label(s) at {}%", report.charts, report.labels, percent)
        }
        ScriptCommand::BarPercentage { bar, percent } => {
            let row = session
                .bindings()
                .bars
                .get(*bar)
                .map(|binding| binding.row)
                .ok_or_else(|| anyhow!("No bar #{}", bar))?;
            format!("bar #{}: {}", bar, session.set_bar_percentage(row, *percent))
        }
        ScriptCommand::SelectElement { path } => {
            let node = session
                .dom()
                .node_at_path(path)
                .ok_or_else(|| anyhow!("No element at path {:?}", path))?;
            format!("select element: {}", session.select_element(node))
        }
        ScriptCommand::Copy => format!("copy: {}", session.copy_element()),
        ScriptCommand::Paste => format!("pasted {} node(s)", session.paste_element().len()),
        ScriptCommand::Delete => format!("delete: {}", session.delete_element()),
        ScriptCommand::Escape => {
            session.escape();
            "escape".to_string()
        }
    };
    Ok(message)
}
