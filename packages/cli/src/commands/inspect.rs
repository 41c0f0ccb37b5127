use super::{open_session, GlobalOptions};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use vellum_editor::{BarBinding, ChartBinding, EditableRegion};
use vellum_parser::ColorVariable;
use walkdir::WalkDir;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Template file, or a directory of templates
    pub path: PathBuf,

    /// Print a JSON report instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// What the editor finds in one template
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub file: String,
    pub title: Option<String>,
    pub document_id: String,
    pub color_variables: Vec<ColorVariable>,
    pub regions: Vec<EditableRegion>,
    pub charts: Vec<ChartBinding>,
    pub bars: Vec<BarBinding>,
    pub saved_state: bool,
}

pub fn inspect_file(path: &Path, config: &Config, cwd: &str, globals: &GlobalOptions) -> Result<InspectReport> {
    let session = open_session(path, config, cwd, globals, None)?;
    let bindings = session.bindings().clone();
    Ok(InspectReport {
        file: path.display().to_string(),
        title: session.template().title.clone(),
        document_id: session.document_id().to_string(),
        color_variables: session.template().color_variables.clone(),
        regions: bindings.regions,
        charts: bindings.charts,
        bars: bindings.bars,
        saved_state: session.saved_state_available(),
    })
}

pub fn inspect(args: InspectArgs, cwd: &str, globals: &GlobalOptions) -> Result<()> {
    let config = Config::load(cwd)?;
    let files = find_templates(&args.path)?;
    if files.is_empty() {
        println!("{}", "No templates found".yellow());
        return Ok(());
    }

    let mut reports = Vec::new();
    for file in &files {
        reports.push(inspect_file(file, &config, cwd, globals)?);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        print_summary(report);
    }
    Ok(())
}

fn print_summary(report: &InspectReport) {
    println!(
        "{} {}",
        report.file.bright_blue().bold(),
        report.title.as_deref().unwrap_or("").dimmed()
    );
    println!("  id       {}", report.document_id);
    if report.saved_state {
        println!("  {}", "saved state available".green());
    }

    println!("  colors   {}", report.color_variables.len());
    for variable in &report.color_variables {
        println!("    {} {} ({})", variable.name, variable.default_value, variable.label.dimmed());
    }

    println!("  regions  {}", report.regions.len());
    for region in &report.regions {
        println!("    {} <{}> {:?}", region.id, region.tag, region.kind);
    }

    println!("  charts   {}", report.charts.len());
    for chart in &report.charts {
        match chart.percent {
            Some(percent) => println!("    {}%", percent),
            None => println!("    {}", "unreadable".dimmed()),
        }
    }

    println!("  bars     {}", report.bars.len());
    for (index, bar) in report.bars.iter().enumerate() {
        let percent = bar
            .percent
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    #{} {} (spans {:?}/{:?})",
            index, percent, bar.fill_span, bar.label_span
        );
    }
    println!();
}

/// A single file, or every `.html` file under a directory
pub fn find_templates(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(anyhow!("Path does not exist: {}", path.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let entry_path = entry.path();
        if entry_path.is_file() && entry_path.extension().map(|ext| ext == "html" || ext == "htm").unwrap_or(false) {
            files.push(entry_path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.html"), "<p>b</p>").unwrap();
        fs::write(dir.path().join("nested/a.htm"), "<p>a</p>").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = find_templates(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(find_templates(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_inspect_report() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stats.html");
        fs::write(
            &file,
            r#"<head><title>Stats</title><style>:root { --accent: #0ea5e9; }</style></head>
<body><h2>Usage</h2><div class="grid grid-cols-12"><div class="col-span-6"></div><div class="col-span-6">80%</div></div></body>"#,
        )
        .unwrap();

        let cwd = dir.path().display().to_string();
        let report = inspect_file(&file, &Config::default(), &cwd, &GlobalOptions::default()).unwrap();
        assert_eq!(report.title.as_deref(), Some("Stats"));
        assert_eq!(report.color_variables[0].name, "--accent");
        assert_eq!(report.regions.len(), 1);
        assert_eq!(report.bars.len(), 1);
        // Opening normalizes bars from their labels
        assert_eq!(report.bars[0].fill_span, Some(10));
        assert!(!report.saved_state);
    }
}
