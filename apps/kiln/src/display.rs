//! Output rendering and formatting

use crate::error::CliError;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::style;
use kiln_errors::UserFacingError;
use kiln_executor::ExecutionReport;
use kiln_formula::Formula;
use serde_json::json;
use std::io;
use std::path::Path;

fn print_json(value: &serde_json::Value) -> io::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(io::Error::other)?
    );
    Ok(())
}

/// Render a finished install
pub fn render_install(report: &ExecutionReport, prefix: &Path, json: bool) -> Result<(), CliError> {
    if json {
        print_json(&json!({
            "success": true,
            "name": report.name,
            "prefix": prefix.display().to_string(),
            "steps_run": report.steps_run,
            "work_dir": report.work_dir_kept.then(|| report.work_dir.display().to_string()),
        }))?;
        return Ok(());
    }

    println!(
        "{} {} installed to {} ({} step{})",
        style("[OK]").green().bold(),
        style(&report.name).cyan().bold(),
        prefix.display(),
        report.steps_run,
        if report.steps_run == 1 { "" } else { "s" }
    );
    if report.work_dir_kept {
        println!("Working directory kept at {}", report.work_dir.display());
    }
    Ok(())
}

/// Render a parsed formula
pub fn render_formula(formula: &Formula, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(formula)?);
        return Ok(());
    }

    println!("{}", style(&formula.name).cyan().bold());
    println!();
    println!("Source:      {} ({})", formula.source.uri, formula.source.method);
    if let Some(reference) = &formula.source.reference {
        println!("Ref:         {reference}");
    }
    if let Some(sha256) = &formula.source.sha256 {
        println!("SHA256:      {sha256}");
    }
    println!("Prefix var:  {}", formula.prefix_variable);
    if formula.deparallelize {
        println!("Parallelism: serial");
    }

    let overrides: Vec<String> = formula
        .effective_overrides()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    if !overrides.is_empty() {
        println!("Environment: {}", overrides.join(" "));
    }
    println!();

    if formula.steps.is_empty() {
        println!("No build steps.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Command").add_attribute(Attribute::Bold),
    ]);
    for (index, step) in formula.steps.iter().enumerate() {
        table.add_row(vec![Cell::new(index + 1), Cell::new(step)]);
    }
    println!("{table}");
    Ok(())
}

/// Render environment variables as `NAME=VALUE` lines
pub fn render_env(vars: &[(&str, &str)], json: bool) -> Result<(), CliError> {
    if json {
        let map: serde_json::Map<String, serde_json::Value> = vars
            .iter()
            .map(|(name, value)| ((*name).to_string(), json!(value)))
            .collect();
        print_json(&serde_json::Value::Object(map))?;
        return Ok(());
    }

    for (name, value) in vars {
        println!("{name}={value}");
    }
    Ok(())
}

/// Report an error; JSON mode writes a structured object to stdout
pub fn render_error(err: &CliError, json: bool) {
    if json {
        let body = match err {
            CliError::Kiln(e) => json!({
                "success": false,
                "phase": e.phase(),
                "code": e.user_code(),
                "message": e.user_message(),
                "hint": e.user_hint(),
                "retryable": e.is_retryable(),
            }),
            CliError::Io(e) => json!({
                "success": false,
                "phase": "setup",
                "message": e.to_string(),
            }),
        };
        println!("{body}");
    } else {
        eprintln!("{} {err}", style("Error:").red().bold());
    }
}
