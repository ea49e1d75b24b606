pub mod types;

pub use types::{GradeLine, Report, Status};

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Collect grade lines into a report; overall status is the worst line.
pub fn build(lines: Vec<GradeLine>) -> Report {
    let overall = lines
        .iter()
        .map(|l| l.status)
        .max()
        .unwrap_or(Status::Reviewed);
    Report { lines, overall }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(runs = report.lines.len(), overall = %report.overall))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn print_terminal_report(report: &Report) {
    println!();
    for line in &report.lines {
        println!("═══ {} ═══", line.target);
        println!("Status: {}", colorize_status(line.status));
        println!("  {}", line.detail);
        println!();
    }
    println!("═══ Overall: {} ═══", colorize_status(report.overall));
    println!();
}

/// Markdown with one section per target, including the posted comment.
fn render_markdown(report: &Report) -> String {
    let mut md = String::from("# Grading report\n\n");
    for line in &report.lines {
        md.push_str(&format!("## {}\n\n", line.target));
        md.push_str(&format!("**Status: {}**\n\n{}\n\n", line.status, line.detail));
        if let Some(comment) = &line.comment {
            for quoted in comment.lines() {
                md.push_str(&format!("> {quoted}\n"));
            }
            md.push('\n');
        }
    }
    md.push_str(&format!("## Overall: {}\n", report.overall));
    md
}

fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, render_markdown(report))?;
    Ok(())
}

fn colorize_status(status: Status) -> colored::ColoredString {
    match status {
        Status::Failed => "FAILED".red().bold(),
        Status::Skipped => "SKIPPED".yellow().bold(),
        Status::Reviewed => "REVIEWED".green().bold(),
    }
}
