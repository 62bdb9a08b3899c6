//! Text and JSON rendering for CLI results.

use anyhow::Result;
use clap::ValueEnum;
use reclaimx_core::{ReportRow, Resource, Summary};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct SummaryEntry {
    resource: Resource,
    #[serde(flatten)]
    summary: Summary,
    resolution_rate: Option<f64>,
}

pub fn print_reports(rows: &[ReportRow], format: Format) -> Result<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No reports available yet.");
        return Ok(());
    }

    println!(
        "{:<15} {:<16} {:<14} {:<20} {:<9} {}",
        "ID", "REPORTER", "RESOURCE", "LOCATION", "STATUS", "CREATED"
    );
    for row in rows {
        let report = &row.report;
        let reporter = row.reporter_name.as_deref().unwrap_or(&report.reporter_phone);
        println!(
            "{:<15} {:<16} {:<14} {:<20} {:<9} {}",
            report.id,
            truncate(reporter, 16),
            report.resource,
            truncate(&report.location, 20),
            report.status,
            report.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn print_summary(dashboard: &[(Resource, Summary)], format: Format) -> Result<()> {
    if format == Format::Json {
        let entries: Vec<SummaryEntry> = dashboard
            .iter()
            .map(|(resource, summary)| SummaryEntry {
                resource: *resource,
                summary: *summary,
                resolution_rate: summary.resolution_rate(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (resource, summary) in dashboard {
        if summary.is_empty() {
            println!("{resource}: no data");
            continue;
        }
        let rate = summary.resolution_rate().unwrap_or(0.0) * 100.0;
        println!(
            "{resource}: reported {}, resolved {}, pending {} ({rate:.1}% resolved)",
            summary.total, summary.resolved, summary.pending
        );
    }
    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}
