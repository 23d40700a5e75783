use anyhow::Result;
use serde::Serialize;
use stringref_core::services::{PlainRenderer, ScanSummary};

use super::util::{run_search, ReferenceRow, SearchArgs};

#[derive(Debug, Serialize)]
struct ScanReport {
    summary: Option<ScanSummary>,
    total: usize,
    references: Vec<ReferenceRow>,
}

/// Scan the given module dumps and print the visible string references.
pub fn scan_command(args: &SearchArgs, raw: bool, json: bool) -> Result<()> {
    let (_, service) = run_search(args)?;
    let renderer = PlainRenderer;
    let rows: Vec<ReferenceRow> =
        service.visible().map(|reference| ReferenceRow::new(reference, &renderer)).collect();
    let total = service.index().len();

    if json {
        let report = ScanReport { summary: service.last_summary(), total, references: rows };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("String references ({} shown, {} total):", rows.len(), total);
    if rows.is_empty() {
        println!("(none)");
    }
    for row in &rows {
        let text = if raw { &row.literal } else { &row.formatted };
        println!("- {} {}", text, row.location());
    }
    if let Some(summary) = service.last_summary() {
        if summary.methods_skipped > 0 {
            println!("Skipped {} malformed method bodies", summary.methods_skipped);
        }
    }

    Ok(())
}
