//! CLI presentation: text and json formatters per command.

use crate::classifier::ChangeRecord;
use crate::error::SyncError;
use crate::sync::CycleReport;
use crate::types::Snapshot;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use std::path::Path;

fn format_section_heading(title: &str) -> String {
    format!("{}\n{}", title, "-".repeat(title.len()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, SyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn format_snapshot_text(snapshot: &Snapshot, root: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Snapshot of {}", root.display()))
    ));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Directory", "Fingerprint", "Files"]);
    for dir in snapshot.iter() {
        table.add_row(vec![
            dir.path.clone(),
            dir.fingerprint.short(),
            dir.files.len().to_string(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!(
        "  Directories: {}\n  Files: {}",
        snapshot.len(),
        snapshot.file_count()
    ));
    out
}

pub fn format_snapshot_json(snapshot: &Snapshot) -> Result<String, SyncError> {
    to_json(snapshot)
}

pub fn format_changes_text(records: &[ChangeRecord]) -> String {
    if records.is_empty() {
        return "No changes detected".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Change", "Path", "From"]);
    for record in records {
        table.add_row(vec![
            record.kind.label().to_string(),
            record.subject.clone(),
            record.origin.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    format!("{}\n\n  {} change(s)", table, records.len())
}

pub fn format_changes_json(records: &[ChangeRecord]) -> Result<String, SyncError> {
    to_json(&records)
}

/// One-line summary of a finished cycle
pub fn format_cycle_report(report: &CycleReport) -> String {
    if report.baseline_installed {
        return format!(
            "Cycle {}: baseline installed ({} ms)",
            report.cycle, report.duration_ms
        );
    }
    format!(
        "Cycle {}: {} change(s), {} applied, {} skipped, {} failed{} ({} ms)",
        report.cycle,
        report.records.len(),
        report.applied,
        report.skipped,
        report.failed,
        if report.interrupted { ", interrupted" } else { "" },
        report.duration_ms
    )
}
