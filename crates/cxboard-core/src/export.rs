//! Export filtered calls and reports to CSV and JSON files

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analytics::DashboardReport;
use crate::models::{CallRecord, RawCallRecord};

/// Quote a CSV field, doubling embedded quotes
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Export calls to CSV in call-history column order
///
/// CSV columns: Date, Time, Caller, Agent, Duration, Intent, Audio, Transcript
///
/// # Examples
///
/// ```no_run
/// use cxboard_core::export::export_records_to_csv;
/// use cxboard_core::store::RecordStore;
/// use std::path::Path;
///
/// let store = RecordStore::builtin();
/// let records: Vec<_> = store.iter().collect();
/// export_records_to_csv(&records, Path::new("calls.csv")).unwrap();
/// ```
pub fn export_records_to_csv(records: &[&CallRecord], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "Date,Time,Caller,Agent,Duration,Intent,Audio,Transcript"
    )
    .context("Failed to write CSV header")?;

    for record in records {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            record.timestamp.format("%Y-%m-%d"),
            record.timestamp.format("%H:%M"),
            csv_field(&record.caller),
            csv_field(&record.agent),
            record.duration,
            csv_field(record.intent.label()),
            if record.has_audio { "yes" } else { "no" },
            csv_field(&record.transcript),
        )
        .with_context(|| format!("Failed to write row for call {}", record.id))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;

    Ok(())
}

/// Export calls as a JSON array in the record file format
///
/// The output can be fed back through `--records`.
pub fn export_records_to_json(records: &[&CallRecord], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let raw: Vec<RawCallRecord> = records.iter().map(|r| RawCallRecord::from((*r).clone())).collect();
    let json = serde_json::to_string_pretty(&raw).context("Failed to serialize calls to JSON")?;

    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;

    Ok(())
}

/// Export a computed report (selection, range, KPIs, series) as one JSON document
pub fn export_report_to_json(report: &DashboardReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;

    Ok(())
}
