use crate::error::CliError;
use engine_processing::report::{TransferOutcome, TransferReport, format_duration};
use serde::Serialize;
use std::path::Path;
use tracing::info;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_report(report: &TransferReport, path: &Path) -> Result<(), CliError> {
    let report_json = to_json(report)?;
    tokio::fs::write(path, report_json).await?;
    info!("Run report written to {}", path.display());
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", to_json(value)?);
    Ok(())
}

/// One-line human summary of a run.
pub fn summary_line(report: &TransferReport) -> String {
    match report.outcome {
        TransferOutcome::Cancelled { existing_rows } => format!(
            "Cancelled: {} already has {} rows, nothing copied",
            report.destination_table, existing_rows
        ),
        TransferOutcome::Completed => format!(
            "Copied {} rows from {} to {} ({} skipped) in {}",
            report.rows_written,
            report.source_table,
            report.destination_table,
            report.rows_skipped,
            format_duration(report.duration())
        ),
    }
}
