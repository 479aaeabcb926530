use crate::metrics::MetricsSnapshot;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Every readable row was offered to the destination and committed.
    Completed,
    /// The destination already held rows, so nothing was read or written.
    Cancelled { existing_rows: u64 },
}

/// What a single run did, suitable for logging and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub source_table: String,
    pub destination_table: String,
    pub wb_tag: String,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    /// Wall time rounded to whole seconds.
    pub duration_secs: u64,
}

impl TransferReport {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        source_table: String,
        destination_table: String,
        wb_tag: String,
        outcome: TransferOutcome,
        counts: MetricsSnapshot,
        started_at: NaiveDateTime,
        finished_at: NaiveDateTime,
        elapsed: Duration,
    ) -> Self {
        Self {
            source_table,
            destination_table,
            wb_tag,
            outcome,
            rows_read: counts.rows_read,
            rows_written: counts.rows_written,
            rows_skipped: counts.rows_skipped,
            started_at,
            finished_at,
            duration_secs: elapsed.as_secs_f64().round() as u64,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Cancelled { .. })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Renders a duration as `1h2m3s`, dropping leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m{seconds}s"),
        _ => format!("{hours}h{minutes}m{seconds}s"),
    }
}
