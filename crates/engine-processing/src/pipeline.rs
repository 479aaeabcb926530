use crate::{
    clock::{Clock, SystemClock},
    error::TransferError,
    metrics::Metrics,
    report::{TransferOutcome, TransferReport, format_duration},
    transform::enricher::RowEnricher,
};
use connectors::sql::base::{
    destination::BulkSink,
    source::{RowCursor, RowSource},
};
use model::records::row::{COL_TANGGAL_SHIFT, SHIFT_SOURCE_COLUMN, destination_columns};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Stored in `WB_TAG` on every row.
    pub wb_tag: String,
    /// A progress line is logged every this many written rows. Zero disables it.
    pub progress_interval: u64,
}

impl TransferSettings {
    pub fn new(wb_tag: impl Into<String>) -> Self {
        Self {
            wb_tag: wb_tag.into(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, rows: u64) -> Self {
        self.progress_interval = rows;
        self
    }
}

/// Copies a whole source table into an empty destination table in one
/// transaction, enriching every row on the way.
///
/// Rows that cannot be decoded or written are logged and skipped. Anything
/// else after the transaction has begun rolls it back and aborts the run.
pub struct BulkTransferPipeline {
    settings: TransferSettings,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl BulkTransferPipeline {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            settings,
            clock: Arc::new(SystemClock),
            metrics: Metrics::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn run(
        &self,
        source: &mut dyn RowSource,
        sink: &mut dyn BulkSink,
    ) -> Result<TransferReport, TransferError> {
        self.metrics.reset();
        let started_at = self.clock.now();
        let timer = Instant::now();
        let source_table = source.table().to_string();
        let dest_table = sink.table().to_string();

        info!(
            source = %source_table,
            destination = %dest_table,
            tag = %self.settings.wb_tag,
            "Starting initial load"
        );

        let existing = sink
            .row_count()
            .await
            .map_err(|err| TransferError::Precondition {
                table: dest_table.clone(),
                source: err,
            })?;

        let outcome = if existing > 0 {
            warn!(
                "Destination table {} already contains {} rows. Initial load cancelled.",
                dest_table, existing
            );
            TransferOutcome::Cancelled {
                existing_rows: existing,
            }
        } else {
            info!("Destination table {} is empty", dest_table);
            self.load(source, sink, &source_table, &dest_table).await?;
            TransferOutcome::Completed
        };

        let report = TransferReport::new(
            source_table,
            dest_table,
            self.settings.wb_tag.clone(),
            outcome,
            self.metrics.snapshot(),
            started_at,
            self.clock.now(),
            timer.elapsed(),
        );

        if !report.is_cancelled() {
            info!(
                "Completed. Rows copied: {}, skipped: {}, start: {}, end: {}, duration: {}",
                report.rows_written,
                report.rows_skipped,
                report.started_at.format(LOG_TIME_FORMAT),
                report.finished_at.format(LOG_TIME_FORMAT),
                format_duration(report.duration())
            );
        }
        Ok(report)
    }

    async fn load(
        &self,
        source: &mut dyn RowSource,
        sink: &mut dyn BulkSink,
        source_table: &str,
        dest_table: &str,
    ) -> Result<(), TransferError> {
        let cursor = source
            .open()
            .await
            .map_err(|err| TransferError::OpenSource {
                table: source_table.to_string(),
                source: err,
            })?;

        let columns = cursor.columns().to_vec();
        debug!("Source columns: {}", columns.join(", "));
        let enricher = RowEnricher::new(&columns, self.settings.wb_tag.clone(), self.clock.clone());
        if enricher.shift_index().is_none() {
            warn!(
                "Source table {} has no {} column, {} will be NULL",
                source_table, SHIFT_SOURCE_COLUMN, COL_TANGGAL_SHIFT
            );
        }
        let dest_columns = destination_columns(&columns);

        sink.begin().await.map_err(|err| TransferError::Begin {
            table: dest_table.to_string(),
            source: err,
        })?;

        if let Err(err) = self
            .copy(cursor, sink, &dest_columns, &enricher, source_table, dest_table)
            .await
        {
            self.rollback(sink, dest_table).await;
            return Err(err);
        }

        if let Err(err) = sink.commit().await {
            self.rollback(sink, dest_table).await;
            return Err(TransferError::Commit {
                table: dest_table.to_string(),
                source: err,
            });
        }
        Ok(())
    }

    /// Streams every row through the bulk channel and finalizes it. The cursor
    /// is released whether or not that succeeded; the transaction is left for
    /// the caller.
    async fn copy(
        &self,
        mut cursor: Box<dyn RowCursor + '_>,
        sink: &mut dyn BulkSink,
        columns: &[String],
        enricher: &RowEnricher,
        source_table: &str,
        dest_table: &str,
    ) -> Result<(), TransferError> {
        let result = self
            .stream(cursor.as_mut(), sink, columns, enricher, source_table, dest_table)
            .await;

        if let Err(err) = cursor.close().await {
            warn!("Failed to close source cursor on {}: {}", source_table, err);
        }
        result
    }

    async fn stream(
        &self,
        cursor: &mut dyn RowCursor,
        sink: &mut dyn BulkSink,
        columns: &[String],
        enricher: &RowEnricher,
        source_table: &str,
        dest_table: &str,
    ) -> Result<(), TransferError> {
        let mut channel = sink
            .open_channel(columns)
            .await
            .map_err(|err| TransferError::PrepareChannel {
                table: dest_table.to_string(),
                source: err,
            })?;
        info!("Copying rows from {} to {}", source_table, dest_table);

        loop {
            let row = match cursor.next_row().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) if err.is_row_level() => {
                    self.metrics.increment_read(1);
                    self.metrics.increment_skipped(1);
                    warn!("Skipping unreadable row: {}", err);
                    continue;
                }
                Err(err) => {
                    return Err(TransferError::Fetch {
                        table: source_table.to_string(),
                        rows_read: self.metrics.snapshot().rows_read,
                        source: err,
                    });
                }
            };
            self.metrics.increment_read(1);

            match channel.send(enricher.enrich(row)).await {
                Ok(()) => {
                    let written = self.metrics.increment_written(1);
                    let every = self.settings.progress_interval;
                    if every > 0 && written % every == 0 {
                        info!("Progress: {} rows...", written);
                    }
                }
                Err(err) => {
                    self.metrics.increment_skipped(1);
                    warn!(
                        "Skipping row {}: {}",
                        self.metrics.snapshot().rows_read,
                        err
                    );
                }
            }
        }

        let loaded = channel
            .finalize()
            .await
            .map_err(|err| TransferError::Finalize {
                table: dest_table.to_string(),
                source: err,
            })?;
        debug!("Bulk insert into {} finalized with {} rows", dest_table, loaded);
        Ok(())
    }

    async fn rollback(&self, sink: &mut dyn BulkSink, dest_table: &str) {
        match sink.rollback().await {
            Ok(()) => warn!("Transaction on {} rolled back", dest_table),
            Err(err) => error!("Rollback on {} failed: {}", dest_table, err),
        }
    }
}
