use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::{core::identifiers::TableName, records::row::EnrichedRow};

/// A table that accepts one transactional bulk load.
///
/// The expected call order is `row_count`, `begin`, `open_channel`,
/// [`BulkChannel::finalize`], then `commit`. `rollback` is valid at any point
/// after `begin`.
#[async_trait]
pub trait BulkSink: Send {
    fn table(&self) -> &TableName;

    async fn row_count(&mut self) -> Result<u64, DbError>;

    async fn begin(&mut self) -> Result<(), DbError>;

    /// Prepares a bulk insert for rows laid out as `columns`.
    ///
    /// The channel borrows the sink, so the transaction cannot be committed
    /// before the channel has been finalized or dropped.
    async fn open_channel<'a>(
        &'a mut self,
        columns: &[String],
    ) -> Result<Box<dyn BulkChannel + 'a>, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;
}

/// Streaming write path for a single bulk insert.
#[async_trait]
pub trait BulkChannel: Send {
    /// Buffers one row. A row-level error leaves the channel usable.
    async fn send(&mut self, row: EnrichedRow) -> Result<(), DbError>;

    /// Flushes what is buffered and closes the channel, returning the number
    /// of rows the server reports as loaded.
    async fn finalize(self: Box<Self>) -> Result<u64, DbError>;
}
