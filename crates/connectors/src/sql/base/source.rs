use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::{core::identifiers::TableName, records::row::SourceRow};

/// A relational table that can be read once from start to end.
#[async_trait]
pub trait RowSource: Send {
    fn table(&self) -> &TableName;

    /// Runs `SELECT *` on the bound table and returns a forward-only cursor.
    async fn open<'a>(&'a mut self) -> Result<Box<dyn RowCursor + 'a>, DbError>;
}

/// Lazily pulls rows from an open result set. Not restartable.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names in result-set order, known as soon as the cursor is open.
    fn columns(&self) -> &[String];

    /// Fetches the next row.
    ///
    /// `Ok(None)` marks the end of the result set. Errors for which
    /// [`DbError::is_row_level`] holds only affect the row that was just read;
    /// the cursor can keep going after them.
    async fn next_row(&mut self) -> Result<Option<SourceRow>, DbError>;

    /// Releases the result set. Remaining rows are discarded.
    async fn close(self: Box<Self>) -> Result<(), DbError>;
}
