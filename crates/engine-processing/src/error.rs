use connectors::sql::base::error::DbError;
use thiserror::Error;

/// Failures that abort a transfer. Row-level problems never end up here.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to count rows in destination table '{table}': {source}")]
    Precondition {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to query source table '{table}': {source}")]
    OpenSource {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to begin transaction on '{table}': {source}")]
    Begin {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to prepare bulk insert into '{table}': {source}")]
    PrepareChannel {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Lost the source cursor on '{table}' after {rows_read} rows: {source}")]
    Fetch {
        table: String,
        rows_read: u64,
        #[source]
        source: DbError,
    },

    #[error("Failed to finalize bulk insert into '{table}': {source}")]
    Finalize {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to commit transaction on '{table}': {source}")]
    Commit {
        table: String,
        #[source]
        source: DbError,
    },
}
