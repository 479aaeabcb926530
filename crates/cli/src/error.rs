use connectors::sql::base::error::DbError;
use engine_config::error::ConfigError;
use engine_processing::error::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The `.env` file could not be read or parsed.
    #[error("Environment file error: {0}")]
    EnvFile(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to connect to {target}: {source}")]
    Connect {
        target: &'static str,
        #[source]
        source: DbError,
    },

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// SQL Server driver error.
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    #[error("Initial load failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
