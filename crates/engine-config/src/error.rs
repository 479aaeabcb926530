use model::core::identifiers::IdentifierError;
use thiserror::Error;

/// Errors raised while resolving the transfer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("Missing required variable {0}")]
    Missing(&'static str),

    /// Neither the primary variable nor its fallback is set.
    #[error("Missing required variable {primary} (or {fallback})")]
    MissingEither {
        primary: &'static str,
        fallback: &'static str,
    },

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Invalid table name in {var}: {source}")]
    Table {
        var: &'static str,
        #[source]
        source: IdentifierError,
    },
}
