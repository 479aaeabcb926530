use thiserror::Error;

/// All errors coming from the database layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low-level I/O failure, typically while opening a socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// SQL Server (TDS) driver error.
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// A single fetched row could not be turned into values.
    #[error("Failed to decode row: {0}")]
    RowDecode(String),

    /// A value does not fit the destination column it is written to.
    #[error("Cannot write {value_kind} into column '{column}' ({sql_type}): {message}")]
    Coercion {
        column: String,
        sql_type: String,
        value_kind: &'static str,
        message: String,
    },

    /// The row handed to the bulk channel has the wrong shape.
    #[error("Row has {actual} values but the bulk channel expects {expected}")]
    RowShape { expected: usize, actual: usize },

    /// Source and destination schemas do not line up.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DbError {
    /// Whether the error only concerns one row and the transfer can move on.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            DbError::RowDecode(_) | DbError::Coercion { .. } | DbError::RowShape { .. }
        )
    }

    pub(crate) fn coercion(
        column: &str,
        sql_type: &str,
        value_kind: &'static str,
        message: impl Into<String>,
    ) -> Self {
        DbError::Coercion {
            column: column.to_string(),
            sql_type: sql_type.to_string(),
            value_kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_row_scoped_errors_are_recoverable() {
        assert!(DbError::RowDecode("bad date".into()).is_row_level());
        assert!(DbError::coercion("BERAT", "int", "text", "not a number").is_row_level());
        assert!(
            DbError::RowShape {
                expected: 3,
                actual: 2
            }
            .is_row_level()
        );
        assert!(!DbError::Schema("missing column".into()).is_row_level());
        assert!(!DbError::Unknown("connection reset".into()).is_row_level());
    }

    #[test]
    fn coercion_message_names_the_column() {
        let err = DbError::coercion("BERAT", "int", "text", "not a number");
        assert_eq!(
            err.to_string(),
            "Cannot write text into column 'BERAT' (int): not a number"
        );
    }
}
