use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Table name is empty")]
    Empty,

    #[error("Table name '{0}' contains an empty part")]
    EmptyPart(String),

    #[error("Table name '{name}' contains a forbidden character {ch:?}")]
    ForbiddenChar { name: String, ch: char },

    #[error("Table name '{0}' has more than three parts")]
    TooManyParts(String),
}

/// A possibly schema-qualified table name such as `timbang` or `dbo.timbang`.
///
/// Parts are kept unquoted; connectors render them with their own quoting rules.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableName(Arc<[String]>);

impl TableName {
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// The last part, without any schema prefix.
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl FromStr for TableName {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let mut parts = Vec::new();
        for raw in trimmed.split('.') {
            // Accept already bracketed or backticked parts and strip the quoting.
            let part = raw
                .trim()
                .trim_start_matches(['[', '`'])
                .trim_end_matches([']', '`']);

            if part.is_empty() {
                return Err(IdentifierError::EmptyPart(trimmed.to_string()));
            }

            if let Some(ch) = part
                .chars()
                .find(|c| matches!(c, '[' | ']' | '`' | '"' | '\'' | ';') || c.is_control())
            {
                return Err(IdentifierError::ForbiddenChar {
                    name: trimmed.to_string(),
                    ch,
                });
            }

            parts.push(part.to_string());
        }

        if parts.len() > 3 {
            return Err(IdentifierError::TooManyParts(trimmed.to_string()));
        }

        Ok(TableName(Arc::from(parts)))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl Serialize for TableName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_qualified_names() {
        let plain: TableName = "timbang".parse().unwrap();
        assert_eq!(plain.parts(), ["timbang"]);

        let qualified: TableName = "dbo.DATA_TIMBANG".parse().unwrap();
        assert_eq!(qualified.parts(), ["dbo", "DATA_TIMBANG"]);
        assert_eq!(qualified.name(), "DATA_TIMBANG");
        assert_eq!(qualified.to_string(), "dbo.DATA_TIMBANG");
    }

    #[test]
    fn strips_existing_quoting() {
        let name: TableName = "[dbo].[timbang]".parse().unwrap();
        assert_eq!(name.parts(), ["dbo", "timbang"]);

        let ticked: TableName = "`timbang`".parse().unwrap();
        assert_eq!(ticked.to_string(), "timbang");
    }

    #[test]
    fn rejects_injection_attempts() {
        let err = "timbang; DROP TABLE x".parse::<TableName>().unwrap_err();
        assert!(matches!(err, IdentifierError::ForbiddenChar { ch: ';', .. }));
    }

    #[test]
    fn rejects_empty_parts() {
        assert_eq!("".parse::<TableName>().unwrap_err(), IdentifierError::Empty);
        assert!(matches!(
            "dbo..t".parse::<TableName>().unwrap_err(),
            IdentifierError::EmptyPart(_)
        ));
        assert!(matches!(
            "a.b.c.d".parse::<TableName>().unwrap_err(),
            IdentifierError::TooManyParts(_)
        ));
    }
}
