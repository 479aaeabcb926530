use crate::sql::{base::error::DbError, mssql::params::MssqlClient};
use model::records::row::column_position;
use std::fmt;

const INSERTABLE_COLUMNS_SQL: &str = "\
SELECT c.name, t.name, CAST(c.max_length AS INT), CAST(c.precision AS INT), \
CAST(c.scale AS INT), c.is_nullable \
FROM sys.columns c \
JOIN sys.types t ON t.user_type_id = c.system_type_id \
WHERE c.object_id = OBJECT_ID(@P1) \
AND c.is_identity = 0 AND c.is_computed = 0 AND t.name <> 'timestamp' \
ORDER BY c.column_id";

/// Destination column types the bulk channel knows how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    Char,
    VarChar,
    Text,
    NChar,
    NVarChar,
    NText,
    Binary,
    VarBinary,
    Image,
    Date,
    Time,
    DateTime,
    SmallDateTime,
    DateTime2,
    DateTimeOffset,
    UniqueIdentifier,
}

impl SqlType {
    pub fn from_type_name(name: &str) -> Option<SqlType> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "bit" => SqlType::Bit,
            "tinyint" => SqlType::TinyInt,
            "smallint" => SqlType::SmallInt,
            "int" => SqlType::Int,
            "bigint" => SqlType::BigInt,
            "real" => SqlType::Real,
            "float" => SqlType::Float,
            "decimal" | "numeric" => SqlType::Decimal,
            "char" => SqlType::Char,
            "varchar" => SqlType::VarChar,
            "text" => SqlType::Text,
            "nchar" => SqlType::NChar,
            "nvarchar" | "sysname" => SqlType::NVarChar,
            "ntext" => SqlType::NText,
            "binary" => SqlType::Binary,
            "varbinary" => SqlType::VarBinary,
            "image" => SqlType::Image,
            "date" => SqlType::Date,
            "time" => SqlType::Time,
            "datetime" => SqlType::DateTime,
            "smalldatetime" => SqlType::SmallDateTime,
            "datetime2" => SqlType::DateTime2,
            "datetimeoffset" => SqlType::DateTimeOffset,
            "uniqueidentifier" => SqlType::UniqueIdentifier,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_unicode(self) -> bool {
        matches!(self, SqlType::NChar | SqlType::NVarChar | SqlType::NText)
    }
}

/// An insertable column of the destination table.
#[derive(Debug, Clone, PartialEq)]
pub struct DestColumn {
    pub name: String,
    pub type_name: String,
    pub sql_type: SqlType,
    /// Storage size in bytes, `-1` for `(max)` types.
    pub max_length: i32,
    pub precision: u8,
    pub scale: u8,
    pub nullable: bool,
}

impl DestColumn {
    /// Maximum number of characters (or bytes for binary types) the column
    /// accepts, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match self.sql_type {
            SqlType::Text | SqlType::NText | SqlType::Image => None,
            _ if self.max_length < 0 => None,
            ty if ty.is_unicode() => Some(self.max_length as usize / 2),
            _ => Some(self.max_length as usize),
        }
    }
}

impl fmt::Display for DestColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sql_type {
            SqlType::Decimal => write!(f, "{}({},{})", self.type_name, self.precision, self.scale),
            SqlType::Char
            | SqlType::VarChar
            | SqlType::NChar
            | SqlType::NVarChar
            | SqlType::Binary
            | SqlType::VarBinary => match self.capacity() {
                Some(len) => write!(f, "{}({})", self.type_name, len),
                None => write!(f, "{}(max)", self.type_name),
            },
            SqlType::Time | SqlType::DateTime2 | SqlType::DateTimeOffset => {
                write!(f, "{}({})", self.type_name, self.scale)
            }
            _ => f.write_str(&self.type_name),
        }
    }
}

/// Reads the columns a bulk insert into `quoted_table` will expect, in table order.
pub async fn insertable_columns(
    client: &mut MssqlClient,
    quoted_table: &str,
) -> Result<Vec<DestColumn>, DbError> {
    let rows = client
        .query(INSERTABLE_COLUMNS_SQL, &[&quoted_table])
        .await?
        .into_first_result()
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name = row.try_get::<&str, _>(0)?.unwrap_or_default().to_string();
        let type_name = row.try_get::<&str, _>(1)?.unwrap_or_default().to_string();
        let sql_type = SqlType::from_type_name(&type_name).ok_or_else(|| {
            DbError::Schema(format!(
                "column '{name}' of {quoted_table} has unsupported type '{type_name}'"
            ))
        })?;

        columns.push(DestColumn {
            name,
            type_name,
            sql_type,
            max_length: row.try_get::<i32, _>(2)?.unwrap_or(-1),
            precision: row.try_get::<i32, _>(3)?.unwrap_or(0).clamp(0, 38) as u8,
            scale: row.try_get::<i32, _>(4)?.unwrap_or(0).clamp(0, 38) as u8,
            nullable: row.try_get::<bool, _>(5)?.unwrap_or(true),
        });
    }

    if columns.is_empty() {
        return Err(DbError::Schema(format!(
            "table {quoted_table} does not exist or has no insertable columns"
        )));
    }
    Ok(columns)
}

/// Maps the rows handed to the channel onto the destination's column order.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    columns: Vec<DestColumn>,
    /// For every destination column, the position of its value in the
    /// incoming row, or `None` when the column is left NULL.
    sources: Vec<Option<usize>>,
    width: usize,
}

impl ColumnPlan {
    /// Fails when `row_columns` names a column the destination does not have,
    /// or leaves a NOT NULL column without a value. Bulk copy sends every
    /// column, so column defaults never apply to unfilled ones.
    pub fn new(columns: Vec<DestColumn>, row_columns: &[String]) -> Result<Self, DbError> {
        let missing: Vec<&str> = row_columns
            .iter()
            .filter(|name| !columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(DbError::Schema(format!(
                "destination table has no column(s): {}",
                missing.join(", ")
            )));
        }

        let sources: Vec<Option<usize>> = columns
            .iter()
            .map(|c| column_position(row_columns, &c.name))
            .collect();

        let unfillable: Vec<&str> = columns
            .iter()
            .zip(&sources)
            .filter(|(c, src)| src.is_none() && !c.nullable)
            .map(|(c, _)| c.name.as_str())
            .collect();
        if !unfillable.is_empty() {
            return Err(DbError::Schema(format!(
                "NOT NULL destination column(s) missing from the source: {}",
                unfillable.join(", ")
            )));
        }

        Ok(Self {
            columns,
            sources,
            width: row_columns.len(),
        })
    }

    pub fn columns(&self) -> &[DestColumn] {
        &self.columns
    }

    /// Number of values every incoming row must carry.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DestColumn, Option<usize>)> {
        self.columns.iter().zip(self.sources.iter().copied())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn column(name: &str, type_name: &str, max_length: i32) -> DestColumn {
        DestColumn {
            name: name.to_string(),
            type_name: type_name.to_string(),
            sql_type: SqlType::from_type_name(type_name).unwrap(),
            max_length,
            precision: 0,
            scale: 0,
            nullable: true,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_type_names() {
        assert_eq!(SqlType::from_type_name("NVARCHAR"), Some(SqlType::NVarChar));
        assert_eq!(SqlType::from_type_name("numeric"), Some(SqlType::Decimal));
        assert_eq!(SqlType::from_type_name("xml"), None);
        assert_eq!(SqlType::from_type_name("money"), None);
    }

    #[test]
    fn capacity_accounts_for_unicode_and_max() {
        assert_eq!(column("a", "nvarchar", 100).capacity(), Some(50));
        assert_eq!(column("a", "varchar", 100).capacity(), Some(100));
        assert_eq!(column("a", "varbinary", -1).capacity(), None);
        assert_eq!(column("a", "ntext", 16).capacity(), None);
        assert_eq!(column("a", "nvarchar", -1).to_string(), "nvarchar(max)");
        assert_eq!(column("a", "char", 10).to_string(), "char(10)");
    }

    #[test]
    fn plan_follows_table_order_and_fills_gaps() {
        let table = vec![
            column("ID_TIMBANG", "varchar", 20),
            column("CATATAN", "varchar", 50),
            column("tanggal2", "datetime", 8),
            column("WB_TAG", "varchar", 20),
        ];
        let plan = ColumnPlan::new(table, &names(&["TANGGAL2", "ID_TIMBANG", "WB_TAG"])).unwrap();

        let mapped: Vec<(&str, Option<usize>)> =
            plan.iter().map(|(c, src)| (c.name.as_str(), src)).collect();
        assert_eq!(
            mapped,
            vec![
                ("ID_TIMBANG", Some(1)),
                ("CATATAN", None),
                ("tanggal2", Some(0)),
                ("WB_TAG", Some(2)),
            ]
        );
        assert_eq!(plan.width(), 3);
    }

    #[test]
    fn plan_rejects_unfilled_not_null_columns() {
        let mut created_by = column("CREATED_BY", "varchar", 20);
        created_by.nullable = false;
        let table = vec![column("ID", "int", 4), created_by];

        let err = ColumnPlan::new(table, &names(&["ID"])).unwrap_err();
        assert!(matches!(err, DbError::Schema(ref m) if m.contains("CREATED_BY")));
        assert!(!err.is_row_level());
    }

    #[test]
    fn plan_prefers_exact_column_name() {
        let table = vec![column("TANGGAL2", "datetime", 8), column("tanggal2", "datetime", 8)];
        let plan = ColumnPlan::new(table, &names(&["tanggal2", "TANGGAL2"])).unwrap();
        let mapped: Vec<Option<usize>> = plan.iter().map(|(_, src)| src).collect();
        assert_eq!(mapped, vec![Some(1), Some(0)]);
    }

    #[test]
    fn plan_rejects_unknown_columns() {
        let table = vec![column("ID_TIMBANG", "varchar", 20)];
        let err = ColumnPlan::new(table, &names(&["ID_TIMBANG", "DELETED", "WB_TAG"])).unwrap_err();
        assert!(matches!(err, DbError::Schema(ref m) if m.contains("DELETED, WB_TAG")));
    }
}
