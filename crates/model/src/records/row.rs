use crate::core::value::Value;
use std::sync::Arc;

/// Shift date derived from `TANGGAL2`.
pub const COL_TANGGAL_SHIFT: &str = "TANGGAL_SHIFT";
/// Wall-clock moment the row was processed.
pub const COL_DATE_SYNC: &str = "DATE_SYNC";
/// Run-wide weighbridge tag.
pub const COL_WB_TAG: &str = "WB_TAG";
/// Soft-delete flag.
pub const COL_DELETED: &str = "DELETED";

/// Derived columns appended to every row, in order.
pub const DERIVED_COLUMNS: [&str; 4] = [COL_TANGGAL_SHIFT, COL_DATE_SYNC, COL_WB_TAG, COL_DELETED];

/// Source column the shift date is computed from.
pub const SHIFT_SOURCE_COLUMN: &str = "TANGGAL2";

/// Source columns followed by the derived ones.
pub fn destination_columns(source_columns: &[String]) -> Vec<String> {
    source_columns
        .iter()
        .cloned()
        .chain(DERIVED_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Finds `name` in `columns`, preferring an exact match and falling back to the
/// first match ignoring ASCII case.
pub fn column_position(columns: &[String], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .or_else(|| columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
}

/// One record fetched from the source, values in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl SourceRow {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        SourceRow { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Looks a value up by column name; see [`column_position`].
    pub fn get(&self, column: &str) -> Option<&Value> {
        column_position(&self.columns, column).and_then(|idx| self.values.get(idx))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A normalized source row with the derived columns appended.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    values: Vec<Value>,
}

impl EnrichedRow {
    pub fn new(values: Vec<Value>) -> Self {
        EnrichedRow { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
