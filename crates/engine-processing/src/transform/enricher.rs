use crate::clock::Clock;
use model::{
    core::value::Value,
    records::row::{EnrichedRow, SHIFT_SOURCE_COLUMN, SourceRow, column_position},
    shift::shift_date,
};
use std::sync::Arc;

/// Normalizes a source row and appends `TANGGAL_SHIFT`, `DATE_SYNC`, `WB_TAG`
/// and `DELETED`, in that order.
#[derive(Clone)]
pub struct RowEnricher {
    tag: String,
    clock: Arc<dyn Clock>,
    shift_index: Option<usize>,
}

impl RowEnricher {
    /// Resolves the position of `TANGGAL2` once for the whole result set.
    pub fn new(columns: &[String], tag: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let shift_index = column_position(columns, SHIFT_SOURCE_COLUMN);
        Self {
            tag: tag.into(),
            clock,
            shift_index,
        }
    }

    pub fn shift_index(&self) -> Option<usize> {
        self.shift_index
    }

    pub fn enrich(&self, row: SourceRow) -> EnrichedRow {
        let mut values: Vec<Value> = row.into_values().into_iter().map(Value::normalize).collect();

        let shift = self
            .shift_index
            .and_then(|idx| values.get(idx))
            .and_then(Value::as_timestamp)
            .map(shift_date);

        values.reserve(4);
        values.push(shift.map_or(Value::Null, Value::Timestamp));
        values.push(Value::Timestamp(self.clock.now()));
        values.push(Value::String(self.tag.clone()));
        values.push(Value::Int(0));
        EnrichedRow::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn setup(columns: &[&str]) -> (RowEnricher, Arc<[String]>) {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        let clock = Arc::new(FixedClock(ts("2024-05-01 12:00:00")));
        (RowEnricher::new(&columns, "WB-01", clock), columns)
    }

    #[test]
    fn appends_derived_columns_after_source_values() {
        let (enricher, columns) = setup(&["ID", "TANGGAL2", "NO_POLISI"]);
        let row = SourceRow::new(
            columns,
            vec![
                Value::Int(1),
                Value::Timestamp(ts("2024-03-10 03:05:00")),
                Value::Bytes(b"B 1234 XY".to_vec()),
            ],
        );

        let enriched = enricher.enrich(row);
        assert_eq!(
            enriched.values(),
            &[
                Value::Int(1),
                Value::Timestamp(ts("2024-03-10 03:05:00")),
                Value::String("B 1234 XY".into()),
                Value::Timestamp(ts("2024-03-09 00:00:02")),
                Value::Timestamp(ts("2024-05-01 12:00:00")),
                Value::String("WB-01".into()),
                Value::Int(0),
            ]
        );
    }

    #[test]
    fn shift_column_is_matched_case_insensitively() {
        let (enricher, columns) = setup(&["tanggal2"]);
        assert_eq!(enricher.shift_index(), Some(0));

        let row = SourceRow::new(columns, vec![Value::Timestamp(ts("2024-03-10 09:15:00"))]);
        assert_eq!(
            enricher.enrich(row).values()[1],
            Value::Timestamp(ts("2024-03-10 00:00:01"))
        );
    }

    #[test]
    fn exact_shift_column_wins_over_case_variant() {
        let (enricher, _) = setup(&["tanggal2", "TANGGAL2"]);
        assert_eq!(enricher.shift_index(), Some(1));
    }

    #[test]
    fn missing_or_null_shift_source_yields_null() {
        let (enricher, columns) = setup(&["ID"]);
        assert_eq!(enricher.shift_index(), None);
        let enriched = enricher.enrich(SourceRow::new(columns, vec![Value::Int(1)]));
        assert_eq!(enriched.values()[1], Value::Null);
        assert_eq!(enriched.values()[3], Value::String("WB-01".into()));
        assert_eq!(enriched.values()[4], Value::Int(0));

        let (enricher, columns) = setup(&["TANGGAL2"]);
        let enriched = enricher.enrich(SourceRow::new(columns, vec![Value::Null]));
        assert_eq!(enriched.values()[0], Value::Null);
        assert_eq!(enriched.values()[1], Value::Null);
        assert_eq!(enriched.values()[2], Value::Timestamp(ts("2024-05-01 12:00:00")));
    }

    #[test]
    fn textual_shift_source_is_not_guessed() {
        let (enricher, columns) = setup(&["TANGGAL2"]);
        let row = SourceRow::new(columns, vec![Value::Bytes(b"2024-03-10 09:15:00".to_vec())]);
        assert_eq!(enricher.enrich(row).values()[1], Value::Null);
    }
}
