use crate::sql::base::error::DbError;
use chrono::NaiveDate;
use model::core::value::Value;
use mysql_async::{Row as MySqlRow, Value as MySqlValue};

/// Turns a binary-protocol row into model values, one per column.
///
/// Text, decimal and JSON columns come back as [`Value::Bytes`]; turning them
/// into strings happens later during enrichment.
pub(crate) fn decode_row(row: MySqlRow, columns: &[String]) -> Result<Vec<Value>, DbError> {
    let raw = row.unwrap_raw();
    if raw.len() != columns.len() {
        return Err(DbError::RowDecode(format!(
            "expected {} columns, got {}",
            columns.len(),
            raw.len()
        )));
    }

    raw.into_iter()
        .zip(columns)
        .map(|(cell, column)| {
            let cell = cell.ok_or_else(|| {
                DbError::RowDecode(format!("column '{column}' was already taken from the row"))
            })?;
            decode_value(cell)
                .map_err(|reason| DbError::RowDecode(format!("column '{column}': {reason}")))
        })
        .collect()
}

pub(crate) fn decode_value(value: MySqlValue) -> Result<Value, String> {
    match value {
        MySqlValue::NULL => Ok(Value::Null),
        MySqlValue::Int(v) => Ok(Value::Int(v)),
        MySqlValue::UInt(v) => Ok(Value::Uint(v)),
        MySqlValue::Float(v) => Ok(Value::Float(v as f64)),
        MySqlValue::Double(v) => Ok(Value::Float(v)),
        MySqlValue::Bytes(v) => Ok(Value::Bytes(v)),
        MySqlValue::Date(0, 0, 0, _, _, _, _) => Ok(Value::Null),
        MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .and_then(|date| {
                    date.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
                })
                .map(Value::Timestamp)
                .ok_or_else(|| {
                    format!(
                        "invalid date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                    )
                })
        }
        MySqlValue::Time(negative, days, hours, minutes, seconds, micros) => Ok(Value::String(
            format_duration(negative, days, hours, minutes, seconds, micros),
        )),
    }
}

/// Renders a MySQL `TIME` the way MySQL itself prints it: `[-]HH:MM:SS[.ffffff]`.
/// Hours may exceed 24.
fn format_duration(
    negative: bool,
    days: u32,
    hours: u8,
    minutes: u8,
    seconds: u8,
    micros: u32,
) -> String {
    let sign = if negative { "-" } else { "" };
    let hours = days as u64 * 24 + hours as u64;
    let mut out = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
    if micros > 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode_value(MySqlValue::NULL), Ok(Value::Null));
        assert_eq!(decode_value(MySqlValue::Int(-7)), Ok(Value::Int(-7)));
        assert_eq!(decode_value(MySqlValue::UInt(7)), Ok(Value::Uint(7)));
        assert_eq!(decode_value(MySqlValue::Double(1.25)), Ok(Value::Float(1.25)));
        assert_eq!(decode_value(MySqlValue::Float(0.5)), Ok(Value::Float(0.5)));
        assert_eq!(
            decode_value(MySqlValue::Bytes(b"TRUK-01".to_vec())),
            Ok(Value::Bytes(b"TRUK-01".to_vec()))
        );
    }

    #[test]
    fn decodes_datetimes_with_micros() {
        assert_eq!(
            decode_value(MySqlValue::Date(2024, 3, 10, 7, 15, 0, 250_000)),
            Ok(Value::Timestamp(ts("2024-03-10 07:15:00.25")))
        );
        assert_eq!(
            decode_value(MySqlValue::Date(2024, 3, 10, 0, 0, 0, 0)),
            Ok(Value::Timestamp(ts("2024-03-10 00:00:00")))
        );
    }

    #[test]
    fn zero_date_is_null() {
        assert_eq!(decode_value(MySqlValue::Date(0, 0, 0, 0, 0, 0, 0)), Ok(Value::Null));
    }

    #[test]
    fn impossible_date_is_rejected() {
        let err = decode_value(MySqlValue::Date(2023, 2, 30, 0, 0, 0, 0)).unwrap_err();
        assert!(err.contains("2023-02-30"));
    }

    #[test]
    fn time_becomes_text() {
        assert_eq!(
            decode_value(MySqlValue::Time(false, 0, 8, 30, 0, 0)),
            Ok(Value::String("08:30:00".into()))
        );
        assert_eq!(
            decode_value(MySqlValue::Time(true, 1, 2, 3, 4, 5)),
            Ok(Value::String("-26:03:04.000005".into()))
        );
    }
}
