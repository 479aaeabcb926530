use crate::sql::{
    base::error::DbError,
    mssql::metadata::{DestColumn, SqlType},
};
use bigdecimal::{BigDecimal, FromPrimitive, RoundingMode, ToPrimitive};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use model::core::value::Value;
use std::{borrow::Cow, str::FromStr};
use tiberius::{
    ColumnData, Uuid,
    numeric::Numeric,
    time::{Date, DateTime, DateTime2, DateTimeOffset, SmallDateTime, Time},
};

const TEXT_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const NANOS_PER_SEC: u64 = 1_000_000_000;
const SECS_PER_DAY: u64 = 86_400;

/// Converts a value into the exact wire representation of `column`.
///
/// Everything that can go wrong while encoding a row is checked here, before
/// anything is written to the bulk stream.
pub fn coerce(value: Value, column: &DestColumn) -> Result<ColumnData<'static>, DbError> {
    if value.is_null() {
        if !column.nullable {
            return Err(fail(column, &value, "column does not allow NULL"));
        }
        return Ok(typed_null(column.sql_type));
    }

    match column.sql_type {
        SqlType::Bit => value
            .as_bool()
            .map(|b| ColumnData::Bit(Some(b)))
            .ok_or_else(|| fail(column, &value, "expected 0/1 or true/false")),
        SqlType::TinyInt => integer::<u8>(&value, column).map(|v| ColumnData::U8(Some(v))),
        SqlType::SmallInt => integer::<i16>(&value, column).map(|v| ColumnData::I16(Some(v))),
        SqlType::Int => integer::<i32>(&value, column).map(|v| ColumnData::I32(Some(v))),
        SqlType::BigInt => integer::<i64>(&value, column).map(|v| ColumnData::I64(Some(v))),
        SqlType::Real => {
            let narrowed = float(&value, column)? as f32;
            if !narrowed.is_finite() {
                return Err(fail(column, &value, "out of range for real"));
            }
            Ok(ColumnData::F32(Some(narrowed)))
        }
        SqlType::Float => float(&value, column).map(|v| ColumnData::F64(Some(v))),
        SqlType::Decimal => decimal(&value, column).map(|n| ColumnData::Numeric(Some(n))),
        SqlType::Char
        | SqlType::VarChar
        | SqlType::Text
        | SqlType::NChar
        | SqlType::NVarChar
        | SqlType::NText => text(value, column).map(|s| ColumnData::String(Some(Cow::Owned(s)))),
        SqlType::Binary | SqlType::VarBinary | SqlType::Image => {
            binary(value, column).map(|b| ColumnData::Binary(Some(Cow::Owned(b))))
        }
        SqlType::Date => {
            let dt = datetime(&value, column)?;
            Ok(ColumnData::Date(Some(date(&value, column, dt.date())?)))
        }
        SqlType::Time => {
            let t = time_of_day(&value, column)?;
            Ok(ColumnData::Time(Some(time(t, column.scale))))
        }
        SqlType::DateTime => {
            let dt = datetime(&value, column)?;
            legacy_datetime(dt)
                .map(|v| ColumnData::DateTime(Some(v)))
                .ok_or_else(|| fail(column, &value, "outside the datetime range 1753-9999"))
        }
        SqlType::SmallDateTime => {
            let dt = datetime(&value, column)?;
            small_datetime(dt)
                .map(|v| ColumnData::SmallDateTime(Some(v)))
                .ok_or_else(|| fail(column, &value, "outside the smalldatetime range 1900-2079"))
        }
        SqlType::DateTime2 => {
            let dt = datetime(&value, column)?;
            datetime2(&value, column, dt).map(|v| ColumnData::DateTime2(Some(v)))
        }
        SqlType::DateTimeOffset => {
            // Naive source timestamps are stored with a zero offset.
            let dt = datetime(&value, column)?;
            datetime2(&value, column, dt)
                .map(|v| ColumnData::DateTimeOffset(Some(DateTimeOffset::new(v, 0))))
        }
        SqlType::UniqueIdentifier => guid(&value, column).map(|g| ColumnData::Guid(Some(g))),
    }
}

fn fail(column: &DestColumn, value: &Value, message: impl Into<String>) -> DbError {
    DbError::coercion(&column.name, &column.to_string(), value.kind(), message)
}

fn typed_null(ty: SqlType) -> ColumnData<'static> {
    match ty {
        SqlType::Bit => ColumnData::Bit(None),
        SqlType::TinyInt => ColumnData::U8(None),
        SqlType::SmallInt => ColumnData::I16(None),
        SqlType::Int => ColumnData::I32(None),
        SqlType::BigInt => ColumnData::I64(None),
        SqlType::Real => ColumnData::F32(None),
        SqlType::Float => ColumnData::F64(None),
        SqlType::Decimal => ColumnData::Numeric(None),
        SqlType::Char
        | SqlType::VarChar
        | SqlType::Text
        | SqlType::NChar
        | SqlType::NVarChar
        | SqlType::NText => ColumnData::String(None),
        SqlType::Binary | SqlType::VarBinary | SqlType::Image => ColumnData::Binary(None),
        SqlType::Date => ColumnData::Date(None),
        SqlType::Time => ColumnData::Time(None),
        SqlType::DateTime => ColumnData::DateTime(None),
        SqlType::SmallDateTime => ColumnData::SmallDateTime(None),
        SqlType::DateTime2 => ColumnData::DateTime2(None),
        SqlType::DateTimeOffset => ColumnData::DateTimeOffset(None),
        SqlType::UniqueIdentifier => ColumnData::Guid(None),
    }
}

fn integer<T: TryFrom<i128>>(value: &Value, column: &DestColumn) -> Result<T, DbError> {
    let wide = value
        .as_i128()
        .ok_or_else(|| fail(column, value, "not an integer"))?;
    T::try_from(wide).map_err(|_| fail(column, value, format!("{wide} is out of range")))
}

fn float(value: &Value, column: &DestColumn) -> Result<f64, DbError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| fail(column, value, "not a finite number"))
}

fn decimal(value: &Value, column: &DestColumn) -> Result<Numeric, DbError> {
    let parsed = match value {
        Value::Int(v) => Some(BigDecimal::from(*v)),
        Value::Uint(v) => Some(BigDecimal::from(*v)),
        Value::Float(v) => BigDecimal::from_f64(*v),
        Value::String(v) => BigDecimal::from_str(v.trim()).ok(),
        _ => None,
    }
    .ok_or_else(|| fail(column, value, "not a decimal number"))?;

    let (digits, _) = parsed
        .with_scale_round(column.scale as i64, RoundingMode::HalfUp)
        .into_bigint_and_exponent();
    let limit = 10u128.pow(column.precision as u32);
    let mantissa = digits
        .to_i128()
        .filter(|m| m.unsigned_abs() < limit)
        .ok_or_else(|| fail(column, value, "does not fit the column precision"))?;

    Ok(Numeric::new_with_scale(mantissa, column.scale))
}

fn text(value: Value, column: &DestColumn) -> Result<String, DbError> {
    let text = value
        .to_text()
        .ok_or_else(|| fail(column, &value, "has no text form"))?;

    if let Some(capacity) = column.capacity() {
        let length = if column.sql_type.is_unicode() {
            text.encode_utf16().count()
        } else {
            text.chars().count()
        };
        if length > capacity {
            return Err(fail(
                column,
                &value,
                format!("{length} characters exceed the column length {capacity}"),
            ));
        }
    }
    Ok(text)
}

fn binary(value: Value, column: &DestColumn) -> Result<Vec<u8>, DbError> {
    let kind = value.kind();
    let bytes = match value {
        Value::Bytes(v) => v,
        Value::String(v) => v.into_bytes(),
        other => return Err(fail(column, &other, "expected binary data")),
    };

    match column.capacity() {
        Some(capacity) if bytes.len() > capacity => Err(DbError::coercion(
            &column.name,
            &column.to_string(),
            kind,
            format!("{} bytes exceed the column length {capacity}", bytes.len()),
        )),
        _ => Ok(bytes),
    }
}

fn guid(value: &Value, column: &DestColumn) -> Result<Uuid, DbError> {
    match value {
        Value::String(v) => Uuid::parse_str(v.trim()).ok(),
        Value::Bytes(v) => Uuid::from_slice(v).ok(),
        _ => None,
    }
    .ok_or_else(|| fail(column, value, "not a valid uniqueidentifier"))
}

fn datetime(value: &Value, column: &DestColumn) -> Result<NaiveDateTime, DbError> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::String(v) => parse_datetime(v.trim()),
        _ => None,
    }
    .ok_or_else(|| fail(column, value, "not a date/time"))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    TEXT_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn time_of_day(value: &Value, column: &DestColumn) -> Result<NaiveTime, DbError> {
    match value {
        Value::Timestamp(ts) => Some(ts.time()),
        Value::String(v) => NaiveTime::parse_from_str(v.trim(), "%H:%M:%S%.f")
            .ok()
            .or_else(|| parse_datetime(v.trim()).map(|dt| dt.time())),
        _ => None,
    }
    .ok_or_else(|| fail(column, value, "not a time of day"))
}

fn nanos_of_day(t: NaiveTime) -> u64 {
    // Leap-second representations are clamped into the last second.
    t.num_seconds_from_midnight() as u64 * NANOS_PER_SEC + t.nanosecond().min(999_999_999) as u64
}

fn date(value: &Value, column: &DestColumn, d: NaiveDate) -> Result<Date, DbError> {
    u32::try_from(d.num_days_from_ce() - 1)
        .map(Date::new)
        .map_err(|_| fail(column, value, "before year 1"))
}

/// `scale` is the number of fractional second digits, 0 to 7.
fn time(t: NaiveTime, scale: u8) -> Time {
    let scale = scale.min(7);
    let divisor = 10u64.pow(9 - scale as u32);
    Time::new(nanos_of_day(t) / divisor, scale)
}

fn datetime2(value: &Value, column: &DestColumn, dt: NaiveDateTime) -> Result<DateTime2, DbError> {
    Ok(DateTime2::new(
        date(value, column, dt.date())?,
        time(dt.time(), column.scale),
    ))
}

fn days_since_1900(d: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    (d - epoch).num_days()
}

/// `datetime` counts days since 1900-01-01 and 1/300 second ticks.
fn legacy_datetime(dt: NaiveDateTime) -> Option<DateTime> {
    if !(1753..=9999).contains(&dt.year()) {
        return None;
    }
    let ticks_per_day = 300 * SECS_PER_DAY;
    let mut days = days_since_1900(dt.date());
    let mut ticks = (nanos_of_day(dt.time()) * 3 + 5_000_000) / 10_000_000;
    if ticks >= ticks_per_day {
        days += 1;
        ticks -= ticks_per_day;
    }
    if dt.year() == 9999 && days > days_since_1900(NaiveDate::from_ymd_opt(9999, 12, 31)?) {
        return None;
    }
    Some(DateTime::new(i32::try_from(days).ok()?, ticks as u32))
}

/// `smalldatetime` has minute precision; seconds round half up.
fn small_datetime(dt: NaiveDateTime) -> Option<SmallDateTime> {
    let mut days = days_since_1900(dt.date());
    let mut minutes = (dt.time().num_seconds_from_midnight() as i64 + 30) / 60;
    if minutes >= 1440 {
        days += 1;
        minutes -= 1440;
    }
    let last_day = days_since_1900(NaiveDate::from_ymd_opt(2079, 6, 6)?);
    if days < 0 || days > last_day {
        return None;
    }
    Some(SmallDateTime::new(days as u16, minutes as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::mssql::metadata::tests::column;

    fn ts(s: &str) -> Value {
        Value::Timestamp(NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap())
    }

    fn decimal_column(precision: u8, scale: u8) -> DestColumn {
        DestColumn {
            precision,
            scale,
            ..column("BERAT", "decimal", 9)
        }
    }

    #[test]
    fn nulls_are_typed_after_the_column() {
        assert!(matches!(
            coerce(Value::Null, &column("N", "int", 4)),
            Ok(ColumnData::I32(None))
        ));
        assert!(matches!(
            coerce(Value::Null, &column("N", "datetime2", 8)),
            Ok(ColumnData::DateTime2(None))
        ));
        assert!(matches!(
            coerce(Value::Null, &column("N", "nvarchar", 40)),
            Ok(ColumnData::String(None))
        ));
    }

    #[test]
    fn null_into_not_null_column_is_row_level() {
        let col = DestColumn {
            nullable: false,
            ..column("NO_POLISI", "varchar", 10)
        };
        let err = coerce(Value::Null, &col).unwrap_err();
        assert!(err.is_row_level());
        assert!(err.to_string().contains("NO_POLISI"));
    }

    #[test]
    fn integers_are_range_checked() {
        assert!(matches!(
            coerce(Value::Uint(255), &column("A", "tinyint", 1)),
            Ok(ColumnData::U8(Some(255)))
        ));
        assert!(matches!(
            coerce(Value::String(" -12 ".into()), &column("A", "smallint", 2)),
            Ok(ColumnData::I16(Some(-12)))
        ));
        assert!(coerce(Value::Int(-1), &column("A", "tinyint", 1)).is_err());
        assert!(coerce(Value::Int(i64::MAX), &column("A", "int", 4)).is_err());
        assert!(coerce(Value::String("abc".into()), &column("A", "bigint", 8)).is_err());
        assert!(matches!(
            coerce(Value::Int(0), &column("DELETED", "bit", 1)),
            Ok(ColumnData::Bit(Some(false)))
        ));
    }

    #[test]
    fn floats_convert() {
        assert!(matches!(
            coerce(Value::String("12.5".into()), &column("A", "float", 8)),
            Ok(ColumnData::F64(Some(v))) if v == 12.5
        ));
        assert!(matches!(
            coerce(Value::Int(3), &column("A", "real", 4)),
            Ok(ColumnData::F32(Some(v))) if v == 3.0
        ));
        assert!(coerce(Value::Float(f64::MAX), &column("A", "real", 4)).is_err());
    }

    #[test]
    fn decimals_round_to_scale() {
        let col = decimal_column(10, 2);
        match coerce(Value::String("12345.678".into()), &col) {
            Ok(ColumnData::Numeric(Some(n))) => {
                assert_eq!(n.value(), 1_234_568);
                assert_eq!(n.scale(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        match coerce(Value::Int(-7), &col) {
            Ok(ColumnData::Numeric(Some(n))) => assert_eq!(n.value(), -700),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decimals_overflowing_precision_fail() {
        let col = decimal_column(5, 2);
        assert!(coerce(Value::String("999.99".into()), &col).is_ok());
        assert!(coerce(Value::String("1000.00".into()), &col).is_err());
        assert!(coerce(Value::String("n/a".into()), &col).is_err());
    }

    #[test]
    fn text_respects_column_length() {
        let col = column("NO_POLISI", "varchar", 5);
        assert!(matches!(
            coerce(Value::String("B1234".into()), &col),
            Ok(ColumnData::String(Some(ref s))) if s == "B1234"
        ));
        let err = coerce(Value::String("B12345".into()), &col).unwrap_err();
        assert!(err.is_row_level());

        // nvarchar(2) stores two UTF-16 units.
        let col = column("K", "nvarchar", 4);
        assert!(coerce(Value::String("éé".into()), &col).is_ok());
        assert!(coerce(Value::String("😀😀".into()), &col).is_err());
        assert!(coerce(Value::String("x".repeat(10_000)), &column("K", "nvarchar", -1)).is_ok());
    }

    #[test]
    fn non_text_values_render_into_char_columns() {
        let col = column("CATATAN", "varchar", 50);
        assert!(matches!(
            coerce(Value::Int(42), &col),
            Ok(ColumnData::String(Some(ref s))) if s == "42"
        ));
        assert!(matches!(
            coerce(ts("2024-01-02 03:04:05"), &col),
            Ok(ColumnData::String(Some(ref s))) if s == "2024-01-02 03:04:05"
        ));
    }

    #[test]
    fn binary_accepts_bytes_and_text() {
        let col = column("FOTO", "varbinary", 4);
        assert!(matches!(
            coerce(Value::Bytes(vec![1, 2, 3]), &col),
            Ok(ColumnData::Binary(Some(ref b))) if b.as_ref() == [1, 2, 3]
        ));
        assert!(coerce(Value::String("abcde".into()), &col).is_err());
        assert!(coerce(Value::Int(1), &col).is_err());
    }

    #[test]
    fn datetime2_keeps_fraction_at_column_scale() {
        let col = DestColumn {
            scale: 7,
            ..column("TANGGAL2", "datetime2", 8)
        };
        match coerce(ts("2024-03-10 07:15:00.25"), &col) {
            Ok(ColumnData::DateTime2(Some(v))) => {
                let expected_days = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().num_days_from_ce() - 1;
                assert_eq!(v.date().days(), expected_days as u32);
                assert_eq!(v.time().increments(), (7 * 3600 + 15 * 60) * 10_000_000 + 2_500_000);
                assert_eq!(v.time().scale(), 7);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_dates_are_parsed() {
        let col = column("TANGGAL", "date", 3);
        match coerce(Value::String("0001-01-02".into()), &col) {
            Ok(ColumnData::Date(Some(d))) => assert_eq!(d.days(), 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(coerce(Value::String("yesterday".into()), &col).is_err());
    }

    #[test]
    fn legacy_datetime_uses_1900_epoch_and_ticks() {
        let col = column("TANGGAL2", "datetime", 8);
        match coerce(ts("1900-01-02 00:00:01"), &col) {
            Ok(ColumnData::DateTime(Some(v))) => {
                assert_eq!(v.days(), 1);
                assert_eq!(v.seconds_fragments(), 300);
            }
            other => panic!("unexpected {other:?}"),
        }
        match coerce(ts("2000-01-01 23:59:59.999"), &col) {
            Ok(ColumnData::DateTime(Some(v))) => {
                assert_eq!(v.days(), 36_525);
                assert_eq!(v.seconds_fragments(), 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(coerce(ts("1600-01-01 00:00:00"), &col).is_err());
    }

    #[test]
    fn smalldatetime_rounds_to_minutes() {
        let col = column("TANGGAL2", "smalldatetime", 4);
        match coerce(ts("1900-01-01 10:00:30"), &col) {
            Ok(ColumnData::SmallDateTime(Some(v))) => {
                assert_eq!(v.days(), 0);
                assert_eq!(v.seconds_fragments(), 601);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(coerce(ts("2080-01-01 00:00:00"), &col).is_err());
    }

    #[test]
    fn time_from_text() {
        let col = DestColumn {
            scale: 0,
            ..column("JAM", "time", 3)
        };
        match coerce(Value::String("08:30:15".into()), &col) {
            Ok(ColumnData::Time(Some(t))) => assert_eq!(t.increments(), 8 * 3600 + 30 * 60 + 15),
            other => panic!("unexpected {other:?}"),
        }
        assert!(coerce(Value::String("26:00:00".into()), &col).is_err());
    }

    #[test]
    fn guids_parse_from_text() {
        let col = column("ROWGUID", "uniqueidentifier", 16);
        assert!(matches!(
            coerce(Value::String("67e55044-10b1-426f-9247-bb680e5fe0c8".into()), &col),
            Ok(ColumnData::Guid(Some(_)))
        ));
        assert!(coerce(Value::String("not-a-guid".into()), &col).is_err());
    }
}
