//! Parameter coercion and binding.
//!
//! PostgreSQL's extended protocol sends each parameter in binary form, and the
//! server reads it with the type it inferred for the placeholder. A value must
//! therefore be bound as exactly that type: an `i64` sent to an `INT4` slot is
//! rejected as malformed. Before binding, each caller value is coerced to the
//! category of its placeholder's type. A value that does not parse or does
//! not fit is a validation error, as is a type the gateway cannot encode.

use super::types::TypeCategory;
use crate::models::SqlValue;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::postgres::types::PgInterval;
use sqlx::types::Json;
use sqlx::types::ipnetwork::IpNetwork;
use std::str::FromStr;
use uuid::Uuid;

/// A value ready to be bound, typed for its placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundValue {
    /// NULL typed after the placeholder so the server accepts it.
    Null(TypeCategory),
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Numeric(BigDecimal),
    Json(JsonValue),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Time(NaiveTime),
    Interval(PgInterval),
    Network(IpNetwork),
    Bytes(Vec<u8>),
    Text(String),
}

/// Coerce a caller value to the category of its placeholder.
///
/// The error is a short reason; the caller adds the parameter position and
/// type name.
pub(crate) fn coerce(value: &SqlValue, target: TypeCategory) -> Result<BoundValue, String> {
    use TypeCategory as C;

    if value.is_null() {
        return Ok(BoundValue::Null(target));
    }

    match target {
        C::Int2 => {
            let v = integer(value)?;
            i16::try_from(v)
                .map(BoundValue::Int2)
                .map_err(|_| out_of_range(v))
        }
        C::Int4 => {
            let v = integer(value)?;
            i32::try_from(v)
                .map(BoundValue::Int4)
                .map_err(|_| out_of_range(v))
        }
        C::Int8 => integer(value).map(BoundValue::Int8),
        C::Float4 => {
            let v = float(value)?;
            let narrowed = v as f32;
            if v.is_finite() && !narrowed.is_finite() {
                return Err(out_of_range(v));
            }
            Ok(BoundValue::Float4(narrowed))
        }
        C::Float8 => float(value).map(BoundValue::Float8),
        C::Numeric => numeric(value).map(BoundValue::Numeric),
        C::Boolean => match value {
            SqlValue::Bool(v) => Ok(BoundValue::Bool(*v)),
            SqlValue::Text(s) => parse_bool(s.trim())
                .map(BoundValue::Bool)
                .ok_or_else(|| format!("'{}' is not a boolean", s)),
            other => Err(mismatch(other, "a boolean")),
        },
        C::Text | C::Enum => Ok(BoundValue::Text(value.to_string())),
        C::Json => Ok(BoundValue::Json(json(value))),
        C::Uuid => parse_text(value, "a UUID", |s| Uuid::parse_str(s).ok()).map(BoundValue::Uuid),
        C::Date => parse_text(value, "a date", |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        })
        .map(BoundValue::Date),
        C::Timestamp => {
            parse_text(value, "a timestamp", parse_timestamp).map(BoundValue::Timestamp)
        }
        C::TimestampTz => {
            parse_text(value, "a timestamp", parse_timestamptz).map(BoundValue::TimestampTz)
        }
        C::Time => parse_text(value, "a time", parse_time).map(BoundValue::Time),
        C::Interval => {
            parse_text(value, "an interval", parse_interval).map(BoundValue::Interval)
        }
        C::Inet | C::Cidr => parse_text(value, "a network address", |s| {
            IpNetwork::from_str(s).ok()
        })
        .map(BoundValue::Network),
        C::Binary => match value {
            SqlValue::Text(s) => Ok(BoundValue::Bytes(s.as_bytes().to_vec())),
            other => Err(mismatch(other, "a string")),
        },
        C::Array => Err("array values are not supported".to_string()),
        C::Unknown => Err("values of this type are not supported".to_string()),
    }
}

fn mismatch(value: &SqlValue, expected: &str) -> String {
    format!("expected {}, got {}", expected, value.type_name())
}

fn out_of_range(v: impl std::fmt::Display) -> String {
    format!("{} is out of range", v)
}

fn integer(value: &SqlValue) -> Result<i64, String> {
    match value {
        SqlValue::Int(v) => Ok(*v),
        SqlValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(*v as i64),
        SqlValue::Float(v) => Err(format!("{} is not an integer", v)),
        SqlValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not an integer", s)),
        other => Err(mismatch(other, "an integer")),
    }
}

fn float(value: &SqlValue) -> Result<f64, String> {
    match value {
        SqlValue::Int(v) => Ok(*v as f64),
        SqlValue::Float(v) => Ok(*v),
        SqlValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s)),
        other => Err(mismatch(other, "a number")),
    }
}

fn numeric(value: &SqlValue) -> Result<BigDecimal, String> {
    match value {
        SqlValue::Int(v) => Ok(BigDecimal::from(*v)),
        SqlValue::Float(v) => {
            BigDecimal::from_str(&v.to_string()).map_err(|_| format!("{} is not a decimal", v))
        }
        SqlValue::Text(s) => {
            BigDecimal::from_str(s.trim()).map_err(|_| format!("'{}' is not a decimal", s))
        }
        other => Err(mismatch(other, "a decimal")),
    }
}

fn json(value: &SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Bool(v) => JsonValue::Bool(*v),
        SqlValue::Int(v) => JsonValue::from(*v),
        SqlValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        SqlValue::Text(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| JsonValue::String(s.clone()))
        }
    }
}

/// Parse a string value; other value kinds are rejected.
fn parse_text<T>(
    value: &SqlValue,
    expected: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, String> {
    match value {
        SqlValue::Text(s) => parse(s.trim()).ok_or_else(|| format!("'{}' is not {}", s, expected)),
        other => Err(mismatch(other, expected)),
    }
}

/// PostgreSQL's accepted boolean spellings.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_timestamptz(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_timestamp(s).map(|naive| naive.and_utc()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Parse PostgreSQL's verbose interval syntax: `<n> <unit>` pairs, an
/// optional `[-]HH:MM[:SS[.f]]` clock, and an optional trailing `ago`.
fn parse_interval(s: &str) -> Option<PgInterval> {
    let mut interval = PgInterval::default();
    let mut tokens = s.split_whitespace().peekable();
    let mut seen = false;
    let mut ago = false;

    while let Some(token) = tokens.next() {
        if token.eq_ignore_ascii_case("ago") {
            if tokens.peek().is_some() {
                return None;
            }
            ago = true;
            continue;
        }
        seen = true;
        if token.contains(':') {
            interval.microseconds = interval.microseconds.checked_add(parse_clock(token)?)?;
            continue;
        }

        let amount: f64 = token.parse().ok()?;
        let unit_name = tokens.next()?.to_ascii_lowercase();
        let unit = match unit_name.as_str() {
            "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => "millisecond",
            other => other.trim_end_matches('s'),
        };
        match unit {
            "year" | "y" => interval.months = add_whole(interval.months, amount, 12)?,
            "mon" | "month" => interval.months = add_whole(interval.months, amount, 1)?,
            "week" | "w" => interval.days = add_whole(interval.days, amount, 7)?,
            "day" | "d" => interval.days = add_whole(interval.days, amount, 1)?,
            _ => {
                let seconds = match unit {
                    "hour" | "h" => 3600.0,
                    "min" | "minute" | "m" => 60.0,
                    "sec" | "second" | "" => 1.0,
                    "millisecond" => 0.001,
                    _ => return None,
                };
                interval.microseconds = add_micros(interval.microseconds, amount, seconds)?;
            }
        }
    }

    if !seen {
        return None;
    }
    if ago {
        interval.months = interval.months.checked_neg()?;
        interval.days = interval.days.checked_neg()?;
        interval.microseconds = interval.microseconds.checked_neg()?;
    }
    Some(interval)
}

fn add_whole(current: i32, amount: f64, factor: i32) -> Option<i32> {
    if amount.fract() != 0.0 || amount.abs() > i32::MAX as f64 {
        return None;
    }
    current.checked_add((amount as i32).checked_mul(factor)?)
}

fn add_micros(current: i64, amount: f64, seconds_per_unit: f64) -> Option<i64> {
    let micros = (amount * seconds_per_unit * MICROS_PER_SECOND).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    current.checked_add(micros as i64)
}

/// `[-]HH:MM[:SS[.f]]` as microseconds.
fn parse_clock(token: &str) -> Option<i64> {
    let (negative, clock) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let mut parts = clock.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: f64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0.0,
    };
    if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let seconds = f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds;
    let total = add_micros(0, seconds, 1.0)?;
    Some(if negative { -total } else { total })
}

/// Bind a coerced value to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: BoundValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        BoundValue::Null(category) => bind_typed_null(query, category),
        BoundValue::Bool(v) => query.bind(v),
        BoundValue::Int2(v) => query.bind(v),
        BoundValue::Int4(v) => query.bind(v),
        BoundValue::Int8(v) => query.bind(v),
        BoundValue::Float4(v) => query.bind(v),
        BoundValue::Float8(v) => query.bind(v),
        BoundValue::Numeric(v) => query.bind(v),
        BoundValue::Json(v) => query.bind(Json(v)),
        BoundValue::Uuid(v) => query.bind(v),
        BoundValue::Date(v) => query.bind(v),
        BoundValue::Timestamp(v) => query.bind(v),
        BoundValue::TimestampTz(v) => query.bind(v),
        BoundValue::Time(v) => query.bind(v),
        BoundValue::Interval(v) => query.bind(v),
        BoundValue::Network(v) => query.bind(v),
        BoundValue::Bytes(v) => query.bind(v),
        BoundValue::Text(v) => query.bind(v),
    }
}

fn bind_typed_null<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    category: TypeCategory,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    use TypeCategory as C;

    match category {
        C::Int2 => query.bind(None::<i16>),
        C::Int4 => query.bind(None::<i32>),
        C::Int8 => query.bind(None::<i64>),
        C::Float4 => query.bind(None::<f32>),
        C::Float8 => query.bind(None::<f64>),
        C::Numeric => query.bind(None::<BigDecimal>),
        C::Boolean => query.bind(None::<bool>),
        C::Json => query.bind(None::<Json<JsonValue>>),
        C::Uuid => query.bind(None::<Uuid>),
        C::Date => query.bind(None::<NaiveDate>),
        C::Timestamp => query.bind(None::<NaiveDateTime>),
        C::TimestampTz => query.bind(None::<DateTime<Utc>>),
        C::Time => query.bind(None::<NaiveTime>),
        C::Interval => query.bind(None::<PgInterval>),
        C::Inet | C::Cidr => query.bind(None::<IpNetwork>),
        C::Binary => query.bind(None::<Vec<u8>>),
        C::Text | C::Enum | C::Array | C::Unknown => query.bind(None::<String>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SqlValue {
        SqlValue::from(s)
    }

    #[test]
    fn test_string_to_integer_uses_placeholder_width() {
        assert_eq!(coerce(&text("5"), TypeCategory::Int4), Ok(BoundValue::Int4(5)));
        assert_eq!(coerce(&text(" 42 "), TypeCategory::Int2), Ok(BoundValue::Int2(42)));
        assert_eq!(coerce(&text("7"), TypeCategory::Int8), Ok(BoundValue::Int8(7)));
    }

    #[test]
    fn test_number_to_integer_uses_placeholder_width() {
        assert_eq!(coerce(&SqlValue::Int(6), TypeCategory::Int4), Ok(BoundValue::Int4(6)));
        assert_eq!(coerce(&SqlValue::Int(6), TypeCategory::Int2), Ok(BoundValue::Int2(6)));
        assert_eq!(
            coerce(&SqlValue::Float(3.0), TypeCategory::Int4),
            Ok(BoundValue::Int4(3))
        );
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = coerce(&SqlValue::Int(40_000), TypeCategory::Int2).unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        assert!(coerce(&text("3000000000"), TypeCategory::Int4).is_err());
        assert!(coerce(&SqlValue::Int(3_000_000_000), TypeCategory::Int8).is_ok());
    }

    #[test]
    fn test_fractional_float_is_not_an_integer() {
        assert!(coerce(&SqlValue::Float(3.5), TypeCategory::Int4).is_err());
    }

    #[test]
    fn test_unparseable_string_is_rejected() {
        let err = coerce(&text("five"), TypeCategory::Int4).unwrap_err();
        assert_eq!(err, "'five' is not an integer");
    }

    #[test]
    fn test_float_widths() {
        assert_eq!(coerce(&text("1.5"), TypeCategory::Float4), Ok(BoundValue::Float4(1.5)));
        assert_eq!(coerce(&SqlValue::Int(2), TypeCategory::Float8), Ok(BoundValue::Float8(2.0)));
        assert!(coerce(&SqlValue::Float(1e300), TypeCategory::Float4).is_err());
    }

    #[test]
    fn test_string_to_numeric_keeps_precision() {
        assert_eq!(
            coerce(&text("12.3400"), TypeCategory::Numeric),
            Ok(BoundValue::Numeric(BigDecimal::from_str("12.3400").unwrap()))
        );
    }

    #[test]
    fn test_string_to_bool() {
        assert_eq!(coerce(&text("t"), TypeCategory::Boolean), Ok(BoundValue::Bool(true)));
        assert_eq!(coerce(&text("OFF"), TypeCategory::Boolean), Ok(BoundValue::Bool(false)));
        assert!(coerce(&SqlValue::Int(1), TypeCategory::Boolean).is_err());
    }

    #[test]
    fn test_bool_to_integer_names_both_kinds() {
        let err = coerce(&SqlValue::Bool(true), TypeCategory::Int4).unwrap_err();
        assert_eq!(err, "expected an integer, got bool");
    }

    #[test]
    fn test_string_to_json() {
        assert_eq!(
            coerce(&text("{\"a\":1}"), TypeCategory::Json),
            Ok(BoundValue::Json(serde_json::json!({"a": 1})))
        );
        assert_eq!(
            coerce(&text("plain"), TypeCategory::Json),
            Ok(BoundValue::Json(JsonValue::String("plain".into())))
        );
    }

    #[test]
    fn test_string_to_temporal() {
        assert!(matches!(
            coerce(&text("2024-02-29"), TypeCategory::Date),
            Ok(BoundValue::Date(_))
        ));
        assert!(matches!(
            coerce(&text("2024-02-29 10:30:00"), TypeCategory::Timestamp),
            Ok(BoundValue::Timestamp(_))
        ));
        assert!(matches!(
            coerce(&text("2024-02-29T10:30:00+02:00"), TypeCategory::TimestampTz),
            Ok(BoundValue::TimestampTz(_))
        ));
        assert!(matches!(
            coerce(&text("10:30"), TypeCategory::Time),
            Ok(BoundValue::Time(_))
        ));
        assert!(coerce(&text("yesterday-ish"), TypeCategory::Date).is_err());
    }

    #[test]
    fn test_string_to_uuid() {
        assert!(matches!(
            coerce(
                &text("67e55044-10b1-426f-9247-bb680e5fe0c8"),
                TypeCategory::Uuid
            ),
            Ok(BoundValue::Uuid(_))
        ));
    }

    #[test]
    fn test_string_to_network() {
        assert_eq!(
            coerce(&text("10.0.0.1"), TypeCategory::Inet),
            Ok(BoundValue::Network("10.0.0.1/32".parse().unwrap()))
        );
        assert!(matches!(
            coerce(&text("192.168.0.0/16"), TypeCategory::Cidr),
            Ok(BoundValue::Network(_))
        ));
        assert!(coerce(&text("not-an-ip"), TypeCategory::Inet).is_err());
    }

    #[test]
    fn test_string_to_interval() {
        assert_eq!(
            coerce(&text("1 day"), TypeCategory::Interval),
            Ok(BoundValue::Interval(PgInterval {
                months: 0,
                days: 1,
                microseconds: 0
            }))
        );
        assert_eq!(
            parse_interval("1 year 2 mons 3 days 04:05:06.5"),
            Some(PgInterval {
                months: 14,
                days: 3,
                microseconds: 14_706_500_000
            })
        );
        assert_eq!(
            parse_interval("90 minutes"),
            Some(PgInterval {
                months: 0,
                days: 0,
                microseconds: 5_400_000_000
            })
        );
        assert_eq!(
            parse_interval("2 weeks ago"),
            Some(PgInterval {
                months: 0,
                days: -14,
                microseconds: 0
            })
        );
        assert_eq!(
            parse_interval("250 ms"),
            Some(PgInterval {
                months: 0,
                days: 0,
                microseconds: 250_000
            })
        );
        assert_eq!(parse_interval(""), None);
        assert_eq!(parse_interval("1.5 days"), None);
        assert_eq!(parse_interval("3 fortnights"), None);
    }

    #[test]
    fn test_number_to_text_column() {
        assert_eq!(
            coerce(&SqlValue::Int(7), TypeCategory::Text),
            Ok(BoundValue::Text("7".into()))
        );
    }

    #[test]
    fn test_enum_travels_as_label() {
        assert_eq!(
            coerce(&text("happy"), TypeCategory::Enum),
            Ok(BoundValue::Text("happy".into()))
        );
    }

    #[test]
    fn test_null_takes_placeholder_type() {
        assert_eq!(
            coerce(&SqlValue::Null, TypeCategory::Int4),
            Ok(BoundValue::Null(TypeCategory::Int4))
        );
        assert_eq!(
            coerce(&SqlValue::Null, TypeCategory::Unknown),
            Ok(BoundValue::Null(TypeCategory::Unknown))
        );
    }

    #[test]
    fn test_unsupported_targets_are_rejected() {
        assert!(coerce(&text("{1,2}"), TypeCategory::Array).is_err());
        assert!(coerce(&text("'a' & 'b'"), TypeCategory::Unknown).is_err());
    }
}
