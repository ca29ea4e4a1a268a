//! PostgreSQL type mappings.
//!
//! Column values are decoded in two phases:
//! 1. `categorize` classifies the server's type into a `TypeCategory`
//! 2. a category-specific decoder extracts the value as JSON
//!
//! The same classification drives parameter coercion in `db::params`, so
//! categories are as wide as the wire format: `INT4` and `INT8` differ.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgHasArrayType, PgRow, PgTypeInfo, PgTypeKind, Postgres};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};
use uuid::Uuid;

/// Logical category for PostgreSQL column and parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Boolean,
    Text,
    /// User-defined enum; travels as its label.
    Enum,
    Binary,
    Json,
    Uuid,
    Date,
    Timestamp,
    TimestampTz,
    Time,
    Interval,
    Inet,
    Cidr,
    Array,
    Unknown,
}

/// Classify a PostgreSQL type name (as reported by the driver) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_ascii_uppercase();
    if upper.ends_with("[]") {
        return TypeCategory::Array;
    }
    match upper.as_str() {
        "INT2" | "SMALLINT" => TypeCategory::Int2,
        "INT4" | "INT" | "INTEGER" => TypeCategory::Int4,
        "INT8" | "BIGINT" => TypeCategory::Int8,
        "FLOAT4" | "REAL" => TypeCategory::Float4,
        "FLOAT8" | "DOUBLE PRECISION" => TypeCategory::Float8,
        "NUMERIC" | "DECIMAL" => TypeCategory::Numeric,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" | "CHARACTER VARYING"
        | "CHARACTER" => TypeCategory::Text,
        "BYTEA" => TypeCategory::Binary,
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "DATE" => TypeCategory::Date,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "TIMESTAMPTZ" => TypeCategory::TimestampTz,
        "TIME" => TypeCategory::Time,
        "INTERVAL" => TypeCategory::Interval,
        "INET" => TypeCategory::Inet,
        "CIDR" => TypeCategory::Cidr,
        _ => TypeCategory::Unknown,
    }
}

/// Classify a resolved type, using its kind for enums and arrays.
pub fn categorize(info: &PgTypeInfo) -> TypeCategory {
    match info.kind() {
        PgTypeKind::Enum(_) => TypeCategory::Enum,
        PgTypeKind::Array(_) => TypeCategory::Array,
        _ => categorize_type(info.name()),
    }
}

/// Render an interval the way PostgreSQL's default `IntervalStyle` does,
/// e.g. `1 year 2 mons 3 days 04:05:06`.
pub fn format_interval(interval: &PgInterval) -> String {
    fn unit(n: i32, singular: &str, plural: &str) -> String {
        format!("{} {}", n, if n == 1 { singular } else { plural })
    }

    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(interval.days, "day", "days"));
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if micros != 0 {
            let frac = format!("{:06}", micros);
            time.push('.');
            time.push_str(frac.trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

/// Render a network address the way PostgreSQL does: `inet` hosts without
/// their full-length prefix, `cidr` always with it.
pub fn format_network(net: &IpNetwork, always_prefix: bool) -> String {
    let full = match net {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    if !always_prefix && net.prefix() == full {
        net.ip().to_string()
    } else {
        format!("{}/{}", net.ip(), net.prefix())
    }
}

/// Decode binary data to JSON value.
///
/// Valid UTF-8 is returned as text, anything else as base64.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Placeholder shown for a value the gateway cannot render.
pub fn unsupported_marker(type_name: &str) -> JsonValue {
    JsonValue::String(format!("<unsupported type {}>", type_name))
}

/// A decoded result row, keyed by column name in select order.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> JsonRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = decode_column(self, idx, col.type_info());
                (col.name().to_string(), value)
            })
            .collect()
    }
}

fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_column(row: &PgRow, idx: usize, info: &PgTypeInfo) -> JsonValue {
    use TypeCategory as C;

    match categorize(info) {
        C::Int2 => decode::<i16>(row, idx, info, JsonValue::from),
        C::Int4 => decode::<i32>(row, idx, info, JsonValue::from),
        C::Int8 => decode::<i64>(row, idx, info, JsonValue::from),
        C::Float4 => decode::<f32>(row, idx, info, |v| float_to_json(f64::from(v))),
        C::Float8 => decode::<f64>(row, idx, info, float_to_json),
        // NUMERIC keeps its exact decimal representation as a string.
        C::Numeric => decode::<BigDecimal>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Boolean => decode::<bool>(row, idx, info, JsonValue::Bool),
        C::Text => decode::<String>(row, idx, info, JsonValue::String),
        C::Enum => decode_label(row, idx, info),
        C::Binary => decode::<Vec<u8>>(row, idx, info, |v| decode_binary_value(&v)),
        C::Json => decode::<JsonValue>(row, idx, info, |v| v),
        C::Uuid => decode::<Uuid>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Date => decode::<NaiveDate>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Timestamp => decode::<NaiveDateTime>(row, idx, info, |v| {
            JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        C::TimestampTz => {
            decode::<DateTime<Utc>>(row, idx, info, |v| JsonValue::String(v.to_rfc3339()))
        }
        C::Time => decode::<NaiveTime>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Interval => {
            decode::<PgInterval>(row, idx, info, |v| JsonValue::String(format_interval(&v)))
        }
        C::Inet => decode::<IpNetwork>(row, idx, info, |v| {
            JsonValue::String(format_network(&v, false))
        }),
        C::Cidr => decode::<IpNetwork>(row, idx, info, |v| {
            JsonValue::String(format_network(&v, true))
        }),
        C::Array => decode_array_column(row, idx, info),
        C::Unknown => decode_fallback(row, idx, info),
    }
}

fn decode_array_column(row: &PgRow, idx: usize, info: &PgTypeInfo) -> JsonValue {
    use TypeCategory as C;

    let element = match info.kind() {
        PgTypeKind::Array(element) => categorize(element),
        _ => C::Unknown,
    };
    match element {
        C::Int2 => decode_array::<i16>(row, idx, info, JsonValue::from),
        C::Int4 => decode_array::<i32>(row, idx, info, JsonValue::from),
        C::Int8 => decode_array::<i64>(row, idx, info, JsonValue::from),
        C::Float4 => decode_array::<f32>(row, idx, info, |v| float_to_json(f64::from(v))),
        C::Float8 => decode_array::<f64>(row, idx, info, float_to_json),
        C::Numeric => {
            decode_array::<BigDecimal>(row, idx, info, |v| JsonValue::String(v.to_string()))
        }
        C::Boolean => decode_array::<bool>(row, idx, info, JsonValue::Bool),
        C::Text => decode_array::<String>(row, idx, info, JsonValue::String),
        C::Json => decode_array::<JsonValue>(row, idx, info, |v| v),
        C::Uuid => decode_array::<Uuid>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Date => decode_array::<NaiveDate>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Timestamp => decode_array::<NaiveDateTime>(row, idx, info, |v| {
            JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        C::TimestampTz => {
            decode_array::<DateTime<Utc>>(row, idx, info, |v| JsonValue::String(v.to_rfc3339()))
        }
        C::Time => decode_array::<NaiveTime>(row, idx, info, |v| JsonValue::String(v.to_string())),
        C::Interval => decode_array::<PgInterval>(row, idx, info, |v| {
            JsonValue::String(format_interval(&v))
        }),
        C::Inet | C::Cidr => decode_array::<IpNetwork>(row, idx, info, |v| {
            JsonValue::String(format_network(&v, element == C::Cidr))
        }),
        _ => decode_fallback(row, idx, info),
    }
}

fn decode<T>(
    row: &PgRow,
    idx: usize,
    info: &PgTypeInfo,
    to_json: impl Fn(T) -> JsonValue,
) -> JsonValue
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(v) => v.map(to_json).unwrap_or(JsonValue::Null),
        Err(e) => {
            tracing::warn!(type_name = %info.name(), error = %e, "Failed to decode column");
            unsupported_marker(info.name())
        }
    }
}

fn decode_array<T>(
    row: &PgRow,
    idx: usize,
    info: &PgTypeInfo,
    to_json: impl Fn(T) -> JsonValue,
) -> JsonValue
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType,
{
    decode::<Vec<Option<T>>>(row, idx, info, |items| {
        JsonValue::Array(
            items
                .into_iter()
                .map(|item| item.map(&to_json).unwrap_or(JsonValue::Null))
                .collect(),
        )
    })
}

/// Enum labels travel as their UTF-8 text in both wire formats.
fn decode_label(row: &PgRow, idx: usize, info: &PgTypeInfo) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => JsonValue::Null,
        Ok(raw) => match raw.as_str() {
            Ok(label) => JsonValue::String(label.to_string()),
            Err(e) => {
                tracing::warn!(type_name = %info.name(), error = %e, "Failed to read enum label");
                unsupported_marker(info.name())
            }
        },
        Err(e) => {
            tracing::warn!(type_name = %info.name(), error = %e, "Failed to read column");
            unsupported_marker(info.name())
        }
    }
}

/// Types without a mapping: NULL stays null, anything else is marked.
fn decode_fallback(row: &PgRow, idx: usize, info: &PgTypeInfo) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => JsonValue::Null,
        _ => {
            tracing::warn!(type_name = %info.name(), "Column type has no JSON mapping");
            unsupported_marker(info.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integer_widths() {
        assert_eq!(categorize_type("INT4"), TypeCategory::Int4);
        assert_eq!(categorize_type("integer"), TypeCategory::Int4);
        assert_eq!(categorize_type("int8"), TypeCategory::Int8);
        assert_eq!(categorize_type("INT2"), TypeCategory::Int2);
        assert_eq!(categorize_type("SMALLINT"), TypeCategory::Int2);
    }

    #[test]
    fn test_categorize_float_widths() {
        assert_eq!(categorize_type("FLOAT4"), TypeCategory::Float4);
        assert_eq!(categorize_type("REAL"), TypeCategory::Float4);
        assert_eq!(categorize_type("FLOAT8"), TypeCategory::Float8);
    }

    #[test]
    fn test_interval_is_not_integer() {
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Interval);
    }

    #[test]
    fn test_categorize_temporal_types() {
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_misc_types() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Numeric);
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("citext"), TypeCategory::Text);
        assert_eq!(categorize_type("BOOL"), TypeCategory::Boolean);
        assert_eq!(categorize_type("INET"), TypeCategory::Inet);
        assert_eq!(categorize_type("CIDR"), TypeCategory::Cidr);
        assert_eq!(categorize_type("INT4[]"), TypeCategory::Array);
        assert_eq!(categorize_type("TSVECTOR"), TypeCategory::Unknown);
    }

    #[test]
    fn test_format_interval() {
        let day = PgInterval {
            months: 0,
            days: 1,
            microseconds: 0,
        };
        assert_eq!(format_interval(&day), "1 day");

        let mixed = PgInterval {
            months: 14,
            days: 3,
            microseconds: 14_706_500_000,
        };
        assert_eq!(format_interval(&mixed), "1 year 2 mons 3 days 04:05:06.5");

        let negative = PgInterval {
            months: 0,
            days: -2,
            microseconds: -90_000_000,
        };
        assert_eq!(format_interval(&negative), "-2 days -00:01:30");

        assert_eq!(format_interval(&PgInterval::default()), "00:00:00");
    }

    #[test]
    fn test_format_network() {
        let host: IpNetwork = "10.0.0.1".parse().unwrap();
        assert_eq!(format_network(&host, false), "10.0.0.1");
        assert_eq!(format_network(&host, true), "10.0.0.1/32");

        let net: IpNetwork = "10.0.0.0/8".parse().unwrap();
        assert_eq!(format_network(&net, false), "10.0.0.0/8");

        let v6: IpNetwork = "::1".parse().unwrap();
        assert_eq!(format_network(&v6, false), "::1");
    }

    #[test]
    fn test_unsupported_marker_names_type() {
        assert_eq!(
            unsupported_marker("TSVECTOR"),
            JsonValue::String("<unsupported type TSVECTOR>".into())
        );
    }

    #[test]
    fn test_decode_binary_value() {
        assert_eq!(
            decode_binary_value(b"hello world"),
            JsonValue::String("hello world".to_string())
        );
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        assert_eq!(
            decode_binary_value(bytes),
            JsonValue::String("//4AAQ==".to_string())
        );
    }
}
