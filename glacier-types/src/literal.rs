//! Literal formatting and parsing for each mapping kind.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use uuid::Uuid;

use crate::error::{TypeError, TypeResult};
use crate::mapping::{MAX_TIME_PRECISION, MappingKind, TypeMapping};
use crate::value::StoreValue;

/// Quote text as a Snowflake string literal.
///
/// Snowflake treats backslash as an escape inside single quotes, so it is
/// doubled along with the quote character.
pub fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("''"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Read a quoted literal from the start of `text`.
///
/// Returns the unescaped contents and the remainder after the closing quote.
pub fn unquote_string(text: &str) -> Option<(String, &str)> {
    let mut chars = text.char_indices();
    if chars.next()?.1 != '\'' {
        return None;
    }

    let mut out = String::new();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?.1),
            '\'' => {
                if text[idx + 1..].starts_with('\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    return Some((out, &text[idx + 1..]));
                }
            }
            _ => out.push(c),
        }
    }
    None
}

pub(crate) fn format_literal(mapping: &TypeMapping, value: &StoreValue) -> TypeResult<String> {
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    let mismatch = || TypeError::value_mismatch(value, mapping.store_type());

    match mapping.kind() {
        MappingKind::Boolean => match value {
            StoreValue::Bool(b) => Ok(bool_literal(*b).to_string()),
            StoreValue::Int(i) if *i == 0 || *i == 1 => Ok(bool_literal(*i == 1).to_string()),
            _ => Err(mismatch()),
        },
        MappingKind::Integer => match value {
            StoreValue::Int(i) => Ok(i.to_string()),
            StoreValue::UInt(u) => Ok(u.to_string()),
            StoreValue::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            StoreValue::Decimal(d) if d.fract().is_zero() => Ok(d.trunc().to_string()),
            _ => Err(mismatch()),
        },
        MappingKind::Float => match value {
            StoreValue::Float(f) => Ok(float_literal(*f)),
            StoreValue::Int(i) => Ok(i.to_string()),
            StoreValue::UInt(u) => Ok(u.to_string()),
            StoreValue::Decimal(d) => Ok(d.to_string()),
            _ => Err(mismatch()),
        },
        MappingKind::Decimal => match value {
            StoreValue::Decimal(d) => Ok(d.to_string()),
            StoreValue::Int(i) => Ok(i.to_string()),
            StoreValue::UInt(u) => Ok(u.to_string()),
            StoreValue::Float(f) => Decimal::try_from(*f)
                .map(|d| d.to_string())
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        MappingKind::Text => match value {
            StoreValue::String(s) => Ok(quote_string(s)),
            StoreValue::Uuid(u) => Ok(quote_string(&u.hyphenated().to_string())),
            _ => Err(mismatch()),
        },
        MappingKind::Uuid => match value {
            StoreValue::Uuid(u) => Ok(quote_string(&u.hyphenated().to_string())),
            StoreValue::String(s) => Ok(quote_string(s)),
            _ => Err(mismatch()),
        },
        MappingKind::Geospatial => match value {
            StoreValue::String(s) => Ok(format!("TO_{}({})", mapping.base_name(), quote_string(s))),
            _ => Err(mismatch()),
        },
        MappingKind::Binary => match value {
            StoreValue::Bytes(bytes) => Ok(format!(
                "TO_BINARY('{}', 'HEX')",
                hex::encode_upper(bytes)
            )),
            _ => Err(mismatch()),
        },
        MappingKind::Date => match value {
            StoreValue::Date(d) => Ok(format!("'{}'::DATE", d.format("%Y-%m-%d"))),
            StoreValue::DateTime(dt) => Ok(format!("'{}'::DATE", dt.date().format("%Y-%m-%d"))),
            _ => Err(mismatch()),
        },
        MappingKind::Time => match value {
            StoreValue::Time(t) => Ok(format!(
                "'{}'::{}",
                format_time(t, fraction_digits(mapping)),
                mapping.store_type()
            )),
            _ => Err(mismatch()),
        },
        MappingKind::TimestampNtz | MappingKind::TimestampLtz => match value {
            StoreValue::DateTime(dt) => Ok(format!(
                "'{}'::{}",
                format_datetime(dt, fraction_digits(mapping)),
                mapping.store_type()
            )),
            StoreValue::DateTimeOffset(dto) if mapping.kind() == MappingKind::TimestampLtz => {
                Ok(format!(
                    "'{}'::{}",
                    format_offset_datetime(dto, fraction_digits(mapping)),
                    mapping.store_type()
                ))
            }
            _ => Err(mismatch()),
        },
        MappingKind::TimestampTz => {
            let dto = match value {
                StoreValue::DateTimeOffset(dto) => *dto,
                StoreValue::DateTime(dt) => dt.and_utc().fixed_offset(),
                _ => return Err(mismatch()),
            };
            Ok(format!(
                "'{}'::{}",
                format_offset_datetime(&dto, fraction_digits(mapping)),
                mapping.store_type()
            ))
        }
        MappingKind::Variant | MappingKind::Object | MappingKind::Array => {
            let json = to_json(value).ok_or_else(mismatch)?;
            Ok(format!("PARSE_JSON({})", quote_string(&json.to_string())))
        }
    }
}

pub(crate) fn format_ddl_literal(mapping: &TypeMapping, value: &StoreValue) -> TypeResult<String> {
    if !mapping.kind().is_semi_structured() {
        return format_literal(mapping, value);
    }
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    let json = to_json(value).ok_or_else(|| TypeError::value_mismatch(value, mapping.store_type()))?;
    match (mapping.kind(), &json) {
        (MappingKind::Array, Json::Array(_)) | (MappingKind::Object, Json::Object(_)) => {
            Ok(json_constructor(&json))
        }
        (MappingKind::Variant, _) => Ok(format!("TO_VARIANT({})", json_constructor(&json))),
        _ => Err(TypeError::value_mismatch(value, mapping.store_type())),
    }
}

pub(crate) fn parse_literal(mapping: &TypeMapping, text: &str) -> TypeResult<StoreValue> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("NULL") {
        return Ok(StoreValue::Null);
    }

    let fail = || TypeError::literal_parse(text, mapping.store_type());

    match mapping.kind() {
        MappingKind::Boolean => match text.to_ascii_uppercase().as_str() {
            "TRUE" => Ok(StoreValue::Bool(true)),
            "FALSE" => Ok(StoreValue::Bool(false)),
            _ => Err(fail()),
        },
        MappingKind::Integer => text
            .parse::<i64>()
            .map(StoreValue::Int)
            .or_else(|_| text.parse::<u64>().map(StoreValue::UInt))
            .map_err(|_| fail()),
        MappingKind::Float => {
            if let Some((inner, _)) = unquote_string(text) {
                return match inner.as_str() {
                    "NaN" => Ok(StoreValue::Float(f64::NAN)),
                    "inf" => Ok(StoreValue::Float(f64::INFINITY)),
                    "-inf" => Ok(StoreValue::Float(f64::NEG_INFINITY)),
                    _ => Err(fail()),
                };
            }
            text.parse::<f64>().map(StoreValue::Float).map_err(|_| fail())
        }
        MappingKind::Decimal => Decimal::from_str(text)
            .map(StoreValue::Decimal)
            .map_err(|_| fail()),
        MappingKind::Text => unquote_string(text)
            .map(|(inner, _)| StoreValue::String(inner))
            .ok_or_else(fail),
        MappingKind::Uuid => {
            let (inner, _) = unquote_string(text).ok_or_else(fail)?;
            Uuid::parse_str(&inner).map(StoreValue::Uuid).map_err(|_| fail())
        }
        MappingKind::Geospatial => {
            let prefix = format!("TO_{}(", mapping.base_name());
            let inner = strip_call(text, &prefix).ok_or_else(fail)?;
            unquote_string(inner)
                .map(|(s, _)| StoreValue::String(s))
                .ok_or_else(fail)
        }
        MappingKind::Binary => {
            let inner = strip_call(text, "TO_BINARY(").ok_or_else(fail)?;
            let (hex_text, _) = unquote_string(inner).ok_or_else(fail)?;
            hex::decode(hex_text).map(StoreValue::Bytes).map_err(|_| fail())
        }
        MappingKind::Date => {
            let (inner, _) = unquote_string(text).ok_or_else(fail)?;
            NaiveDate::parse_from_str(&inner, "%Y-%m-%d")
                .map(StoreValue::Date)
                .map_err(|_| fail())
        }
        MappingKind::Time => {
            let (inner, _) = unquote_string(text).ok_or_else(fail)?;
            NaiveTime::parse_from_str(&inner, "%H:%M:%S%.f")
                .map(StoreValue::Time)
                .map_err(|_| fail())
        }
        MappingKind::TimestampNtz | MappingKind::TimestampLtz => {
            let (inner, _) = unquote_string(text).ok_or_else(fail)?;
            NaiveDateTime::parse_from_str(&inner, "%Y-%m-%d %H:%M:%S%.f")
                .map(StoreValue::DateTime)
                .or_else(|_| {
                    DateTime::parse_from_str(&inner, "%Y-%m-%d %H:%M:%S%.f %:z")
                        .map(StoreValue::DateTimeOffset)
                })
                .map_err(|_| fail())
        }
        MappingKind::TimestampTz => {
            let (inner, _) = unquote_string(text).ok_or_else(fail)?;
            DateTime::parse_from_str(&inner, "%Y-%m-%d %H:%M:%S%.f %:z")
                .map(StoreValue::DateTimeOffset)
                .map_err(|_| fail())
        }
        MappingKind::Variant | MappingKind::Object | MappingKind::Array => {
            let inner = strip_call(text, "PARSE_JSON(").ok_or_else(fail)?;
            let (json_text, _) = unquote_string(inner).ok_or_else(fail)?;
            serde_json::from_str(&json_text)
                .map(StoreValue::Json)
                .map_err(|_| fail())
        }
    }
}

fn bool_literal(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn float_literal(value: f64) -> String {
    if value.is_nan() {
        "'NaN'::FLOAT".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "'inf'::FLOAT".to_string()
        } else {
            "'-inf'::FLOAT".to_string()
        }
    } else {
        format!("{:?}", value)
    }
}

fn fraction_digits(mapping: &TypeMapping) -> u32 {
    mapping
        .size()
        .unwrap_or(MAX_TIME_PRECISION)
        .min(MAX_TIME_PRECISION)
}

fn format_fraction(nanos: u32, digits: u32) -> String {
    if digits == 0 {
        return String::new();
    }
    let nanos = nanos % 1_000_000_000;
    let scaled = nanos / 10u32.pow(MAX_TIME_PRECISION - digits);
    format!(".{:0width$}", scaled, width = digits as usize)
}

fn format_time(time: &NaiveTime, digits: u32) -> String {
    format!(
        "{}{}",
        time.format("%H:%M:%S"),
        format_fraction(time.nanosecond(), digits)
    )
}

fn format_datetime(dt: &NaiveDateTime, digits: u32) -> String {
    format!(
        "{}{}",
        dt.format("%Y-%m-%d %H:%M:%S"),
        format_fraction(dt.nanosecond(), digits)
    )
}

fn format_offset_datetime(dto: &DateTime<FixedOffset>, digits: u32) -> String {
    format!(
        "{}{} {}",
        dto.format("%Y-%m-%d %H:%M:%S"),
        format_fraction(dto.nanosecond(), digits),
        dto.format("%:z")
    )
}

fn strip_call<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let upper = text.get(..prefix.len())?;
    if !upper.eq_ignore_ascii_case(prefix) {
        return None;
    }
    text[prefix.len()..].strip_suffix(')')
}

/// Convert a value into JSON for the semi-structured kinds.
fn to_json(value: &StoreValue) -> Option<Json> {
    Some(match value {
        StoreValue::Null => Json::Null,
        StoreValue::Json(json) => json.clone(),
        StoreValue::Bool(b) => Json::Bool(*b),
        StoreValue::Int(i) => Json::from(*i),
        StoreValue::UInt(u) => Json::from(*u),
        StoreValue::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number)?,
        StoreValue::Decimal(d) => serde_json::from_str(&d.to_string()).ok()?,
        StoreValue::String(s) => Json::String(s.clone()),
        StoreValue::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        StoreValue::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
        StoreValue::Time(t) => Json::String(format_time(t, MAX_TIME_PRECISION)),
        StoreValue::DateTime(dt) => Json::String(format_datetime(dt, MAX_TIME_PRECISION)),
        StoreValue::DateTimeOffset(dto) => {
            Json::String(format_offset_datetime(dto, MAX_TIME_PRECISION))
        }
        StoreValue::Uuid(u) => Json::String(u.hyphenated().to_string()),
    })
}

/// Render JSON with Snowflake constructor functions.
fn json_constructor(json: &Json) -> String {
    match json {
        Json::Null => "NULL".to_string(),
        Json::Bool(b) => bool_literal(*b).to_string(),
        Json::Number(n) => n.to_string(),
        Json::String(s) => quote_string(s),
        Json::Array(items) => {
            let items: Vec<String> = items.iter().map(json_constructor).collect();
            format!("ARRAY_CONSTRUCT({})", items.join(", "))
        }
        Json::Object(fields) => {
            let pairs: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}, {}", quote_string(k), json_constructor(v)))
                .collect();
            // Plain OBJECT_CONSTRUCT drops members whose value is NULL.
            format!("OBJECT_CONSTRUCT_KEEP_NULL({})", pairs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::Facets;
    use crate::logical::LogicalType;
    use crate::mapping::FacetSlot;
    use pretty_assertions::assert_eq;

    fn mapping(base: &str, kind: MappingKind, slot: FacetSlot, size: Option<u32>) -> TypeMapping {
        TypeMapping::new(
            base,
            LogicalType::String,
            kind,
            slot,
            Facets {
                size,
                ..Facets::NONE
            },
        )
    }

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(quote_string(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_unquote_round_trip() {
        let original = r"O'Brien \ co";
        let quoted = format!("{}::VARCHAR", quote_string(original));
        let (inner, rest) = unquote_string(&quoted).unwrap();
        assert_eq!(inner, original);
        assert_eq!(rest, "::VARCHAR");
    }

    #[test]
    fn test_unquote_unterminated() {
        assert!(unquote_string("'abc").is_none());
        assert!(unquote_string("abc").is_none());
    }

    #[test]
    fn test_timestamp_fraction_follows_size() {
        let ts = mapping("TIMESTAMP_NTZ", MappingKind::TimestampNtz, FacetSlot::Size, Some(3));
        let value = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_nano_opt(13, 45, 30, 123_456_789)
            .unwrap();
        assert_eq!(
            ts.literal(&StoreValue::DateTime(value)).unwrap(),
            "'2024-01-31 13:45:30.123'::TIMESTAMP_NTZ(3)"
        );
    }

    #[test]
    fn test_time_zero_precision() {
        let time = mapping("TIME", MappingKind::Time, FacetSlot::Size, Some(0));
        let value = NaiveTime::from_hms_milli_opt(8, 0, 1, 500).unwrap();
        assert_eq!(time.literal(&StoreValue::Time(value)).unwrap(), "'08:00:01'::TIME(0)");
    }

    #[test]
    fn test_binary_literal() {
        let bin = mapping("BINARY", MappingKind::Binary, FacetSlot::Size, None);
        let lit = bin.literal(&StoreValue::Bytes(vec![0x0a, 0xff])).unwrap();
        assert_eq!(lit, "TO_BINARY('0AFF', 'HEX')");
        assert_eq!(bin.parse_literal(&lit).unwrap(), StoreValue::Bytes(vec![0x0a, 0xff]));
    }

    #[test]
    fn test_float_specials() {
        let float = mapping("FLOAT", MappingKind::Float, FacetSlot::None, None);
        assert_eq!(float.literal(&StoreValue::Float(f64::NAN)).unwrap(), "'NaN'::FLOAT");
        assert_eq!(
            float.literal(&StoreValue::Float(f64::NEG_INFINITY)).unwrap(),
            "'-inf'::FLOAT"
        );
        assert_eq!(float.literal(&StoreValue::Float(0.1)).unwrap(), "0.1");
        assert_eq!(
            float.parse_literal("'inf'::FLOAT").unwrap(),
            StoreValue::Float(f64::INFINITY)
        );
    }

    #[test]
    fn test_semi_structured_dml_vs_ddl() {
        let array = mapping("ARRAY", MappingKind::Array, FacetSlot::None, None);
        let value = StoreValue::Json(serde_json::json!([1, "two", null]));
        assert_eq!(
            array.literal(&value).unwrap(),
            "PARSE_JSON('[1,\"two\",null]')"
        );
        assert_eq!(
            array.ddl_literal(&value).unwrap(),
            "ARRAY_CONSTRUCT(1, 'two', NULL)"
        );

        let variant = mapping("VARIANT", MappingKind::Variant, FacetSlot::None, None);
        assert_eq!(
            variant.ddl_literal(&StoreValue::Json(serde_json::json!({"a": true}))).unwrap(),
            "TO_VARIANT(OBJECT_CONSTRUCT_KEEP_NULL('a', TRUE))"
        );
    }

    #[test]
    fn test_ddl_object_keeps_null_members() {
        let variant = mapping("VARIANT", MappingKind::Variant, FacetSlot::None, None);
        let value = StoreValue::Json(serde_json::json!({"a": null}));
        assert_eq!(
            variant.ddl_literal(&value).unwrap(),
            "TO_VARIANT(OBJECT_CONSTRUCT_KEEP_NULL('a', NULL))"
        );

        let object = mapping("OBJECT", MappingKind::Object, FacetSlot::None, None);
        let nested = StoreValue::Json(serde_json::json!({"outer": {"inner": null}}));
        assert_eq!(
            object.ddl_literal(&nested).unwrap(),
            "OBJECT_CONSTRUCT_KEEP_NULL('outer', OBJECT_CONSTRUCT_KEEP_NULL('inner', NULL))"
        );
    }

    #[test]
    fn test_ddl_literal_falls_back_for_scalars() {
        let text = mapping("VARCHAR", MappingKind::Text, FacetSlot::Size, None);
        let value = StoreValue::from("x");
        assert_eq!(text.ddl_literal(&value).unwrap(), text.literal(&value).unwrap());
    }

    #[test]
    fn test_mismatch_is_error() {
        let date = mapping("DATE", MappingKind::Date, FacetSlot::None, None);
        assert!(matches!(
            date.literal(&StoreValue::Bool(true)),
            Err(TypeError::ValueMismatch { .. })
        ));
    }

    #[test]
    fn test_null_literal() {
        let date = mapping("DATE", MappingKind::Date, FacetSlot::None, None);
        assert_eq!(date.literal(&StoreValue::Null).unwrap(), "NULL");
        assert_eq!(date.parse_literal("null").unwrap(), StoreValue::Null);
    }
}
