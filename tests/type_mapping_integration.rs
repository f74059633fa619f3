//! Integration tests for type mapping resolution and literal formatting.

use chrono::{NaiveDate, NaiveDateTime};
use glacier::types::{LogicalType, MappingKind, StoreValue, TypeMappingInfo, TypeMappingSource};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Resolving the same request twice yields the same mapping
#[test]
fn test_resolution_is_deterministic() {
    let source = TypeMappingSource::shared();
    let requests = [
        TypeMappingInfo::for_store_type("NUMBER(10,2)"),
        TypeMappingInfo::for_store_type("string(40)"),
        TypeMappingInfo::for_store_type("TIMESTAMP_NTZ(3)"),
        TypeMappingInfo::for_logical(LogicalType::Decimal).precision(18).scale(4),
        TypeMappingInfo::for_logical(LogicalType::String).size(12).fixed_length(true),
        TypeMappingInfo::for_logical(LogicalType::Uuid),
    ];

    for request in &requests {
        let first = source.resolve(request).expect("mapping should resolve");
        let second = source.resolve(request).expect("mapping should resolve");
        assert_eq!(first, second);
    }
}

/// A fresh resolver agrees with the shared one
#[test]
fn test_fresh_source_matches_shared() {
    let fresh = TypeMappingSource::new();
    for name in ["VARCHAR(10)", "NUMBER(38,0)", "FLOAT", "VARIANT", "BINARY(16)", "DATE"] {
        assert_eq!(
            fresh.find_store_type(name),
            TypeMappingSource::shared().find_store_type(name),
            "{}",
            name
        );
    }
}

/// Unknown store types do not resolve
#[test]
fn test_unknown_store_type() {
    let source = TypeMappingSource::shared();
    assert!(source.find_store_type("MONEY").is_none());
    assert!(source.find_or_err(&TypeMappingInfo::for_store_type("MONEY")).is_err());
}

/// Formatting a literal and parsing it back returns the value
#[test]
fn test_literal_round_trip() {
    let source = TypeMappingSource::shared();
    let cases: Vec<(&str, StoreValue)> = vec![
        ("VARCHAR(50)", StoreValue::from(r"it's a C:\path")),
        ("NUMBER(38,0)", StoreValue::from(-42i64)),
        ("NUMBER(18,4)", StoreValue::from(Decimal::from_str("1234.5678").unwrap())),
        ("BOOLEAN", StoreValue::from(true)),
        ("DATE", StoreValue::from(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap())),
        (
            "TIMESTAMP_NTZ(9)",
            StoreValue::from(
                NaiveDateTime::parse_from_str("2026-03-14 15:09:26.535897932", "%Y-%m-%d %H:%M:%S%.f")
                    .unwrap(),
            ),
        ),
        ("BINARY(4)", StoreValue::from(vec![0xde, 0xad, 0xbe, 0xef])),
        ("VARIANT", StoreValue::from(serde_json::json!({"tags": ["a", "b"], "n": 1}))),
    ];

    for (store_type, value) in cases {
        let mapping = source.find_store_type(store_type).expect(store_type);
        let literal = mapping.literal(&value).unwrap();
        assert_eq!(mapping.parse_literal(&literal).unwrap(), value, "{}", literal);
    }
}

/// Semi-structured values use constructors in DDL and PARSE_JSON in DML
#[test]
fn test_semi_structured_literals() {
    let mapping = TypeMappingSource::shared().find_store_type("ARRAY").unwrap();
    assert_eq!(mapping.kind(), MappingKind::Array);

    let value = StoreValue::from(serde_json::json!([1, 2]));
    assert_eq!(mapping.literal(&value).unwrap(), "PARSE_JSON('[1,2]')");
    assert!(!mapping.ddl_literal(&value).unwrap().contains("PARSE_JSON"));
}

/// Parameters for semi-structured columns are wrapped
#[test]
fn test_placeholder_wrapping() {
    let source = TypeMappingSource::shared();
    let variant = source.find_store_type("VARIANT").unwrap();
    let text = source.find_store_type("VARCHAR").unwrap();
    assert_eq!(variant.wrap_placeholder(":p0"), "PARSE_JSON(:p0)");
    assert_eq!(text.wrap_placeholder(":p0"), ":p0");
}
