//! The type mapping resolver.
//!
//! Resolution is a pure function of the request. Every table is built once
//! and never mutated afterwards, so one [`TypeMappingSource`] can be shared
//! freely across threads.
//!
//! Order of resolution:
//!
//! 1. exact store type match (alias-normalized),
//! 2. time-family store types,
//! 3. parameterized numerics (`NUMBER(p,s)` and its integer spellings),
//! 4. logical type defaults,
//! 5. on-demand string, binary and collection mappings.

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::{debug, trace};

use crate::error::{TypeError, TypeResult};
use crate::facets::{Facets, TypeMappingInfo};
use crate::logical::LogicalType;
use crate::mapping::{FacetSlot, MappingKind, TypeMapping};
use crate::store_type::{StoreTypeName, TypeFamily};
use crate::value::StoreValue;

/// Default precision and scale for `NUMBER` without arguments.
const DEFAULT_NUMBER_PRECISION: u32 = 38;

/// Default decimal mapping facets.
const DEFAULT_DECIMAL_PRECISION: u32 = 38;
const DEFAULT_DECIMAL_SCALE: u32 = 10;

static SHARED: LazyLock<TypeMappingSource> = LazyLock::new(TypeMappingSource::new);

/// Resolves [`TypeMappingInfo`] requests into [`TypeMapping`]s.
#[derive(Debug, Clone)]
pub struct TypeMappingSource {
    store_types: HashMap<&'static str, Vec<TypeMapping>>,
    time_types: HashMap<&'static str, Vec<TypeMapping>>,
    integer_mappings: Vec<TypeMapping>,
    fractional_mappings: Vec<TypeMapping>,
    logical_defaults: HashMap<LogicalType, TypeMapping>,
    string: TypeMapping,
    binary: TypeMapping,
    array: TypeMapping,
    byte_array: TypeMapping,
}

impl TypeMappingSource {
    /// Build the mapping tables.
    pub fn new() -> Self {
        let boolean = simple("BOOLEAN", LogicalType::Bool, MappingKind::Boolean);
        let double = simple("FLOAT", LogicalType::F64, MappingKind::Float);
        let single = simple("FLOAT", LogicalType::F32, MappingKind::Float);
        let decimal = TypeMapping::new(
            "NUMBER",
            LogicalType::Decimal,
            MappingKind::Decimal,
            FacetSlot::PrecisionScale,
            Facets {
                precision: Some(DEFAULT_DECIMAL_PRECISION),
                scale: Some(DEFAULT_DECIMAL_SCALE),
                ..Facets::NONE
            },
        );

        let i64_ = integer(LogicalType::I64, 38);
        let i32_ = integer(LogicalType::I32, 10);
        let i16_ = integer(LogicalType::I16, 5);
        let i8_ = integer(LogicalType::I8, 3);
        let u8_ = integer(LogicalType::U8, 3);
        let u16_ = integer(LogicalType::U16, 5);
        let u32_ = integer(LogicalType::U32, 10);
        let u64_ = integer(LogicalType::U64, 20);

        let string = TypeMapping::new(
            "VARCHAR",
            LogicalType::String,
            MappingKind::Text,
            FacetSlot::Size,
            Facets::NONE,
        );
        let character = TypeMapping::new(
            "VARCHAR",
            LogicalType::Char,
            MappingKind::Text,
            FacetSlot::Size,
            Facets {
                size: Some(1),
                ..Facets::NONE
            },
        );
        let uuid = TypeMapping::new(
            "VARCHAR",
            LogicalType::Uuid,
            MappingKind::Uuid,
            FacetSlot::Size,
            Facets {
                size: Some(36),
                ..Facets::NONE
            },
        );
        let binary = TypeMapping::new(
            "BINARY",
            LogicalType::Bytes,
            MappingKind::Binary,
            FacetSlot::Size,
            Facets::NONE,
        );

        let date = simple("DATE", LogicalType::Date, MappingKind::Date);
        let time = temporal("TIME", LogicalType::Time, MappingKind::Time);
        let ntz = temporal("TIMESTAMP_NTZ", LogicalType::DateTime, MappingKind::TimestampNtz);
        let ltz_offset = temporal(
            "TIMESTAMP_LTZ",
            LogicalType::DateTimeOffset,
            MappingKind::TimestampLtz,
        );
        let ltz = temporal("TIMESTAMP_LTZ", LogicalType::DateTime, MappingKind::TimestampLtz);
        let tz_offset = temporal(
            "TIMESTAMP_TZ",
            LogicalType::DateTimeOffset,
            MappingKind::TimestampTz,
        );
        let tz = temporal("TIMESTAMP_TZ", LogicalType::DateTime, MappingKind::TimestampTz);

        let variant = simple("VARIANT", LogicalType::Json, MappingKind::Variant);
        let object = simple("OBJECT", LogicalType::Object, MappingKind::Object);
        let array = simple("ARRAY", LogicalType::Array, MappingKind::Array);
        let byte_array = simple("ARRAY", LogicalType::Bytes, MappingKind::Array);
        let geography = simple("GEOGRAPHY", LogicalType::String, MappingKind::Geospatial);
        let geometry = simple("GEOMETRY", LogicalType::String, MappingKind::Geospatial);

        let mut store_types = HashMap::new();
        store_types.insert("BOOLEAN", vec![boolean.clone()]);
        store_types.insert("FLOAT", vec![double.clone(), single.clone()]);
        store_types.insert(
            "VARCHAR",
            vec![string.clone(), character.clone(), uuid.clone()],
        );
        store_types.insert("CHAR", vec![string.clone(), character.clone()]);
        store_types.insert("BINARY", vec![binary.clone()]);
        store_types.insert("VARIANT", vec![variant.clone()]);
        store_types.insert("OBJECT", vec![object.clone()]);
        store_types.insert("ARRAY", vec![array.clone(), byte_array.clone()]);
        store_types.insert("GEOGRAPHY", vec![geography]);
        store_types.insert("GEOMETRY", vec![geometry]);

        let mut time_types = HashMap::new();
        time_types.insert("DATE", vec![date.clone()]);
        time_types.insert("TIME", vec![time.clone()]);
        time_types.insert("TIMESTAMP_NTZ", vec![ntz.clone()]);
        time_types.insert("TIMESTAMP_LTZ", vec![ltz_offset, ltz]);
        time_types.insert("TIMESTAMP_TZ", vec![tz_offset.clone(), tz]);

        let integer_mappings = vec![
            i64_.clone(),
            i32_.clone(),
            i16_.clone(),
            i8_.clone(),
            u8_.clone(),
            u16_.clone(),
            u32_.clone(),
            u64_.clone(),
            decimal.clone(),
        ];
        let fractional_mappings = vec![decimal.clone()];

        let mut logical_defaults = HashMap::new();
        for mapping in [
            boolean, double, single, decimal, i64_, i32_, i16_, i8_, u8_, u16_, u32_, u64_,
            character, uuid, date, time, ntz, tz_offset, variant, object,
        ] {
            logical_defaults.insert(mapping.logical_type(), mapping);
        }

        Self {
            store_types,
            time_types,
            integer_mappings,
            fractional_mappings,
            logical_defaults,
            string,
            binary,
            array,
            byte_array,
        }
    }

    /// The process-wide resolver.
    pub fn shared() -> &'static TypeMappingSource {
        &SHARED
    }

    /// Resolve a request. `None` means no mapping applies.
    pub fn resolve(&self, info: &TypeMappingInfo) -> Option<TypeMapping> {
        let resolved = match info.store_type_name.as_deref() {
            Some(name) => self.resolve_store_type(name, info),
            None => self.resolve_logical(info),
        };

        match &resolved {
            Some(mapping) => trace!(
                store_type = mapping.store_type(),
                logical_type = %mapping.logical_type(),
                "resolved type mapping"
            ),
            None => debug!(
                store_type = ?info.store_type_name,
                logical_type = ?info.logical_type,
                "no type mapping"
            ),
        }
        resolved
    }

    /// Resolve a request, turning a miss into [`TypeError::Unmapped`].
    pub fn find_or_err(&self, info: &TypeMappingInfo) -> TypeResult<TypeMapping> {
        self.resolve(info).ok_or_else(|| {
            let what = match (&info.store_type_name, info.logical_type) {
                (Some(store), Some(logical)) => format!("'{}' as {}", store, logical),
                (Some(store), None) => format!("'{}'", store),
                (None, Some(logical)) => logical.to_string(),
                (None, None) => "an empty request".to_string(),
            };
            TypeError::unmapped(what)
        })
    }

    /// Resolve the default mapping for a logical type.
    pub fn find_logical(&self, logical_type: LogicalType) -> Option<TypeMapping> {
        self.resolve(&TypeMappingInfo::for_logical(logical_type))
    }

    /// Resolve the default mapping for a runtime value. Nulls bind as text.
    pub fn find_for_value(&self, value: &StoreValue) -> Option<TypeMapping> {
        self.find_logical(value.logical_type().unwrap_or(LogicalType::String))
    }

    /// Resolve a store type name without a logical type.
    pub fn find_store_type(&self, name: &str) -> Option<TypeMapping> {
        self.resolve(&TypeMappingInfo::for_store_type(name))
    }

    fn resolve_store_type(&self, name: &str, info: &TypeMappingInfo) -> Option<TypeMapping> {
        let parsed = StoreTypeName::parse(name)?;
        let facets = info.facets.overlay(&parsed.facets());

        if let Some(list) = self.store_types.get(parsed.canonical()) {
            let base = select(list, info.logical_type)?;
            return Some(self.refine(base, &facets, info));
        }

        if let Some(list) = self.time_types.get(parsed.canonical()) {
            let base = select(list, info.logical_type)?;
            return Some(base.with_facets(&Facets {
                scale: None,
                ..facets
            }));
        }

        if parsed.family() == TypeFamily::Numeric {
            return self.resolve_numeric(&parsed, facets, info.logical_type);
        }

        None
    }

    fn resolve_numeric(
        &self,
        parsed: &StoreTypeName,
        mut facets: Facets,
        logical_type: Option<LogicalType>,
    ) -> Option<TypeMapping> {
        let integer = parsed.is_integer_spelling() || facets.scale.unwrap_or(0) == 0;

        if parsed.is_integer_spelling() || (facets.precision.is_none() && facets.scale.is_none()) {
            facets.precision = facets.precision.or(Some(DEFAULT_NUMBER_PRECISION));
            facets.scale = Some(0);
        }

        let list = if integer {
            &self.integer_mappings
        } else {
            &self.fractional_mappings
        };
        let base = select(list, logical_type)?;
        Some(base.with_facets(&facets))
    }

    fn resolve_logical(&self, info: &TypeMappingInfo) -> Option<TypeMapping> {
        let logical_type = info.logical_type?;
        match logical_type {
            LogicalType::String => Some(self.string_mapping(&info.facets)),
            LogicalType::Bytes => Some(match &info.element_mapping {
                Some(element) => self.byte_array.with_element((**element).clone()),
                None => self.binary.with_facets(&info.facets),
            }),
            LogicalType::Array => Some(match &info.element_mapping {
                Some(element) => self.array.with_element((**element).clone()),
                None => self.array.clone(),
            }),
            _ => self
                .logical_defaults
                .get(&logical_type)
                .map(|mapping| mapping.with_facets(&info.facets)),
        }
    }

    fn refine(&self, base: &TypeMapping, facets: &Facets, info: &TypeMappingInfo) -> TypeMapping {
        let mapping = match (base.kind(), base.logical_type()) {
            (MappingKind::Text, LogicalType::String) => self.string_mapping(facets),
            _ => base.with_facets(facets),
        };
        match (&info.element_mapping, mapping.kind()) {
            (Some(element), MappingKind::Array) => mapping.with_element((**element).clone()),
            _ => mapping,
        }
    }

    /// Build a string mapping on demand. `CHAR` without a length is `CHAR(1)`.
    fn string_mapping(&self, facets: &Facets) -> TypeMapping {
        let mut facets = *facets;
        if facets.fixed_length == Some(true) && facets.size.is_none() {
            facets.size = Some(1);
        }
        facets.precision = None;
        self.string.with_facets(&facets)
    }
}

impl Default for TypeMappingSource {
    fn default() -> Self {
        Self::new()
    }
}

fn select(list: &[TypeMapping], logical_type: Option<LogicalType>) -> Option<&TypeMapping> {
    match logical_type {
        Some(logical_type) => list.iter().find(|m| m.logical_type() == logical_type),
        None => list.first(),
    }
}

fn simple(base: &str, logical_type: LogicalType, kind: MappingKind) -> TypeMapping {
    TypeMapping::new(base, logical_type, kind, FacetSlot::None, Facets::NONE)
}

fn integer(logical_type: LogicalType, precision: u32) -> TypeMapping {
    TypeMapping::new(
        "NUMBER",
        logical_type,
        MappingKind::Integer,
        FacetSlot::Precision,
        Facets {
            precision: Some(precision),
            scale: Some(0),
            ..Facets::NONE
        },
    )
}

fn temporal(base: &str, logical_type: LogicalType, kind: MappingKind) -> TypeMapping {
    TypeMapping::new(
        base,
        logical_type,
        kind,
        FacetSlot::Size,
        Facets {
            size: Some(9),
            ..Facets::NONE
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MAX_BINARY_LENGTH, MAX_VARCHAR_LENGTH};
    use pretty_assertions::assert_eq;

    fn source() -> &'static TypeMappingSource {
        TypeMappingSource::shared()
    }

    fn store(name: &str) -> TypeMapping {
        source().find_store_type(name).unwrap()
    }

    #[test]
    fn test_store_type_exact_match() {
        let mapping = store("boolean");
        assert_eq!(mapping.store_type(), "BOOLEAN");
        assert_eq!(mapping.logical_type(), LogicalType::Bool);
    }

    #[test]
    fn test_store_type_selects_by_logical() {
        let info = TypeMappingInfo::for_store_type("FLOAT").with_logical(LogicalType::F32);
        assert_eq!(source().resolve(&info).unwrap().logical_type(), LogicalType::F32);

        let info = TypeMappingInfo::for_store_type("DOUBLE");
        assert_eq!(source().resolve(&info).unwrap().logical_type(), LogicalType::F64);
    }

    #[test]
    fn test_store_type_logical_mismatch_is_none() {
        let info = TypeMappingInfo::for_store_type("BOOLEAN").with_logical(LogicalType::Date);
        assert!(source().resolve(&info).is_none());
    }

    #[test]
    fn test_varchar_sizes() {
        assert_eq!(store("VARCHAR(100)").store_type(), "VARCHAR(100)");
        assert_eq!(store("STRING").store_type(), "VARCHAR");
        assert_eq!(store("CHAR").store_type(), "CHAR(1)");
        assert_eq!(store("NCHAR(10)").store_type(), "CHAR(10)");
    }

    #[test]
    fn test_varchar_clamped() {
        let info = TypeMappingInfo::for_logical(LogicalType::String).size(u32::MAX);
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.size(), Some(MAX_VARCHAR_LENGTH));

        let info = TypeMappingInfo::for_logical(LogicalType::Bytes).size(u32::MAX);
        assert_eq!(source().resolve(&info).unwrap().size(), Some(MAX_BINARY_LENGTH));
    }

    #[test]
    fn test_uuid_on_varchar() {
        let info = TypeMappingInfo::for_store_type("VARCHAR(36)").with_logical(LogicalType::Uuid);
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.kind(), MappingKind::Uuid);
        assert_eq!(mapping.store_type(), "VARCHAR(36)");
    }

    #[test]
    fn test_time_family_reapplies_precision() {
        let info = TypeMappingInfo::for_store_type("TIMESTAMP_NTZ")
            .precision(3)
            .scale(4);
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.store_type(), "TIMESTAMP_NTZ(3)");
        assert_eq!(mapping.scale(), None);

        assert_eq!(store("datetime").store_type(), "TIMESTAMP_NTZ(9)");
        assert_eq!(store("TIME(0)").store_type(), "TIME(0)");
        assert_eq!(store("DATE").store_type(), "DATE");
    }

    #[test]
    fn test_timestamp_tz_by_logical() {
        let info = TypeMappingInfo::for_store_type("TIMESTAMP_TZ(6)").with_logical(LogicalType::DateTime);
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.kind(), MappingKind::TimestampTz);
        assert_eq!(mapping.logical_type(), LogicalType::DateTime);
        assert_eq!(mapping.store_type(), "TIMESTAMP_TZ(6)");
    }

    #[test]
    fn test_numeric_integer_vs_fractional() {
        let mapping = store("NUMBER(10,2)");
        assert_eq!(mapping.logical_type(), LogicalType::Decimal);
        assert_eq!(mapping.store_type(), "NUMBER(10,2)");

        let mapping = store("NUMBER(10,0)");
        assert_eq!(mapping.logical_type(), LogicalType::I64);
        assert_eq!(mapping.store_type(), "NUMBER(10,0)");

        let mapping = store("NUMBER");
        assert_eq!(mapping.logical_type(), LogicalType::I64);
        assert_eq!(mapping.store_type(), "NUMBER(38,0)");

        let mapping = store("NUMERIC(12)");
        assert_eq!(mapping.store_type(), "NUMBER(12,0)");
    }

    #[test]
    fn test_integer_spelling_forces_integer() {
        let info = TypeMappingInfo::for_store_type("INT").with_logical(LogicalType::I32).scale(2);
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.logical_type(), LogicalType::I32);
        assert_eq!(mapping.store_type(), "NUMBER(38,0)");
    }

    #[test]
    fn test_numeric_decimal_with_zero_scale() {
        let info = TypeMappingInfo::for_store_type("DECIMAL(18,0)").with_logical(LogicalType::Decimal);
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.kind(), MappingKind::Decimal);
        assert_eq!(mapping.store_type(), "NUMBER(18,0)");
    }

    #[test]
    fn test_numeric_request_facets() {
        let info = TypeMappingInfo::for_store_type("NUMBER")
            .with_logical(LogicalType::Decimal)
            .precision(20)
            .scale(4);
        assert_eq!(source().resolve(&info).unwrap().store_type(), "NUMBER(20,4)");
    }

    #[test]
    fn test_precision_only_slot_accepts_size() {
        let info = TypeMappingInfo::for_logical(LogicalType::I32).size(4);
        assert_eq!(source().resolve(&info).unwrap().store_type(), "NUMBER(4,0)");
    }

    #[test]
    fn test_logical_fallbacks() {
        let cases = [
            (LogicalType::Bool, "BOOLEAN"),
            (LogicalType::I64, "NUMBER(38,0)"),
            (LogicalType::I32, "NUMBER(10,0)"),
            (LogicalType::U64, "NUMBER(20,0)"),
            (LogicalType::F64, "FLOAT"),
            (LogicalType::Decimal, "NUMBER(38,10)"),
            (LogicalType::String, "VARCHAR"),
            (LogicalType::Char, "VARCHAR(1)"),
            (LogicalType::Bytes, "BINARY"),
            (LogicalType::Date, "DATE"),
            (LogicalType::Time, "TIME(9)"),
            (LogicalType::DateTime, "TIMESTAMP_NTZ(9)"),
            (LogicalType::DateTimeOffset, "TIMESTAMP_TZ(9)"),
            (LogicalType::Uuid, "VARCHAR(36)"),
            (LogicalType::Json, "VARIANT"),
            (LogicalType::Object, "OBJECT"),
            (LogicalType::Array, "ARRAY"),
        ];
        for (logical, expected) in cases {
            let mapping = source().find_logical(logical).unwrap();
            assert_eq!(mapping.store_type(), expected, "{}", logical);
        }
    }

    #[test]
    fn test_decimal_logical_facets() {
        let info = TypeMappingInfo::for_logical(LogicalType::Decimal).precision(18).scale(2);
        assert_eq!(source().resolve(&info).unwrap().store_type(), "NUMBER(18,2)");
    }

    #[test]
    fn test_fixed_length_string() {
        let info = TypeMappingInfo::for_logical(LogicalType::String)
            .size(3)
            .fixed_length(true);
        assert_eq!(source().resolve(&info).unwrap().store_type(), "CHAR(3)");
    }

    #[test]
    fn test_byte_array_with_element_is_array() {
        let element = source().find_logical(LogicalType::U8).unwrap();
        let info = TypeMappingInfo::for_logical(LogicalType::Bytes).with_element(element.clone());
        let mapping = source().resolve(&info).unwrap();
        assert_eq!(mapping.store_type(), "ARRAY");
        assert_eq!(mapping.logical_type(), LogicalType::Bytes);
        assert_eq!(mapping.element(), Some(&element));
    }

    #[test]
    fn test_array_store_type_keeps_element() {
        let element = source().find_logical(LogicalType::String).unwrap();
        let info = TypeMappingInfo::for_store_type("ARRAY").with_element(element.clone());
        assert_eq!(source().resolve(&info).unwrap().element(), Some(&element));
    }

    #[test]
    fn test_unknown_store_type() {
        assert!(source().find_store_type("HYPERLOGLOG").is_none());
        assert!(source().find_store_type("NUMBER(x)").is_none());
        assert!(source().resolve(&TypeMappingInfo::new()).is_none());
    }

    #[test]
    fn test_find_or_err() {
        let err = source()
            .find_or_err(&TypeMappingInfo::for_store_type("HYPERLOGLOG"))
            .unwrap_err();
        assert!(matches!(err, TypeError::Unmapped(_)));
        assert!(err.to_string().contains("HYPERLOGLOG"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let requests = [
            TypeMappingInfo::for_logical(LogicalType::Decimal).precision(12).scale(3),
            TypeMappingInfo::for_logical(LogicalType::String).size(40),
            TypeMappingInfo::for_logical(LogicalType::I16),
            TypeMappingInfo::for_store_type("TIMESTAMP_LTZ(4)"),
            TypeMappingInfo::for_store_type("CHAR(2)"),
            TypeMappingInfo::for_store_type("BINARY(16)"),
            TypeMappingInfo::for_store_type("FLOAT4"),
        ];
        for request in requests {
            let first = source().resolve(&request).unwrap();
            assert_eq!(source().resolve(&request).unwrap(), first);

            let again = TypeMappingInfo::for_store_type(first.store_type())
                .with_logical(first.logical_type());
            assert_eq!(source().resolve(&again).unwrap(), first);
        }
    }

    #[test]
    fn test_find_for_value() {
        let mapping = source().find_for_value(&StoreValue::from(3.5f64)).unwrap();
        assert_eq!(mapping.store_type(), "FLOAT");
        let mapping = source().find_for_value(&StoreValue::Null).unwrap();
        assert_eq!(mapping.base_name(), "VARCHAR");
        let mapping = source().find_for_value(&StoreValue::from(vec![1u8, 2])).unwrap();
        assert_eq!(mapping.store_type(), "BINARY");
    }
}
