//! Resolved type mappings.

use std::fmt;

use smol_str::SmolStr;

use crate::error::TypeResult;
use crate::facets::Facets;
use crate::literal;
use crate::logical::LogicalType;
use crate::value::StoreValue;

/// Longest `VARCHAR` Snowflake accepts.
pub const MAX_VARCHAR_LENGTH: u32 = 16_777_216;

/// Longest `BINARY` Snowflake accepts.
pub const MAX_BINARY_LENGTH: u32 = 8_388_608;

/// Highest `NUMBER` precision.
pub const MAX_NUMBER_PRECISION: u32 = 38;

/// Highest fractional-second precision for `TIME` and `TIMESTAMP_*`.
pub const MAX_TIME_PRECISION: u32 = 9;

/// Which facet a mapping renders into its store type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetSlot {
    /// Facets are ignored (`BOOLEAN`, `FLOAT`, `DATE`).
    None,
    /// A single length-like argument (`VARCHAR(n)`, and `TIME(n)` which keeps precision here).
    Size,
    /// Precision only (`NUMBER(p,0)` for integers).
    Precision,
    /// Precision and scale (`NUMBER(p,s)`).
    PrecisionScale,
}

/// How values of a mapping are formatted and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// `BOOLEAN`.
    Boolean,
    /// `NUMBER(p,0)`.
    Integer,
    /// `FLOAT`.
    Float,
    /// `NUMBER(p,s)`.
    Decimal,
    /// `VARCHAR` / `CHAR`.
    Text,
    /// `BINARY`.
    Binary,
    /// `DATE`.
    Date,
    /// `TIME`.
    Time,
    /// `TIMESTAMP_NTZ`.
    TimestampNtz,
    /// `TIMESTAMP_LTZ`.
    TimestampLtz,
    /// `TIMESTAMP_TZ`.
    TimestampTz,
    /// UUID stored as `VARCHAR(36)`.
    Uuid,
    /// `VARIANT`.
    Variant,
    /// `OBJECT`.
    Object,
    /// `ARRAY`.
    Array,
    /// `GEOGRAPHY` / `GEOMETRY`, exchanged as text.
    Geospatial,
}

impl MappingKind {
    /// Whether the kind is one of the semi-structured types.
    pub fn is_semi_structured(&self) -> bool {
        matches!(self, Self::Variant | Self::Object | Self::Array)
    }

    /// Whether the kind is a timestamp.
    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            Self::TimestampNtz | Self::TimestampLtz | Self::TimestampTz
        )
    }
}

/// Driver binding type used when a value travels as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// Exact numeric.
    Fixed,
    /// Approximate numeric.
    Real,
    /// Text.
    Text,
    /// Bytes.
    Binary,
    /// Boolean.
    Boolean,
    /// Date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without time zone.
    TimestampNtz,
    /// Timestamp in session time zone.
    TimestampLtz,
    /// Timestamp with offset.
    TimestampTz,
}

impl BindingType {
    /// Get the binding name understood by the driver.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::TimestampNtz => "TIMESTAMP_NTZ",
            Self::TimestampLtz => "TIMESTAMP_LTZ",
            Self::TimestampTz => "TIMESTAMP_TZ",
        }
    }
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a value conversion applied between host and store values.
///
/// Conversions themselves run in the host; mappings only carry their identity
/// so that two parameters can be compared for reuse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueConverter {
    name: SmolStr,
}

impl ValueConverter {
    /// Create a converter identity.
    pub fn named(name: impl AsRef<str>) -> Self {
        Self {
            name: SmolStr::new(name.as_ref()),
        }
    }

    /// Get the converter name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A parameter ready to hand to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DbParameter {
    /// Parameter name without prefix.
    pub name: String,
    /// Binding type.
    pub binding: BindingType,
    /// Size facet.
    pub size: Option<u32>,
    /// Precision facet.
    pub precision: Option<u32>,
    /// Scale facet.
    pub scale: Option<u32>,
    /// Whether NULL is acceptable.
    pub nullable: bool,
    /// The value in its bound representation.
    pub value: StoreValue,
}

/// A resolved physical type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    base_name: SmolStr,
    store_type: String,
    logical_type: LogicalType,
    kind: MappingKind,
    slot: FacetSlot,
    facets: Facets,
    element: Option<Box<TypeMapping>>,
    converter: Option<ValueConverter>,
}

impl TypeMapping {
    /// Create a mapping. The full store type is rendered from `base_name` and `facets`.
    pub fn new(
        base_name: &str,
        logical_type: LogicalType,
        kind: MappingKind,
        slot: FacetSlot,
        facets: Facets,
    ) -> Self {
        let mut mapping = Self {
            base_name: SmolStr::new(base_name),
            store_type: String::new(),
            logical_type,
            kind,
            slot,
            facets,
            element: None,
            converter: None,
        };
        mapping.store_type = mapping.render_store_type();
        mapping
    }

    /// The full store type, e.g. `NUMBER(10,2)`.
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    /// The store type without facets, e.g. `NUMBER`.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// The logical type.
    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    /// The formatting kind.
    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    /// The facet slot.
    pub fn slot(&self) -> FacetSlot {
        self.slot
    }

    /// The facet values.
    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    /// Size facet.
    pub fn size(&self) -> Option<u32> {
        self.facets.size
    }

    /// Precision facet.
    pub fn precision(&self) -> Option<u32> {
        self.facets.precision
    }

    /// Scale facet.
    pub fn scale(&self) -> Option<u32> {
        self.facets.scale
    }

    /// Element mapping for collections.
    pub fn element(&self) -> Option<&TypeMapping> {
        self.element.as_deref()
    }

    /// The value converter identity, if any.
    pub fn converter(&self) -> Option<&ValueConverter> {
        self.converter.as_ref()
    }

    /// The driver binding type.
    pub fn binding_type(&self) -> BindingType {
        match self.kind {
            MappingKind::Boolean => BindingType::Boolean,
            MappingKind::Integer | MappingKind::Decimal => BindingType::Fixed,
            MappingKind::Float => BindingType::Real,
            MappingKind::Binary => BindingType::Binary,
            MappingKind::Date => BindingType::Date,
            MappingKind::Time => BindingType::Time,
            MappingKind::TimestampNtz => BindingType::TimestampNtz,
            MappingKind::TimestampLtz => BindingType::TimestampLtz,
            MappingKind::TimestampTz => BindingType::TimestampTz,
            MappingKind::Text
            | MappingKind::Uuid
            | MappingKind::Variant
            | MappingKind::Object
            | MappingKind::Array
            | MappingKind::Geospatial => BindingType::Text,
        }
    }

    /// Derive a mapping with requested facets applied to this mapping's slot.
    ///
    /// A `Size` slot accepts a requested precision when no size is given, and a
    /// `Precision` slot accepts a requested size when no precision is given.
    pub fn with_facets(&self, requested: &Facets) -> TypeMapping {
        let mut facets = self.facets;
        match self.slot {
            FacetSlot::None => {}
            FacetSlot::Size => {
                if let Some(size) = requested.size.or(requested.precision) {
                    facets.size = Some(self.clamp_size(size));
                }
            }
            FacetSlot::Precision => {
                if let Some(precision) = requested.precision.or(requested.size) {
                    facets.precision = Some(precision.min(MAX_NUMBER_PRECISION));
                }
            }
            FacetSlot::PrecisionScale => {
                if let Some(precision) = requested.precision {
                    let precision = precision.min(MAX_NUMBER_PRECISION);
                    facets.precision = Some(precision);
                    facets.scale = Some(requested.scale.unwrap_or(0).min(precision));
                } else if let Some(scale) = requested.scale {
                    facets.scale = Some(scale);
                }
            }
        }
        facets.unicode = requested.unicode.or(facets.unicode);
        facets.fixed_length = requested.fixed_length.or(facets.fixed_length);

        let mut mapping = self.clone();
        if self.kind == MappingKind::Text {
            mapping.base_name = SmolStr::new_static(if facets.fixed_length == Some(true) {
                "CHAR"
            } else {
                "VARCHAR"
            });
        }
        mapping.facets = facets;
        mapping.store_type = mapping.render_store_type();
        mapping
    }

    /// Derive a mapping carrying an element mapping.
    pub fn with_element(&self, element: TypeMapping) -> TypeMapping {
        let mut mapping = self.clone();
        mapping.element = Some(Box::new(element));
        mapping
    }

    /// Derive a mapping carrying a value converter.
    pub fn with_converter(&self, converter: ValueConverter) -> TypeMapping {
        let mut mapping = self.clone();
        mapping.converter = Some(converter);
        mapping
    }

    /// Whether DDL contexts need a different literal than DML contexts.
    pub fn has_ddl_literal(&self) -> bool {
        self.kind.is_semi_structured()
    }

    /// Format a value as a SQL literal for queries and DML.
    pub fn literal(&self, value: &StoreValue) -> TypeResult<String> {
        literal::format_literal(self, value)
    }

    /// Format a value as a SQL literal for DDL (column defaults).
    ///
    /// Semi-structured values use constructor functions here because
    /// `PARSE_JSON` is not accepted in a column default.
    pub fn ddl_literal(&self, value: &StoreValue) -> TypeResult<String> {
        literal::format_ddl_literal(self, value)
    }

    /// Parse a literal produced by [`TypeMapping::literal`].
    pub fn parse_literal(&self, text: &str) -> TypeResult<StoreValue> {
        literal::parse_literal(self, text)
    }

    /// Wrap a parameter placeholder so the bound text lands as this type.
    pub fn wrap_placeholder(&self, placeholder: &str) -> String {
        match self.kind {
            MappingKind::Variant | MappingKind::Object | MappingKind::Array => {
                format!("PARSE_JSON({})", placeholder)
            }
            MappingKind::Geospatial => format!("TO_{}({})", self.base_name, placeholder),
            _ => placeholder.to_string(),
        }
    }

    /// Build a driver parameter for a value.
    pub fn create_parameter(
        &self,
        name: impl Into<String>,
        value: StoreValue,
        nullable: bool,
    ) -> DbParameter {
        let value = match value {
            StoreValue::Json(json) => StoreValue::String(json.to_string()),
            StoreValue::Uuid(uuid) => StoreValue::String(uuid.hyphenated().to_string()),
            other => other,
        };
        DbParameter {
            name: name.into(),
            binding: self.binding_type(),
            size: self.facets.size,
            precision: self.facets.precision,
            scale: self.facets.scale,
            nullable,
            value,
        }
    }

    fn clamp_size(&self, size: u32) -> u32 {
        match self.kind {
            MappingKind::Text => size.clamp(1, MAX_VARCHAR_LENGTH),
            MappingKind::Binary => size.clamp(1, MAX_BINARY_LENGTH),
            MappingKind::Time | MappingKind::TimestampNtz | MappingKind::TimestampLtz
            | MappingKind::TimestampTz => size.min(MAX_TIME_PRECISION),
            _ => size,
        }
    }

    fn render_store_type(&self) -> String {
        let base = self.base_name.as_str();
        match self.slot {
            FacetSlot::None => base.to_string(),
            FacetSlot::Size => match self.facets.size {
                Some(size) => format!("{}({})", base, size),
                None => base.to_string(),
            },
            FacetSlot::Precision => match self.facets.precision {
                Some(precision) => format!("{}({},0)", base, precision),
                None => base.to_string(),
            },
            FacetSlot::PrecisionScale => match self.facets.precision {
                Some(precision) => {
                    format!("{}({},{})", base, precision, self.facets.scale.unwrap_or(0))
                }
                None => base.to_string(),
            },
        }
    }
}

impl fmt::Display for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.store_type)
    }
}
