//! Type facets and the resolution request.

use crate::logical::LogicalType;
use crate::mapping::TypeMapping;

/// Refinements layered onto a logical or store type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Facets {
    /// Maximum length (text, binary) or fractional-second digits for slots that store them as size.
    pub size: Option<u32>,
    /// Numeric precision or fractional-second digits.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Whether text is unicode. Snowflake text is always UTF-8; kept for round-tripping.
    pub unicode: Option<bool>,
    /// Whether text/binary is fixed length.
    pub fixed_length: Option<bool>,
}

impl Facets {
    /// Facets with every value unset.
    pub const NONE: Facets = Facets {
        size: None,
        precision: None,
        scale: None,
        unicode: None,
        fixed_length: None,
    };

    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn overlay(&self, other: &Facets) -> Facets {
        Facets {
            size: other.size.or(self.size),
            precision: other.precision.or(self.precision),
            scale: other.scale.or(self.scale),
            unicode: other.unicode.or(self.unicode),
            fixed_length: other.fixed_length.or(self.fixed_length),
        }
    }

    /// Check whether no facet is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// A type resolution request.
///
/// Built fresh for every call to the resolver:
///
/// ```rust
/// use glacier_types::{LogicalType, TypeMappingInfo};
///
/// let info = TypeMappingInfo::for_store_type("NUMBER(10,2)").with_logical(LogicalType::Decimal);
/// assert_eq!(info.logical_type, Some(LogicalType::Decimal));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMappingInfo {
    /// Host-side type, if known.
    pub logical_type: Option<LogicalType>,
    /// Store type name as written in the model, if any.
    pub store_type_name: Option<String>,
    /// Requested facets.
    pub facets: Facets,
    /// Element mapping for collections.
    pub element_mapping: Option<Box<TypeMapping>>,
}

impl TypeMappingInfo {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a mapping for a logical type.
    pub fn for_logical(logical_type: LogicalType) -> Self {
        Self {
            logical_type: Some(logical_type),
            ..Self::default()
        }
    }

    /// Request a mapping for a store type name.
    pub fn for_store_type(name: impl Into<String>) -> Self {
        Self {
            store_type_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the logical type.
    pub fn with_logical(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = Some(logical_type);
        self
    }

    /// Set the store type name.
    pub fn with_store_type(mut self, name: impl Into<String>) -> Self {
        self.store_type_name = Some(name.into());
        self
    }

    /// Set the size facet.
    pub fn size(mut self, size: u32) -> Self {
        self.facets.size = Some(size);
        self
    }

    /// Set the precision facet.
    pub fn precision(mut self, precision: u32) -> Self {
        self.facets.precision = Some(precision);
        self
    }

    /// Set the scale facet.
    pub fn scale(mut self, scale: u32) -> Self {
        self.facets.scale = Some(scale);
        self
    }

    /// Set the unicode facet.
    pub fn unicode(mut self, unicode: bool) -> Self {
        self.facets.unicode = Some(unicode);
        self
    }

    /// Set the fixed-length facet.
    pub fn fixed_length(mut self, fixed_length: bool) -> Self {
        self.facets.fixed_length = Some(fixed_length);
        self
    }

    /// Attach an element mapping (collections).
    pub fn with_element(mut self, element: TypeMapping) -> Self {
        self.element_mapping = Some(Box::new(element));
        self
    }
}
