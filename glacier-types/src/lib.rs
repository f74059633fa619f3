//! # glacier-types
//!
//! Snowflake type mappings for the Glacier dialect layer.
//!
//! This crate answers one question: for a host-side type request, which
//! Snowflake store type applies, and how are values of it written as literals
//! and bound as parameters.
//!
//! ```rust
//! use glacier_types::{LogicalType, TypeMappingInfo, TypeMappingSource};
//!
//! let source = TypeMappingSource::shared();
//!
//! // Store type names are alias-normalized
//! let mapping = source.find_store_type("string(100)").unwrap();
//! assert_eq!(mapping.store_type(), "VARCHAR(100)");
//!
//! // Numeric families pick integer or fractional mappings by scale
//! let mapping = source.find_store_type("NUMBER(10,2)").unwrap();
//! assert_eq!(mapping.logical_type(), LogicalType::Decimal);
//!
//! // Logical-only requests fall back to defaults with facets applied
//! let info = TypeMappingInfo::for_logical(LogicalType::DateTime).precision(3);
//! assert_eq!(source.resolve(&info).unwrap().store_type(), "TIMESTAMP_NTZ(3)");
//! ```
//!
//! A miss is `None`, not an error; [`TypeMappingSource::find_or_err`] turns
//! it into [`TypeError::Unmapped`] for callers that want one.

pub mod error;
pub mod facets;
pub mod literal;
pub mod logical;
pub mod mapping;
pub mod source;
pub mod store_type;
pub mod value;

pub use error::{TypeError, TypeResult};
pub use facets::{Facets, TypeMappingInfo};
pub use literal::quote_string;
pub use logical::LogicalType;
pub use mapping::{
    BindingType, DbParameter, FacetSlot, MAX_BINARY_LENGTH, MAX_VARCHAR_LENGTH, MappingKind,
    TypeMapping, ValueConverter,
};
pub use source::TypeMappingSource;
pub use store_type::{StoreTypeName, TypeFamily};
pub use value::StoreValue;
