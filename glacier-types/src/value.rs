//! Runtime values that can be rendered as literals or bound as parameters.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::logical::LogicalType;

/// A value headed for the store, either inline as a literal or as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Unsigned integer value.
    UInt(u64),
    /// Floating point value.
    Float(f64),
    /// Exact decimal value.
    Decimal(Decimal),
    /// Text value.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Timestamp without time zone.
    DateTime(NaiveDateTime),
    /// Timestamp with a fixed offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// UUID, stored as text.
    Uuid(Uuid),
    /// Semi-structured value.
    Json(serde_json::Value),
}

impl StoreValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The logical type a value of this variant maps from. Null has none.
    pub fn logical_type(&self) -> Option<LogicalType> {
        Some(match self {
            Self::Null => return None,
            Self::Bool(_) => LogicalType::Bool,
            Self::Int(_) => LogicalType::I64,
            Self::UInt(_) => LogicalType::U64,
            Self::Float(_) => LogicalType::F64,
            Self::Decimal(_) => LogicalType::Decimal,
            Self::String(_) => LogicalType::String,
            Self::Bytes(_) => LogicalType::Bytes,
            Self::Date(_) => LogicalType::Date,
            Self::Time(_) => LogicalType::Time,
            Self::DateTime(_) => LogicalType::DateTime,
            Self::DateTimeOffset(_) => LogicalType::DateTimeOffset,
            Self::Uuid(_) => LogicalType::Uuid,
            Self::Json(_) => LogicalType::Json,
        })
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for StoreValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for StoreValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for StoreValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for StoreValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for StoreValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for StoreValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for StoreValue {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for StoreValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for StoreValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTimeOffset(v)
    }
}

impl From<Uuid> for StoreValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<serde_json::Value> for StoreValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<StoreValue>> From<Option<T>> for StoreValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
