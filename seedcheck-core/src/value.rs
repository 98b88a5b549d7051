//! Typed field values and string coercion

use crate::error::CoercionError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// FIELD TYPE
// ============================================================================

/// Declared value type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Text,
    Uuid,
    Timestamp,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Bool => "Bool",
            FieldType::Int => "Int",
            FieldType::Float => "Float",
            FieldType::Text => "Text",
            FieldType::Uuid => "Uuid",
            FieldType::Timestamp => "Timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FIELD VALUE
// ============================================================================

/// A single dynamically typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(Timestamp),
}

impl FieldValue {
    /// Type of the value, `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(FieldType::Bool),
            FieldValue::Int(_) => Some(FieldType::Int),
            FieldValue::Float(_) => Some(FieldType::Float),
            FieldValue::Text(_) => Some(FieldType::Text),
            FieldValue::Uuid(_) => Some(FieldType::Uuid),
            FieldValue::Timestamp(_) => Some(FieldType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert this value to `target`.
    ///
    /// `Null` passes through unchanged; whether a field accepts it is the
    /// accessor's decision. Text is parsed strictly and never trimmed.
    pub fn coerce(&self, target: FieldType) -> Result<FieldValue, CoercionError> {
        if self.field_type() == Some(target) || self.is_null() {
            return Ok(self.clone());
        }

        match (self, target) {
            (FieldValue::Text(text), _) => Self::parse(text, target),
            (_, FieldType::Text) => Ok(FieldValue::Text(self.to_string())),
            (FieldValue::Int(i), FieldType::Float) => Ok(FieldValue::Float(*i as f64)),
            (FieldValue::Float(f), FieldType::Int) => {
                // i64::MAX as f64 rounds up to 2^63, which is out of range
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Ok(FieldValue::Int(*f as i64))
                } else {
                    Err(CoercionError::new(
                        self.to_string(),
                        target,
                        "not an integral value in range",
                    ))
                }
            }
            _ => Err(CoercionError::new(
                self.to_string(),
                target,
                format!(
                    "no conversion from {}",
                    self.field_type().map(|t| t.as_str()).unwrap_or("Null")
                ),
            )),
        }
    }

    /// Parse table text as a value of type `target`.
    pub fn parse(text: &str, target: FieldType) -> Result<FieldValue, CoercionError> {
        let fail = |reason: String| CoercionError::new(text, target, reason);
        match target {
            FieldType::Text => Ok(FieldValue::Text(text.to_string())),
            FieldType::Bool => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(FieldValue::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(FieldValue::Bool(false))
                } else {
                    Err(fail("expected true or false".to_string()))
                }
            }
            FieldType::Int => text
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|e| fail(e.to_string())),
            FieldType::Float => text
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|e| fail(e.to_string())),
            FieldType::Uuid => Uuid::parse_str(text)
                .map(FieldValue::Uuid)
                .map_err(|e| fail(e.to_string())),
            FieldType::Timestamp => {
                if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
                    return Ok(FieldValue::Timestamp(ts.with_timezone(&Utc)));
                }
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|e| fail(e.to_string()))
                    .and_then(|date| {
                        date.and_hms_opt(0, 0, 0)
                            .map(|naive| FieldValue::Timestamp(naive.and_utc()))
                            .ok_or_else(|| fail("date has no midnight".to_string()))
                    })
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Uuid(u) => write!(f, "{}", u),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<V: Into<FieldValue>> From<Option<V>> for FieldValue {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

// ============================================================================
// FIELD DATA (Rust field type <-> FieldValue)
// ============================================================================

/// Rust types that can back an entity property.
pub trait FieldData: Sized {
    const FIELD_TYPE: FieldType;
    const NULLABLE: bool = false;

    fn to_field_value(&self) -> FieldValue;

    fn from_field_value(value: FieldValue) -> Result<Self, CoercionError>;
}

fn null_rejected(target: FieldType) -> CoercionError {
    CoercionError::new("null", target, "field is not nullable")
}

macro_rules! impl_field_data {
    ($ty:ty, $field_type:ident, $variant:ident) => {
        impl FieldData for $ty {
            const FIELD_TYPE: FieldType = FieldType::$field_type;

            fn to_field_value(&self) -> FieldValue {
                FieldValue::$variant(self.clone())
            }

            fn from_field_value(value: FieldValue) -> Result<Self, CoercionError> {
                match value.coerce(Self::FIELD_TYPE)? {
                    FieldValue::$variant(v) => Ok(v),
                    FieldValue::Null => Err(null_rejected(Self::FIELD_TYPE)),
                    other => Err(CoercionError::new(
                        other.to_string(),
                        Self::FIELD_TYPE,
                        "unexpected value after conversion",
                    )),
                }
            }
        }
    };
}

impl_field_data!(bool, Bool, Bool);
impl_field_data!(i64, Int, Int);
impl_field_data!(f64, Float, Float);
impl_field_data!(String, Text, Text);
impl_field_data!(Uuid, Uuid, Uuid);
impl_field_data!(Timestamp, Timestamp, Timestamp);

impl FieldData for i32 {
    const FIELD_TYPE: FieldType = FieldType::Int;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Int(i64::from(*self))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CoercionError> {
        let wide = i64::from_field_value(value)?;
        i32::try_from(wide)
            .map_err(|_| CoercionError::new(wide.to_string(), FieldType::Int, "out of range for i32"))
    }
}

impl<V: FieldData> FieldData for Option<V> {
    const FIELD_TYPE: FieldType = V::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field_value(),
            None => FieldValue::Null,
        }
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CoercionError> {
        if value.is_null() {
            Ok(None)
        } else {
            V::from_field_value(value).map(Some)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
