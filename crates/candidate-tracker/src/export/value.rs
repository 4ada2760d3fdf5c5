use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Cell value produced by a column extractor.
///
/// Encoders switch on the variant instead of inspecting runtime types, so every
/// extractor has to decide up front how its field is represented.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Null,
    Integer(i128),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl ExportValue {
    /// Default textual rendering: empty for nulls, ISO-8601 for dates.
    pub fn to_text(&self) -> String {
        match self {
            ExportValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExportValue::Null)
    }
}

impl fmt::Display for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Null => Ok(()),
            ExportValue::Integer(value) => write!(f, "{value}"),
            ExportValue::Number(value) => write!(f, "{value}"),
            ExportValue::Bool(value) => write!(f, "{value}"),
            ExportValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            ExportValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S")),
            ExportValue::Text(value) => f.write_str(value),
        }
    }
}

macro_rules! integer_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ExportValue {
                fn from(value: $ty) -> Self {
                    ExportValue::Integer(value as i128)
                }
            }
        )*
    };
}

integer_from!(i32, i64, u8, u16, u32, u64, usize);

impl From<f32> for ExportValue {
    fn from(value: f32) -> Self {
        ExportValue::Number(f64::from(value))
    }
}

impl From<f64> for ExportValue {
    fn from(value: f64) -> Self {
        ExportValue::Number(value)
    }
}

impl From<bool> for ExportValue {
    fn from(value: bool) -> Self {
        ExportValue::Bool(value)
    }
}

impl From<NaiveDate> for ExportValue {
    fn from(value: NaiveDate) -> Self {
        ExportValue::Date(value)
    }
}

impl From<NaiveDateTime> for ExportValue {
    fn from(value: NaiveDateTime) -> Self {
        ExportValue::DateTime(value)
    }
}

impl From<String> for ExportValue {
    fn from(value: String) -> Self {
        ExportValue::Text(value)
    }
}

impl From<&str> for ExportValue {
    fn from(value: &str) -> Self {
        ExportValue::Text(value.to_string())
    }
}

impl<T> From<Option<T>> for ExportValue
where
    T: Into<ExportValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(ExportValue::Null, Into::into)
    }
}
