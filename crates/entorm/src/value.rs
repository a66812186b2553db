//! Bound values and the closed set of field types.
//!
//! Every mapped attribute resolves to one [`SemanticType`] when the entity
//! metadata is extracted. The same enum drives statement bindings (via
//! [`Value`]) and row scanning, so no runtime type inspection happens while
//! rows are mapped.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// `HH:MM:SS`
pub const TIME_LAYOUT: &str = "%H:%M:%S";
/// `YYYY-MM-DD`
pub const DATE_LAYOUT: &str = "%Y-%m-%d";
/// `YYYY-MM-DD HH:MM:SS`
pub const DATE_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// The semantic type of a mapped attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    String,
    SignedInt,
    UnsignedInt,
    Bool,
    Float,
    Temporal,
}

impl SemanticType {
    /// Coerce a raw driver value into the scan destination for this type.
    ///
    /// Text-protocol drivers report most columns as strings, so numeric and
    /// boolean destinations accept their textual form. Temporal destinations
    /// read text and parse it with the field's layout.
    pub fn scan(self, raw: Value, temporal: TemporalKind) -> Result<Value, String> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match self {
            SemanticType::String => Ok(Value::Text(match raw {
                Value::Text(s) => s,
                Value::Int(i) => i.to_string(),
                Value::UInt(u) => u.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Temporal(dt) => temporal.format(&dt),
                Value::Null => return Ok(Value::Null),
            })),
            SemanticType::SignedInt => match raw {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::UInt(u) => i64::try_from(u)
                    .map(Value::Int)
                    .map_err(|_| format!("{u} overflows a signed integer")),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| format!("cannot parse '{s}' as a signed integer: {e}")),
                other => Err(mismatch(&other, "a signed integer")),
            },
            SemanticType::UnsignedInt => match raw {
                Value::UInt(u) => Ok(Value::UInt(u)),
                Value::Int(i) => u64::try_from(i)
                    .map(Value::UInt)
                    .map_err(|_| format!("{i} does not fit an unsigned integer")),
                Value::Bool(b) => Ok(Value::UInt(u64::from(b))),
                Value::Text(s) => s
                    .trim()
                    .parse::<u64>()
                    .map(Value::UInt)
                    .map_err(|e| format!("cannot parse '{s}' as an unsigned integer: {e}")),
                other => Err(mismatch(&other, "an unsigned integer")),
            },
            SemanticType::Bool => match raw {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::Int(i) => Ok(Value::Bool(i != 0)),
                Value::UInt(u) => Ok(Value::Bool(u != 0)),
                Value::Text(s) => match s.trim() {
                    "1" | "t" | "true" | "TRUE" => Ok(Value::Bool(true)),
                    "0" | "f" | "false" | "FALSE" => Ok(Value::Bool(false)),
                    _ => Err(format!("cannot parse '{s}' as a boolean")),
                },
                other => Err(mismatch(&other, "a boolean")),
            },
            SemanticType::Float => match raw {
                Value::Float(f) => Ok(Value::Float(f)),
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::UInt(u) => Ok(Value::Float(u as f64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| format!("cannot parse '{s}' as a float: {e}")),
                other => Err(mismatch(&other, "a float")),
            },
            SemanticType::Temporal => match raw {
                Value::Temporal(dt) => Ok(Value::Temporal(dt)),
                Value::Text(s) => temporal.parse(&s).map(Value::Temporal).map_err(|e| {
                    format!("cannot parse '{s}' with layout '{}': {e}", temporal.layout())
                }),
                other => Err(mismatch(&other, "a temporal value")),
            },
        }
    }
}

fn mismatch(value: &Value, expected: &str) -> String {
    format!("cannot scan {} into {expected}", value.kind_name())
}

/// Which layout governs formatting and parsing of a temporal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemporalKind {
    Date,
    Time,
    #[default]
    DateTime,
}

impl TemporalKind {
    /// chrono format string for this kind.
    pub fn layout(self) -> &'static str {
        match self {
            TemporalKind::Date => DATE_LAYOUT,
            TemporalKind::Time => TIME_LAYOUT,
            TemporalKind::DateTime => DATE_TIME_LAYOUT,
        }
    }

    pub fn format(self, value: &NaiveDateTime) -> String {
        value.format(self.layout()).to_string()
    }

    /// Parse text written with [`TemporalKind::layout`].
    ///
    /// Date-only values land at midnight; time-only values land on the
    /// default date (1970-01-01).
    pub fn parse(self, text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        let text = text.trim();
        match self {
            TemporalKind::Date => {
                NaiveDate::parse_from_str(text, DATE_LAYOUT).map(|d| d.and_time(NaiveTime::MIN))
            }
            TemporalKind::Time => NaiveTime::parse_from_str(text, TIME_LAYOUT)
                .map(|t| NaiveDate::default().and_time(t)),
            TemporalKind::DateTime => NaiveDateTime::parse_from_str(text, DATE_TIME_LAYOUT),
        }
    }
}

/// A value bound to a statement placeholder or read from a result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Float(f64),
    Temporal(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Text(_) => "text",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Bool(_) => "boolean",
            Value::Float(_) => "float",
            Value::Temporal(_) => "temporal value",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

impl_from_for_value! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    bool => Bool as bool,
    f32 => Float as f64,
    f64 => Float as f64,
    String => Text as String,
    &str => Text as String,
    NaiveDateTime => Temporal as NaiveDateTime,
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion between a Rust attribute type and [`Value`].
///
/// Implemented for every supported attribute type; `#[derive(Entity)]`
/// relies on it to read and assign fields.
pub trait FieldValue: Sized {
    /// Semantic type this attribute maps to.
    const SEMANTIC: SemanticType;

    fn to_value(&self) -> Value;

    /// Convert a scanned value back into the attribute type.
    fn from_value(value: Value) -> Result<Self, String>;
}

macro_rules! impl_field_value_int {
    ($semantic:ident, $variant:ident, $wide:ty; $($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                const SEMANTIC: SemanticType = SemanticType::$semantic;

                fn to_value(&self) -> Value {
                    Value::$variant(<$wide>::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i)
                            .map_err(|_| format!("{i} is out of range for {}", stringify!($ty))),
                        Value::UInt(u) => <$ty>::try_from(u)
                            .map_err(|_| format!("{u} is out of range for {}", stringify!($ty))),
                        other => Err(mismatch(&other, stringify!($ty))),
                    }
                }
            }
        )*
    };
}

impl_field_value_int!(SignedInt, Int, i64; i8, i16, i32, i64);
impl_field_value_int!(UnsignedInt, UInt, u64; u8, u16, u32, u64);

impl FieldValue for isize {
    const SEMANTIC: SemanticType = SemanticType::SignedInt;

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        i64::from_value(value).and_then(|i| isize::try_from(i).map_err(|e| e.to_string()))
    }
}

impl FieldValue for usize {
    const SEMANTIC: SemanticType = SemanticType::UnsignedInt;

    fn to_value(&self) -> Value {
        Value::UInt(*self as u64)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        u64::from_value(value).and_then(|u| usize::try_from(u).map_err(|e| e.to_string()))
    }
}

impl FieldValue for String {
    const SEMANTIC: SemanticType = SemanticType::String;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl FieldValue for bool {
    const SEMANTIC: SemanticType = SemanticType::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(&other, "bool")),
        }
    }
}

impl FieldValue for f64 {
    const SEMANTIC: SemanticType = SemanticType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FieldValue for f32 {
    const SEMANTIC: SemanticType = SemanticType::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FieldValue for NaiveDateTime {
    const SEMANTIC: SemanticType = SemanticType::Temporal;

    fn to_value(&self) -> Value {
        Value::Temporal(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Temporal(dt) => Ok(dt),
            other => Err(mismatch(&other, "NaiveDateTime")),
        }
    }
}

impl FieldValue for NaiveDate {
    const SEMANTIC: SemanticType = SemanticType::Temporal;

    fn to_value(&self) -> Value {
        Value::Temporal(self.and_time(NaiveTime::MIN))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        NaiveDateTime::from_value(value).map(|dt| dt.date())
    }
}

impl FieldValue for NaiveTime {
    const SEMANTIC: SemanticType = SemanticType::Temporal;

    fn to_value(&self) -> Value {
        Value::Temporal(NaiveDate::default().and_time(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        NaiveDateTime::from_value(value).map(|dt| dt.time())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const SEMANTIC: SemanticType = T::SEMANTIC;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
