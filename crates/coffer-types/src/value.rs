use std::collections::BTreeMap;
use std::fmt;

use crate::error::{KvsError, KvsResult};

/// Key to [`Value`] mapping.
///
/// A `BTreeMap` keeps key iteration in lexicographic byte order, which the
/// snapshot encoding relies on for byte-identical output.
pub type ValueMap = BTreeMap<String, Value>;

/// A value held by the store.
///
/// The tag and payload always agree; numeric tags stay distinct even when
/// the magnitudes are equal (`I32(1)` and `I64(1)` are different values).
/// Arrays and objects may be empty and nest arbitrarily deep.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent payload.
    Null,

    /// Boolean.
    Bool(bool),

    /// 32-bit signed integer.
    I32(i32),

    /// 32-bit unsigned integer.
    U32(u32),

    /// 64-bit signed integer.
    I64(i64),

    /// 64-bit unsigned integer.
    U64(u64),

    /// 64-bit binary floating point.
    F64(f64),

    /// UTF-8 text.
    String(String),

    /// Ordered sequence of values.
    Array(Vec<Value>),

    /// Mapping from unique UTF-8 keys to values.
    Object(ValueMap),
}

/// Discriminant of a [`Value`], named by its wire tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Null,
    Bool,
    I32,
    U32,
    I64,
    U64,
    F64,
    String,
    Array,
    Object,
}

impl ValueTag {
    /// Wire name of the tag, as written into snapshot payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F64 => "f64",
            Self::String => "str",
            Self::Array => "arr",
            Self::Object => "obj",
        }
    }

    /// Parse a wire tag name.
    pub fn from_str(tag: &str) -> Option<Self> {
        match tag {
            "null" => Some(Self::Null),
            "bool" => Some(Self::Bool),
            "i32" => Some(Self::I32),
            "u32" => Some(Self::U32),
            "i64" => Some(Self::I64),
            "u64" => Some(Self::U64),
            "f64" => Some(Self::F64),
            "str" => Some(Self::String),
            "arr" => Some(Self::Array),
            "obj" => Some(Self::Object),
            _ => None,
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// The tag of this value.
    pub fn tag(&self) -> ValueTag {
        match self {
            Self::Null => ValueTag::Null,
            Self::Bool(_) => ValueTag::Bool,
            Self::I32(_) => ValueTag::I32,
            Self::U32(_) => ValueTag::U32,
            Self::I64(_) => ValueTag::I64,
            Self::U64(_) => ValueTag::U64,
            Self::F64(_) => ValueTag::F64,
            Self::String(_) => ValueTag::String,
            Self::Array(_) => ValueTag::Array,
            Self::Object(_) => ValueTag::Object,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the string payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the array payload, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the object payload, if this is an `Object`.
    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Check that the value, recursively, stays within the representable
    /// domain of the snapshot encoding (no non-finite floats).
    pub fn validate(&self) -> KvsResult<()> {
        match self {
            Self::F64(n) if !n.is_finite() => {
                Err(KvsError::InvalidValue(format!("non-finite f64: {n}")))
            }
            Self::Array(items) => items.iter().try_for_each(Value::validate),
            Self::Object(map) => map.values().try_for_each(Value::validate),
            _ => Ok(()),
        }
    }
}

// From<T> constructors for each carried Rust type.
macro_rules! impl_from_for_value {
    ($from:ty, $variant:ident) => {
        impl From<$from> for Value {
            fn from(payload: $from) -> Self {
                Value::$variant(payload)
            }
        }
    };
}

impl_from_for_value!(bool, Bool);
impl_from_for_value!(i32, I32);
impl_from_for_value!(u32, U32);
impl_from_for_value!(i64, I64);
impl_from_for_value!(u64, U64);
impl_from_for_value!(f64, F64);
impl_from_for_value!(String, String);
impl_from_for_value!(Vec<Value>, Array);
impl_from_for_value!(ValueMap, Object);

impl From<&str> for Value {
    fn from(payload: &str) -> Self {
        Value::String(payload.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

// Typed extraction; a tag mismatch is a semantic validation failure.
macro_rules! impl_try_from_value {
    ($to:ty, $variant:ident) => {
        impl TryFrom<&Value> for $to {
            type Error = KvsError;

            fn try_from(value: &Value) -> KvsResult<Self> {
                match value {
                    Value::$variant(payload) => Ok(payload.clone()),
                    other => Err(KvsError::ValidationFailed(format!(
                        "expected {}, got {}",
                        stringify!($to),
                        other.tag()
                    ))),
                }
            }
        }
    };
}

impl_try_from_value!(bool, Bool);
impl_try_from_value!(i32, I32);
impl_try_from_value!(u32, U32);
impl_try_from_value!(i64, I64);
impl_try_from_value!(u64, U64);
impl_try_from_value!(f64, F64);
impl_try_from_value!(String, String);
impl_try_from_value!(Vec<Value>, Array);
impl_try_from_value!(ValueMap, Object);

impl TryFrom<&Value> for () {
    type Error = KvsError;

    fn try_from(value: &Value) -> KvsResult<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(KvsError::ValidationFailed(format!(
                "expected null, got {}",
                other.tag()
            ))),
        }
    }
}
