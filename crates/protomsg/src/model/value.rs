//! Field values.
//!
//! A set field holds exactly one of four shapes: a scalar, a list of
//! scalars, an embedded message, or a list of embedded messages.

use std::hash::{Hash, Hasher};

use crate::descriptor::ScalarType;
use crate::message::DynamicMessage;

/// A single scalar value.
///
/// Floating point values compare and hash by bit pattern, so `NaN`
/// equals itself and `0.0` differs from `-0.0`. This keeps equality
/// consistent with hashing and with the encoded bytes.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Raw enum number; names are not tracked at this layer.
    EnumNumber(i32),
}

impl Value {
    /// Returns the zero value stored by a field of the given type.
    pub fn default_for(scalar_type: ScalarType) -> Value {
        match scalar_type {
            ScalarType::Double => Value::F64(0.0),
            ScalarType::Float => Value::F32(0.0),
            ScalarType::Int32 | ScalarType::SInt32 | ScalarType::SFixed32 => Value::I32(0),
            ScalarType::Int64 | ScalarType::SInt64 | ScalarType::SFixed64 => Value::I64(0),
            ScalarType::UInt32 | ScalarType::Fixed32 => Value::U32(0),
            ScalarType::UInt64 | ScalarType::Fixed64 => Value::U64(0),
            ScalarType::Bool => Value::Bool(false),
            ScalarType::String => Value::String(String::new()),
            ScalarType::Bytes => Value::Bytes(Vec::new()),
            ScalarType::Enum => Value::EnumNumber(0),
        }
    }

    /// Returns true if this value can be stored in a field of the given type.
    pub fn is_valid_for(&self, scalar_type: ScalarType) -> bool {
        matches!(
            (self, scalar_type),
            (Value::F64(_), ScalarType::Double)
                | (Value::F32(_), ScalarType::Float)
                | (Value::I32(_), ScalarType::Int32 | ScalarType::SInt32 | ScalarType::SFixed32)
                | (Value::I64(_), ScalarType::Int64 | ScalarType::SInt64 | ScalarType::SFixed64)
                | (Value::U32(_), ScalarType::UInt32 | ScalarType::Fixed32)
                | (Value::U64(_), ScalarType::UInt64 | ScalarType::Fixed64)
                | (Value::Bool(_), ScalarType::Bool)
                | (Value::String(_), ScalarType::String)
                | (Value::Bytes(_), ScalarType::Bytes)
                | (Value::EnumNumber(_), ScalarType::Enum)
        )
    }

    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum",
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) | Value::EnumNumber(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::EnumNumber(a), Value::EnumNumber(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::I32(v) | Value::EnumNumber(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::U32(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

/// The content of one set field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Scalar(Value),
    RepeatedScalar(Vec<Value>),
    Message(DynamicMessage),
    RepeatedMessage(Vec<DynamicMessage>),
}

impl FieldValue {
    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Scalar(_) => "scalar",
            FieldValue::RepeatedScalar(_) => "repeated scalar",
            FieldValue::Message(_) => "message",
            FieldValue::RepeatedMessage(_) => "repeated message",
        }
    }

    /// Number of elements; 1 for singular values.
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Scalar(_) | FieldValue::Message(_) => 1,
            FieldValue::RepeatedScalar(v) => v.len(),
            FieldValue::RepeatedMessage(v) => v.len(),
        }
    }

    /// True for an empty repeated list.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            FieldValue::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_scalar_list(&self) -> Option<&[Value]> {
        match self {
            FieldValue::RepeatedScalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message_list(&self) -> Option<&[DynamicMessage]> {
        match self {
            FieldValue::RepeatedMessage(v) => Some(v),
            _ => None,
        }
    }
}
