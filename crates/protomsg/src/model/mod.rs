//! In-memory message content: field values, the field set that holds
//! them, and raw unknown fields.

pub mod field_set;
pub mod unknown;
pub mod value;

pub use field_set::FieldSet;
pub use unknown::{UnknownFieldSet, UnknownValue};
pub use value::{FieldValue, Value};
