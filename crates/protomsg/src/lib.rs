//! protomsg: a schema-driven protocol buffers message runtime.
//!
//! This crate provides the generic half of a protobuf implementation:
//! messages described at runtime by descriptors, with merge, size,
//! serialization and parsing written once against a uniform field map.
//!
//! # Overview
//!
//! - **Immutable messages, mutable builders**: a [`DynamicMessage`] is built
//!   once by a [`DynamicMessageBuilder`] and never changes afterwards
//! - **Bit-exact wire format**: varint/fixed/length-delimited/group framing,
//!   packed repeated scalars, and length-prefixed stream framing
//! - **Lossless**: fields the schema does not know are carried through as
//!   raw unknown fields and written back unchanged
//!
//! # Quick Start
//!
//! ```rust
//! use protomsg::{
//!     DynamicMessage, FieldDescriptor, Label, Message, MessageBuilder, MessageDescriptor,
//!     ScalarType,
//! };
//!
//! let person = MessageDescriptor::builder("example.Person")
//!     .field(FieldDescriptor::scalar(1, "name", Label::Required, ScalarType::String))
//!     .field(FieldDescriptor::scalar(2, "scores", Label::Repeated, ScalarType::Int32).packed())
//!     .build()
//!     .unwrap();
//!
//! let mut builder = DynamicMessage::builder(&person);
//! builder
//!     .set_scalar(person.field_by_name("name").unwrap(), "Alice")
//!     .unwrap()
//!     .add_repeated_scalar(person.field_by_name("scores").unwrap(), 90)
//!     .unwrap();
//! let message = builder.build().unwrap();
//!
//! // Encode to binary
//! let bytes = message.to_bytes();
//! assert_eq!(bytes.len(), message.serialized_size());
//!
//! // Decode back
//! let decoded = DynamicMessage::parse_from_bytes(&person, &bytes).unwrap();
//! assert_eq!(message, decoded);
//! ```
//!
//! # Modules
//!
//! - [`wire`]: Tags, varints, fixed-width values and bounded stream reads
//! - [`descriptor`]: Field and message descriptors, extension registry
//! - [`model`]: Field values, field sets and unknown field sets
//! - [`codec`]: Per-field encoding and the parse loop
//! - [`message`]: The message/builder traits and [`DynamicMessage`]
//! - [`text`]: Text format rendering
//! - [`validate`]: Missing required field diagnostics
//! - [`error`]: Error types
//! - [`limits`]: Security limits for decoding
//!
//! # Security
//!
//! The parser is designed to safely handle untrusted input:
//! - Nesting depth and payload sizes are bounded by [`ParseOptions`]
//! - Varints are limited to 10 bytes
//! - Delimited reads never consume past their declared length
//! - Invalid data is rejected with descriptive errors

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod limits;
pub mod message;
pub mod model;
pub mod text;
pub mod validate;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types at crate root
pub use descriptor::{
    ExtensionRegistry, FieldDescriptor, FieldType, Label, MessageDescriptor,
    MessageDescriptorBuilder, ScalarType,
};
pub use error::{
    DecodeError, DescriptorError, ErrorCode, FieldError, StreamError, TypeMismatchError,
    UninitializedMessageError,
};
pub use limits::ParseOptions;
pub use message::{DynamicMessage, DynamicMessageBuilder, ElementRef, Message, MessageBuilder};
pub use model::{FieldSet, FieldValue, UnknownFieldSet, UnknownValue, Value};
pub use validate::missing_required_fields;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
