//! Error types for message encoding, decoding, merging and building.

use thiserror::Error;

/// Stable error codes for malformed wire data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// W001: Input ended in the middle of a value
    Truncated,
    /// W002: Varint or tag could not be decoded
    MalformedVarint,
    /// W003: Tag or wire type is not valid
    InvalidTag,
    /// W004: Message did not end where it should have
    InvalidEndTag,
    /// W005: A decoder limit was exceeded
    LimitExceeded,
    /// W006: Invalid UTF-8 encoding
    InvalidUtf8,
    /// W007: Parsed message lacks required fields
    MissingRequiredFields,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::Truncated => "W001",
            ErrorCode::MalformedVarint => "W002",
            ErrorCode::InvalidTag => "W003",
            ErrorCode::InvalidEndTag => "W004",
            ErrorCode::LimitExceeded => "W005",
            ErrorCode::InvalidUtf8 => "W006",
            ErrorCode::MissingRequiredFields => "W007",
        }
    }
}

/// Malformed wire data detected while decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === W001: Truncated ===
    #[error("[W001] unexpected end of input while reading {context}")]
    Truncated { context: &'static str },

    #[error("[W001] delimited message declared {declared} bytes but the stream ended after {read}")]
    TruncatedDelimited { declared: usize, read: usize },

    // === W002: Malformed varint ===
    #[error("[W002] varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    // === W003: Invalid tag ===
    #[error("[W003] invalid tag: field number 0")]
    InvalidTag,

    #[error("[W003] invalid wire type {wire_type} in tag {tag}")]
    InvalidWireType { tag: u32, wire_type: u32 },

    // === W004: Invalid end tag ===
    #[error("[W004] message ended with tag {last_tag} instead of the end-of-input marker")]
    InvalidEndTag { last_tag: u32 },

    #[error("[W004] group for field {number} was not closed by a matching end-group tag")]
    UnterminatedGroup { number: u32 },

    // === W005: Limits ===
    #[error("[W005] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[W005] message nesting exceeds the recursion limit of {limit}")]
    RecursionLimitExceeded { limit: usize },

    // === W006: Invalid UTF-8 ===
    #[error("[W006] invalid UTF-8 in string field {field}")]
    InvalidUtf8 { field: String },

    // === W007: Missing required fields ===
    #[error("[W007] parsed message of type {message_type} is missing required fields")]
    MissingRequiredFields { message_type: String },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::Truncated { .. } | DecodeError::TruncatedDelimited { .. } => {
                ErrorCode::Truncated
            }
            DecodeError::VarintTooLong => ErrorCode::MalformedVarint,
            DecodeError::InvalidTag | DecodeError::InvalidWireType { .. } => ErrorCode::InvalidTag,
            DecodeError::InvalidEndTag { .. } | DecodeError::UnterminatedGroup { .. } => {
                ErrorCode::InvalidEndTag
            }
            DecodeError::LengthExceedsLimit { .. } | DecodeError::RecursionLimitExceeded { .. } => {
                ErrorCode::LimitExceeded
            }
            DecodeError::InvalidUtf8 { .. } => ErrorCode::InvalidUtf8,
            DecodeError::MissingRequiredFields { .. } => ErrorCode::MissingRequiredFields,
        }
    }
}

/// Failure while reading a message from an I/O stream.
///
/// Transport errors are passed through untouched.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A message of one type was merged into a builder of another.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot merge a message of type {found} into a builder of type {expected}")]
pub struct TypeMismatchError {
    pub expected: String,
    pub found: String,
}

/// `build()` was called while required fields were missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("message of type {type_name} is missing required fields")]
pub struct UninitializedMessageError {
    pub type_name: String,
}

impl UninitializedMessageError {
    /// Converts to the error reported when parsed input lacks required fields.
    pub fn into_decode_error(self) -> DecodeError {
        DecodeError::MissingRequiredFields {
            message_type: self.type_name,
        }
    }
}

/// Caller error in a reflective field mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field {field} does not belong to message type {message_type}")]
    NotInMessage { field: String, message_type: String },

    #[error("value of kind {found} cannot be stored in field {field} of kind {expected}")]
    KindMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("message of type {found} cannot be stored in field {field} of type {expected}")]
    MessageTypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("field {field} is not repeated")]
    NotRepeated { field: String },

    #[error("field {field} is repeated")]
    Repeated { field: String },

    #[error("index {index} out of bounds for repeated field {field} (len: {len})")]
    IndexOutOfBounds {
        field: String,
        index: usize,
        len: usize,
    },
}

/// Inconsistent schema description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("field number {number} of {field} is outside 1..=536870911")]
    InvalidFieldNumber { field: String, number: u32 },

    #[error("message {message} declares field number {number} twice")]
    DuplicateFieldNumber { message: String, number: u32 },

    #[error("message {message} declares field name {name} twice")]
    DuplicateFieldName { message: String, name: String },

    #[error("field {field} is marked packed but {reason}")]
    InvalidPacked { field: String, reason: &'static str },

    #[error("default value for field {field} does not match its type")]
    InvalidDefault { field: String },

    #[error("extension {field} number {number} is not in an extension range of {message}")]
    ExtensionOutOfRange {
        field: String,
        message: String,
        number: u32,
    },

    #[error("extension {field} number {number} is already a declared field of {message}")]
    ExtensionNumberTaken {
        field: String,
        message: String,
        number: u32,
    },

    #[error("message {message} declares field number {number} inside extension range {start}..{end}")]
    ExtensionRangeOverlapsField {
        message: String,
        number: u32,
        start: u32,
        end: u32,
    },
}
