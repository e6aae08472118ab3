//! Decoder safety limits.

/// Maximum encoded length of a varint (64-bit value).
pub const MAX_VARINT_BYTES: usize = 10;

/// Default depth of nested messages and groups accepted by the parser.
pub const DEFAULT_RECURSION_LIMIT: usize = 64;

/// Default upper bound on the size of a single encoded message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 20;

/// Largest legal field number (29 bits).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Runtime parse limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of messages and groups.
    pub recursion_limit: usize,
    /// Maximum size of any length-delimited payload or whole input.
    pub max_message_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
