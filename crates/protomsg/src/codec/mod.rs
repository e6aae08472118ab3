//! Field-level wire encoding and the parse fold.
//!
//! [`value`] holds the per-type encodings shared by the size and write
//! loops; [`parse`] drives a [`Reader`](crate::wire::Reader) into a
//! message's field set, routing unrecognized numbers to its unknown
//! fields.

pub mod parse;
pub mod value;

pub use parse::{ParseTarget, merge_fields_from};
pub use value::{compute_field_size, write_field};
