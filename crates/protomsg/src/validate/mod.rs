//! Initialization diagnostics.
//!
//! [`Message::is_initialized`] answers yes or no and stops at the first
//! problem. When a caller needs to know which fields are missing, this
//! module walks the same fields and reports every one of them.

use crate::descriptor::{FieldDescriptor, MessageDescriptor};
use crate::message::Message;
use crate::model::{FieldSet, FieldValue};

/// Returns the path of every required field that is not set.
///
/// Paths are dotted from the root: `"child.a"` for a field of a singular
/// embedded message, `"repeated_child[1].b"` for an element of a repeated
/// one. Extensions appear as `"(full.name)"`. An empty result means the
/// message is initialized.
pub fn missing_required_fields<M: Message>(message: &M) -> Vec<String> {
    let mut missing = Vec::new();
    collect_missing(message.descriptor(), message.fields(), "", &mut missing);
    missing
}

fn collect_missing(
    descriptor: &MessageDescriptor,
    fields: &FieldSet,
    prefix: &str,
    missing: &mut Vec<String>,
) {
    for field in descriptor.fields() {
        if field.is_required() && !fields.has_field(field) {
            missing.push(format!("{}{}", prefix, field.name()));
        }
    }

    for (field, value) in fields.iter() {
        match value {
            FieldValue::Message(m) => {
                let nested = format!("{}{}.", prefix, path_name(field));
                collect_missing(m.descriptor(), m.fields(), &nested, missing);
            }
            FieldValue::RepeatedMessage(ms) => {
                for (i, m) in ms.iter().enumerate() {
                    let nested = format!("{}{}[{}].", prefix, path_name(field), i);
                    collect_missing(m.descriptor(), m.fields(), &nested, missing);
                }
            }
            FieldValue::Scalar(_) | FieldValue::RepeatedScalar(_) => {}
        }
    }
}

fn path_name(field: &FieldDescriptor) -> String {
    if field.is_extension() {
        format!("({})", field.full_name())
    } else {
        field.name().to_string()
    }
}
