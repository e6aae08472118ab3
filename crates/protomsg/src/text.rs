//! Text rendering of messages.
//!
//! Produces the protobuf text format: one `name: value` line per scalar
//! element, `name {` ... `}` blocks for embedded messages indented by two
//! spaces, `[full.name]` for extensions, and unknown fields by number.
//! Strings and bytes are double-quoted with C-style escapes.

use std::fmt::{self, Write};

use crate::descriptor::{FieldDescriptor, FieldType};
use crate::message::Message;
use crate::model::{FieldSet, FieldValue, UnknownFieldSet, UnknownValue, Value};

/// Writes `message` in text format to `out`.
pub fn print<M: Message, W: Write>(message: &M, out: &mut W) -> fmt::Result {
    let mut printer = Printer { out, indent: 0 };
    printer.print_fields(message.fields())?;
    printer.print_unknown(message.unknown_fields())
}

/// Renders `message` in text format.
pub fn to_text<M: Message>(message: &M) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = print(message, &mut out);
    out
}

/// Escapes bytes for a double-quoted text-format literal.
///
/// Printable ASCII is kept, the usual control characters use their
/// short escapes, and everything else becomes a three-digit octal escape.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            0x0C => out.push_str("\\f"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x0B => out.push_str("\\v"),
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

struct Printer<'w, W> {
    out: &'w mut W,
    indent: usize,
}

impl<W: Write> Printer<'_, W> {
    fn print_fields(&mut self, fields: &FieldSet) -> fmt::Result {
        for (field, value) in fields.iter() {
            let name = field_name(field);
            match value {
                FieldValue::Scalar(v) => self.print_scalar(&name, v)?,
                FieldValue::RepeatedScalar(vs) => {
                    for v in vs {
                        self.print_scalar(&name, v)?;
                    }
                }
                FieldValue::Message(m) => self.print_block(&name, |p| {
                    p.print_fields(m.fields())?;
                    p.print_unknown(m.unknown_fields())
                })?,
                FieldValue::RepeatedMessage(ms) => {
                    for m in ms {
                        self.print_block(&name, |p| {
                            p.print_fields(m.fields())?;
                            p.print_unknown(m.unknown_fields())
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    fn print_unknown(&mut self, unknown: &UnknownFieldSet) -> fmt::Result {
        for (number, values) in unknown.iter() {
            let name = number.to_string();
            for value in values {
                match value {
                    UnknownValue::Varint(v) => self.print_line(&name, format_args!("{}", v))?,
                    UnknownValue::Fixed32(v) => self.print_line(&name, format_args!("0x{:08x}", v))?,
                    UnknownValue::Fixed64(v) => self.print_line(&name, format_args!("0x{:016x}", v))?,
                    UnknownValue::LengthDelimited(bytes) => {
                        self.print_line(&name, format_args!("\"{}\"", escape_bytes(bytes)))?
                    }
                    UnknownValue::Group(group) => self.print_block(&name, |p| p.print_unknown(group))?,
                }
            }
        }
        Ok(())
    }

    fn print_scalar(&mut self, name: &str, value: &Value) -> fmt::Result {
        match value {
            Value::Bool(v) => self.print_line(name, format_args!("{}", v)),
            Value::I32(v) | Value::EnumNumber(v) => self.print_line(name, format_args!("{}", v)),
            Value::I64(v) => self.print_line(name, format_args!("{}", v)),
            Value::U32(v) => self.print_line(name, format_args!("{}", v)),
            Value::U64(v) => self.print_line(name, format_args!("{}", v)),
            Value::F32(v) => self.print_line(name, format_args!("{}", format_float(*v))),
            Value::F64(v) => self.print_line(name, format_args!("{}", format_float(*v))),
            Value::String(s) => self.print_line(name, format_args!("\"{}\"", escape_bytes(s.as_bytes()))),
            Value::Bytes(b) => self.print_line(name, format_args!("\"{}\"", escape_bytes(b))),
        }
    }

    fn print_line(&mut self, name: &str, value: fmt::Arguments<'_>) -> fmt::Result {
        self.write_indent()?;
        writeln!(self.out, "{}: {}", name, value)
    }

    fn print_block(&mut self, name: &str, body: impl FnOnce(&mut Self) -> fmt::Result) -> fmt::Result {
        self.write_indent()?;
        writeln!(self.out, "{} {{", name)?;
        self.indent += 1;
        body(self)?;
        self.indent -= 1;
        self.write_indent()?;
        self.out.write_str("}\n")
    }

    fn write_indent(&mut self) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.write_str("  ")?;
        }
        Ok(())
    }
}

fn field_name(field: &FieldDescriptor) -> String {
    if field.is_extension() {
        return format!("[{}]", field.full_name());
    }
    match field.field_type() {
        // Groups are printed under their type name
        FieldType::Group(m) => m.name().to_string(),
        _ => field.name().to_string(),
    }
}

fn format_float<F: Copy + fmt::Debug + Into<f64>>(v: F) -> String {
    let wide: f64 = v.into();
    if wide.is_nan() {
        "nan".to_string()
    } else if wide.is_infinite() {
        if wide > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{:?}", v)
    }
}
