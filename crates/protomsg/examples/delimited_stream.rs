//! Writes a stream of length-delimited messages and reads it back.
//!
//! With a path argument the stream is written to that file; otherwise it
//! stays in memory.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::sync::Arc;

use protomsg::{
    DynamicMessage, FieldDescriptor, Label, Message, MessageBuilder, MessageDescriptor, ScalarType,
    missing_required_fields,
};

fn schema() -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("example.LogEntry")
        .field(FieldDescriptor::scalar(1, "sequence", Label::Required, ScalarType::UInt64))
        .field(FieldDescriptor::scalar(2, "message", Label::Optional, ScalarType::String))
        .field(FieldDescriptor::scalar(3, "tags", Label::Repeated, ScalarType::String))
        .field(FieldDescriptor::scalar(4, "latencies_us", Label::Repeated, ScalarType::UInt32).packed())
        .build()
        .expect("valid schema")
}

fn entry(schema: &Arc<MessageDescriptor>, sequence: u64, text: &str) -> DynamicMessage {
    let field = |name: &str| schema.field_by_name(name).expect("declared field");
    let mut builder = DynamicMessage::builder(schema);
    builder
        .set_scalar(field("sequence"), sequence)
        .and_then(|b| b.set_scalar(field("message"), text))
        .and_then(|b| b.add_repeated_scalar(field("tags"), "demo"))
        .expect("values match schema");
    for latency in [120u32, 95, 300] {
        builder
            .add_repeated_scalar(field("latencies_us"), latency + sequence as u32)
            .expect("values match schema");
    }
    builder.build().expect("required fields set")
}

fn main() {
    let schema = schema();
    let entries: Vec<DynamicMessage> = ["started", "listening", "accepted connection"]
        .iter()
        .enumerate()
        .map(|(i, text)| entry(&schema, i as u64, text))
        .collect();

    let path = std::env::args().nth(1);

    let bytes = match &path {
        Some(path) => {
            let file = File::create(path).expect("Failed to create file");
            let mut out = BufWriter::new(file);
            for e in &entries {
                e.write_delimited_to(&mut out).expect("Failed to write entry");
            }
            out.flush().expect("Failed to flush");
            std::fs::read(path).expect("Failed to read file back")
        }
        None => {
            let mut out = Vec::new();
            for e in &entries {
                e.write_delimited_to(&mut out).expect("Failed to write entry");
            }
            out
        }
    };
    println!("Wrote {} entries in {} bytes", entries.len(), bytes.len());

    let mut input = match &path {
        Some(path) => Box::new(BufReader::new(File::open(path).expect("Failed to open file")))
            as Box<dyn std::io::Read>,
        None => Box::new(Cursor::new(bytes)),
    };

    let mut count = 0;
    loop {
        match DynamicMessage::parse_delimited_from(&schema, &mut input) {
            Ok(Some(message)) => {
                count += 1;
                println!("--- entry {} ({} bytes) ---", count, message.serialized_size());
                print!("{}", message);
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read entry {}: {}", count + 1, e);
                std::process::exit(1);
            }
        }
    }

    // build_partial skips the required-field check
    let partial = DynamicMessage::builder(&schema).build_partial();
    println!("Missing in empty entry: {:?}", missing_required_fields(&partial));
}
