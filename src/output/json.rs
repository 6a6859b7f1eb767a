//! Array-of-records writer

use std::io::Write;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::record::Record;

/// Record object with null fields rendered as empty strings
pub fn record_object(record: &Record) -> Map<String, Value> {
    record
        .to_map()
        .into_iter()
        .map(|(k, v)| match v {
            Value::Null => (k, Value::String(String::new())),
            v => (k, v),
        })
        .collect()
}

/// Writes one JSON array across any number of record batches.
///
/// The opening bracket goes out with the first batch, a comma precedes every
/// element after the first, and [`JsonArrayWriter::finish`] closes the array
/// (writing `[]` when nothing was written).
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    opened: bool,
    count: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            opened: false,
            count: 0,
        }
    }

    fn open(&mut self) -> Result<()> {
        if !self.opened {
            self.writer.write_all(b"[")?;
            self.opened = true;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.open()?;
        if self.count > 0 {
            self.writer.write_all(b",")?;
        }
        self.writer.write_all(b"\n")?;
        serde_json::to_writer(&mut self.writer, &record_object(record))?;
        self.count += 1;
        Ok(())
    }

    pub fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        self.open()?;
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Close the array and flush; returns the element count
    pub fn finish(mut self) -> Result<usize> {
        self.open()?;
        if self.count > 0 {
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(b"]\n")?;
        self.writer.flush()?;
        Ok(self.count)
    }
}
