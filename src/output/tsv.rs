//! Tab-delimited record writer

use std::io::Write;

use crate::error::Result;
use crate::record::{FIELDS, Record};

/// Writes records as tab-delimited rows in canonical column order.
///
/// The header goes out once, before the first row or at [`TsvWriter::finish`]
/// when no row was written. A writer appending to a non-empty destination is
/// created with `write_header = false`.
pub struct TsvWriter<W: Write> {
    writer: csv::Writer<W>,
    header_pending: bool,
    rows: usize,
}

fn terminator() -> csv::Terminator {
    if cfg!(windows) {
        csv::Terminator::CRLF
    } else {
        csv::Terminator::Any(b'\n')
    }
}

impl<W: Write> TsvWriter<W> {
    pub fn new(inner: W, write_header: bool) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(terminator())
            .has_headers(false)
            .from_writer(inner);
        Self {
            writer,
            header_pending: write_header,
            rows: 0,
        }
    }

    fn header(&mut self) -> Result<()> {
        if self.header_pending {
            self.writer.write_record(FIELDS.iter().map(|f| f.name))?;
            self.header_pending = false;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.header()?;
        self.writer.write_record(record.to_row())?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Write a pending header, flush, and return the row count
    pub fn finish(mut self) -> Result<usize> {
        self.header()?;
        self.flush()?;
        Ok(self.rows)
    }
}
