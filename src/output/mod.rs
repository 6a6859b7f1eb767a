//! Record serializers
//!
//! This module provides:
//! - `TsvWriter`: tab-delimited rows with a single header line
//! - `JsonArrayWriter`: one JSON array written across record batches
//! - `InteractiveSummary`: records grouped by input and tool configuration
//! - `schema`: JSON Schema of the canonical record and the grouped summary
//!
//! [`open_destination`] resolves where output goes and whether an existing
//! file is refused, replaced or appended to. File output only lands once the
//! whole run succeeded.

pub mod interactive;
pub mod json;
pub mod schema;
pub mod tsv;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{debug, info};
use tempfile::{NamedTempFile, TempPath};

use crate::error::{HamronizeError, Result};
use crate::record::Record;

pub use interactive::InteractiveSummary;
pub use json::JsonArrayWriter;
pub use tsv::TsvWriter;

/// Layout of converted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Tsv,
    Json,
}

/// Layout of a merged summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    Tsv,
    Json,
    Interactive,
}

/// Treatment of an existing destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Refuse to touch an existing file
    Create,
    Overwrite,
    Append,
}

/// An open output stream.
///
/// File output is staged in a temporary file next to the destination and
/// only takes its place on [`Commit::commit`]. Dropping an uncommitted
/// destination discards the staged output and leaves any existing file as
/// it was.
pub struct Destination {
    pub writer: Box<dyn Write>,
    /// Appending to a file that already holds output
    pub continues: bool,
    pub commit: Commit,
}

/// Pending move of staged output onto its destination
pub struct Commit(Option<Staged>);

struct Staged {
    temp: TempPath,
    target: PathBuf,
    replace: bool,
}

impl Commit {
    /// Move the staged output into place; the writer must be flushed first
    pub fn commit(self) -> Result<()> {
        let Some(staged) = self.0 else {
            return Ok(());
        };
        if staged.replace {
            staged.temp.persist(&staged.target).map_err(io::Error::from)?;
        } else {
            staged
                .temp
                .persist_noclobber(&staged.target)
                .map_err(io::Error::from)?;
        }
        debug!("Wrote {}", staged.target.display());
        Ok(())
    }
}

/// Open `path` (stdout when `None`) for writing under `mode`
pub fn open_destination(path: Option<&Path>, mode: WriteMode) -> Result<Destination> {
    let Some(path) = path else {
        return Ok(Destination {
            writer: Box::new(BufWriter::new(io::stdout())),
            continues: false,
            commit: Commit(None),
        });
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        info!("Creating output directory: {:?}", dir);
        std::fs::create_dir_all(dir)?;
    }

    if mode == WriteMode::Create && path.exists() {
        return Err(HamronizeError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "Output file {} already exists. Use --force to overwrite.",
                path.display()
            ),
        )));
    }

    let mut staged = NamedTempFile::new_in(dir)?;
    let mut continues = false;
    if let Ok(mut existing) = File::open(path) {
        staged
            .as_file()
            .set_permissions(existing.metadata()?.permissions())?;
        if mode == WriteMode::Append {
            continues = io::copy(&mut existing, staged.as_file_mut())? > 0;
        }
    }
    if continues {
        info!("Appending to {}", path.display());
    }

    let (file, temp) = staged.into_parts();
    Ok(Destination {
        writer: Box::new(BufWriter::new(file)),
        continues,
        commit: Commit(Some(Staged {
            temp,
            target: path.to_path_buf(),
            replace: mode != WriteMode::Create,
        })),
    })
}

/// Converted-record writer of either format
pub enum RecordSink<W: Write> {
    Tsv(TsvWriter<W>),
    Json(JsonArrayWriter<W>),
}

impl<W: Write> RecordSink<W> {
    /// `continues` suppresses the tabular header for appended output
    pub fn new(format: OutputFormat, writer: W, continues: bool) -> Self {
        match format {
            OutputFormat::Tsv => RecordSink::Tsv(TsvWriter::new(writer, !continues)),
            OutputFormat::Json => RecordSink::Json(JsonArrayWriter::new(writer)),
        }
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        match self {
            RecordSink::Tsv(w) => w.write_record(record),
            RecordSink::Json(w) => w.write_record(record),
        }
    }

    pub fn finish(self) -> Result<usize> {
        match self {
            RecordSink::Tsv(w) => w.finish(),
            RecordSink::Json(w) => w.finish(),
        }
    }
}

/// Write merged records in the chosen summary layout
pub fn write_summary<W: Write>(format: SummaryFormat, records: &[Record], writer: W) -> Result<()> {
    match format {
        SummaryFormat::Tsv => {
            let mut w = TsvWriter::new(writer, true);
            w.write_all(records)?;
            w.finish()?;
        }
        SummaryFormat::Json => {
            let mut w = JsonArrayWriter::new(writer);
            w.write_batch(records)?;
            w.finish()?;
        }
        SummaryFormat::Interactive => {
            let summary = InteractiveSummary::from_records(records);
            let value = serde_json::to_value(&summary)?;
            if schema::should_validate() {
                schema::validate(&value).map_err(HamronizeError::Validation)?;
            }
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, &value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_support::record;
    use serde_json::Value;
    use std::fs;

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        fs::write(&path, "x").unwrap();
        let err = open_destination(Some(&path), WriteMode::Create).err().unwrap();
        assert!(err.to_string().contains("--force"));

        let mut dest = open_destination(Some(&path), WriteMode::Overwrite).unwrap();
        dest.writer.write_all(b"y").unwrap();
        dest.writer.flush().unwrap();
        drop(dest.writer);
        dest.commit.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "y");
    }

    #[test]
    fn test_uncommitted_output_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        {
            let dest = open_destination(Some(&path), WriteMode::Create).unwrap();
            let mut sink = RecordSink::new(OutputFormat::Json, dest.writer, dest.continues);
            sink.write_record(&record("S1", "abricate", "blaTEM")).unwrap();
        }
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        fs::write(&path, "[]\n").unwrap();
        {
            let dest = open_destination(Some(&path), WriteMode::Append).unwrap();
            let mut sink = RecordSink::new(OutputFormat::Json, dest.writer, dest.continues);
            sink.write_record(&record("S2", "abricate", "blaTEM")).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
        // a rerun is not refused by a half-written file
        assert!(open_destination(Some(&path), WriteMode::Overwrite).is_ok());
    }

    #[test]
    fn test_append_continues_only_non_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.tsv");
        let fresh = open_destination(Some(&path), WriteMode::Append).unwrap();
        assert!(!fresh.continues);
        drop(fresh.writer);
        fresh.commit.commit().unwrap();
        assert!(path.exists());

        fs::write(&path, "header\n").unwrap();
        let again = open_destination(Some(&path), WriteMode::Append).unwrap();
        assert!(again.continues);
    }

    #[test]
    fn test_appended_tsv_has_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        for sample in ["S1", "S2"] {
            let dest = open_destination(Some(&path), WriteMode::Append).unwrap();
            let mut sink = RecordSink::new(OutputFormat::Tsv, dest.writer, dest.continues);
            sink.write_record(&record(sample, "abricate", "blaTEM")).unwrap();
            sink.finish().unwrap();
            dest.commit.commit().unwrap();
        }
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("input_file_name").count(), 1);
    }

    #[test]
    fn test_zero_records_in_both_formats() {
        let mut tsv = Vec::new();
        assert_eq!(RecordSink::new(OutputFormat::Tsv, &mut tsv, false).finish().unwrap(), 0);
        assert_eq!(String::from_utf8(tsv).unwrap().lines().count(), 1);

        let mut json = Vec::new();
        assert_eq!(RecordSink::new(OutputFormat::Json, &mut json, false).finish().unwrap(), 0);
        let value: Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value, Value::Array(Vec::new()));
    }

    #[test]
    fn test_interactive_summary_written() {
        let mut buf = Vec::new();
        let records = vec![record("S1", "abricate", "blaTEM"), record("S1", "rgi", "mecA")];
        write_summary(SummaryFormat::Interactive, &records, &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        let configs = value["S1"].as_array().unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs[1].get("rgi: config 0").is_some());
    }
}
