//! Field-map adapter over tab-delimited reports

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;

use csv::{ByteRecord, Position, StringRecord};
use log::{debug, warn};
use serde_json::Value;

use super::field_map::{FieldMap, FieldOverrides};
use crate::error::{HamronizeError, Result};
use crate::metadata::MetadataContext;
use crate::record::{Record, RecordBuilder};

/// Picks the field map from the header and the first data row (if any)
pub type MapSelector = fn(header: &[String], first_row: Option<&StringRecord>) -> FieldMap;

/// Rewrites a row in place, derives `_` helper columns, or drops the row
pub type RowTransform = fn(row: &mut Row) -> Result<RowAction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Keep,
    Drop,
}

/// How cells are separated on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Tabs,
    /// Runs of blanks, `#` lines are comments (hmmer tables)
    Whitespace,
}

/// Tool-specific behavior plugged into [`TabularAdapter`]
#[derive(Clone, Copy)]
pub struct TabularHooks {
    pub select: MapSelector,
    pub transform: Option<RowTransform>,
    /// Column names for reports written without a header line
    pub columns: Option<&'static [&'static str]>,
    pub layout: Layout,
}

// ============================================================================
// Rows
// ============================================================================

/// One data row keyed by column name
#[derive(Debug, Clone)]
pub struct Row {
    line: u64,
    cells: HashMap<String, Value>,
}

impl Row {
    pub fn new(line: u64, header: &[String], raw: &StringRecord) -> Self {
        let cells = header
            .iter()
            .zip(raw.iter())
            .map(|(name, cell)| (name.clone(), Value::String(cell.to_string())))
            .collect();
        Self { line, cells }
    }

    /// Line of the row in the report
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Text of a cell; `None` when the column is absent or null
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(Value::as_str)
    }

    /// Text of the first of `columns` present in the row
    pub fn get_any(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c))
    }

    /// Text of a cell the transform cannot do without
    pub fn require(&self, column: &str) -> Result<&str> {
        self.get(column).ok_or_else(|| {
            HamronizeError::SourceFormat(format!("line {}: missing column '{}'", self.line, column))
        })
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.cells.insert(column.to_string(), value.into());
    }

    /// Replace every cell equal to `marker` with null
    pub fn null_markers(&mut self, marker: &str) {
        for value in self.cells.values_mut() {
            if value.as_str() == Some(marker) {
                *value = Value::Null;
            }
        }
    }

    /// Source-format fault tied to this row
    pub fn fault(&self, message: impl std::fmt::Display) -> HamronizeError {
        HamronizeError::SourceFormat(format!("line {}: {}", self.line, message))
    }
}

// ============================================================================
// Row source
// ============================================================================

/// Raw rows of a report, undecoded so that a bad byte only costs its own row
enum RowSource<R> {
    Tabs(csv::Reader<R>),
    Whitespace { input: BufReader<R>, line: u64 },
}

impl<R: Read> RowSource<R> {
    fn new(input: R, layout: Layout) -> Self {
        match layout {
            Layout::Tabs => RowSource::Tabs(
                csv::ReaderBuilder::new()
                    .delimiter(b'\t')
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(input),
            ),
            Layout::Whitespace => RowSource::Whitespace {
                input: BufReader::new(input),
                line: 0,
            },
        }
    }

    fn read(&mut self, raw: &mut ByteRecord) -> Result<bool> {
        let (input, line) = match self {
            RowSource::Tabs(reader) => return Ok(reader.read_byte_record(raw)?),
            RowSource::Whitespace { input, line } => (input, line),
        };
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                return Ok(false);
            }
            *line += 1;
            if buf.starts_with(b"#") || buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            raw.clear();
            for cell in buf.split(u8::is_ascii_whitespace).filter(|c| !c.is_empty()) {
                raw.push_field(cell);
            }
            let mut position = Position::new();
            position.set_line(*line);
            raw.set_position(Some(position));
            return Ok(true);
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Lazy sequence of records from one tab-delimited report.
///
/// Rows with a source-format fault or a missing mandatory field are skipped
/// with a warning, as are rows that are not valid UTF-8. A coercion fault is
/// yielded once and ends the sequence. The reader is dropped as soon as the
/// sequence ends.
pub struct TabularAdapter<R> {
    tool: String,
    reader: Option<RowSource<R>>,
    header: Vec<String>,
    field_map: FieldMap,
    metadata: MetadataContext,
    transform: Option<RowTransform>,
    pending: Option<ByteRecord>,
    emitted: usize,
    skipped: usize,
    dropped: usize,
}

impl<R: Read> TabularAdapter<R> {
    pub fn new(
        tool: &str,
        input: R,
        hooks: &TabularHooks,
        metadata: MetadataContext,
        overrides: Option<&FieldOverrides>,
    ) -> Result<Self> {
        let mut reader = RowSource::new(input, hooks.layout);

        let header: Vec<String> = match hooks.columns {
            Some(columns) => columns.iter().map(|c| c.to_string()).collect(),
            None => {
                let mut raw = ByteRecord::new();
                if reader.read(&mut raw)? {
                    raw.iter()
                        .map(|c| {
                            String::from_utf8_lossy(c)
                                .trim_start_matches('\u{feff}')
                                .trim()
                                .to_string()
                        })
                        .collect()
                } else {
                    Vec::new()
                }
            }
        };

        let mut first = ByteRecord::new();
        let pending = reader.read(&mut first)?.then_some(first);
        let first_row = pending
            .clone()
            .and_then(|raw| StringRecord::from_byte_record(raw).ok());

        let mut field_map = (hooks.select)(&header, first_row.as_ref());
        if let Some(overrides) = overrides {
            field_map = field_map.with_overrides(overrides)?;
        }
        field_map.validate()?;
        debug!(
            "{}: {} columns, {} mapped fields",
            tool,
            header.len(),
            field_map.mapped().count()
        );

        if pending.is_none() {
            warn!("{}: report contains no results", tool);
        }

        Ok(Self {
            tool: tool.to_string(),
            reader: Some(reader),
            header,
            field_map,
            metadata,
            transform: hooks.transform,
            pending,
            emitted: 0,
            skipped: 0,
            dropped: 0,
        })
    }

    fn next_raw(&mut self) -> Result<Option<ByteRecord>> {
        if let Some(raw) = self.pending.take() {
            return Ok(Some(raw));
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut raw = ByteRecord::new();
        Ok(reader.read(&mut raw)?.then_some(raw))
    }

    fn convert(&self, line: u64, raw: ByteRecord) -> Result<Option<Record>> {
        let raw = StringRecord::from_byte_record(raw).map_err(|e| {
            HamronizeError::SourceFormat(format!(
                "line {}: cell {} is not valid UTF-8",
                line,
                e.utf8_error().field() + 1
            ))
        })?;
        let mut row = Row::new(line, &self.header, &raw);
        if let Some(transform) = self.transform
            && transform(&mut row)? == RowAction::Drop
        {
            return Ok(None);
        }

        let mut builder = RecordBuilder::from_metadata(&self.metadata);
        for (external, canonical) in self.field_map.mapped() {
            let value = row
                .value(external)
                .ok_or_else(|| row.fault(format_args!("missing column '{}'", external)))?;
            builder.set(canonical, value.clone())?;
        }
        builder.build().map(Some)
    }

    /// Release the reader and report what was left out
    fn finish(&mut self) {
        if self.reader.take().is_none() {
            return;
        }
        self.pending = None;
        if self.skipped > 0 {
            warn!("{}: skipped {} malformed rows", self.tool, self.skipped);
        }
        if self.dropped > 0 {
            warn!("{}: dropped {} rows not reporting resistance", self.tool, self.dropped);
        }
        debug!("{}: {} records", self.tool, self.emitted);
    }

    fn abort(&mut self, err: HamronizeError) -> HamronizeError {
        self.finish();
        err
    }
}

impl<R: Read> Iterator for TabularAdapter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.next_raw() {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    self.finish();
                    return None;
                }
                Err(e) => return Some(Err(self.abort(e))),
            };
            let line = raw.position().map_or(0, |p| p.line());

            match self.convert(line, raw) {
                Ok(Some(record)) => {
                    self.emitted += 1;
                    return Some(Ok(record));
                }
                Ok(None) => self.dropped += 1,
                Err(e) if e.is_record_level() => {
                    warn!("{}: skipping line {}: {}", self.tool, line, e);
                    self.skipped += 1;
                }
                Err(e) => return Some(Err(self.abort(e))),
            }
        }
    }
}

impl<R: Read> FusedIterator for TabularAdapter<R> {}
