//! Merging of canonical reports
//!
//! Reports written by `convert` (tabular or array-of-records) are loaded
//! whole, concatenated, stripped of exact duplicates and sorted by the
//! composite record key.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::adapter::source;
use crate::error::{HamronizeError, Result};
use crate::record::fields::mandatory_field_names;
use crate::record::{Record, RecordBuilder, field_index};

/// Layout of a canonical report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Tsv,
    Json,
}

impl ReportFormat {
    pub const NAMES: [&'static str; 2] = ["tsv", "json"];

    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Tsv => "tsv",
            ReportFormat::Json => "json",
        }
    }

    /// Negotiate the format of `content`; `None` for a blank report.
    ///
    /// JSON must open with `{` or `[`. A tabular report must open with a
    /// header naming every mandatory column. Anything else is ambiguous.
    pub fn detect(path: &Path, content: &str) -> Result<Option<Self>> {
        let content = content.trim_start_matches('\u{feff}').trim_start();
        match content.chars().next() {
            None => return Ok(None),
            Some('{' | '[') => return Ok(Some(ReportFormat::Json)),
            Some(_) => {}
        }

        let header: Vec<&str> = content
            .lines()
            .next()
            .unwrap_or_default()
            .split('\t')
            .map(str::trim)
            .collect();
        let missing = missing_mandatory(&header);
        if header.len() > 1 && missing.is_empty() {
            Ok(Some(ReportFormat::Tsv))
        } else {
            Err(HamronizeError::AmbiguousFormat {
                path: path.display().to_string(),
                reason: "neither a JSON document nor a tab-delimited header with the \
                         mandatory columns"
                    .to_string(),
            })
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportFormat {
    type Err = HamronizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" => Ok(ReportFormat::Tsv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(HamronizeError::UnknownFormat {
                name: s.to_string(),
                valid: Self::NAMES.iter().map(|n| n.to_string()).collect(),
            }),
        }
    }
}

fn missing_mandatory(columns: &[&str]) -> Vec<&'static str> {
    mandatory_field_names()
        .filter(|field| !columns.contains(field))
        .collect()
}

/// Result of merging a set of reports
#[derive(Debug, Default)]
pub struct Merged {
    pub records: Vec<Record>,
    pub reports: usize,
    /// Records read before deduplication
    pub loaded: usize,
    pub duplicates: usize,
}

/// Load, concatenate, deduplicate and sort canonical reports
pub fn merge<P: AsRef<Path>>(paths: &[P], declared: Option<ReportFormat>) -> Result<Merged> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_report(path.as_ref(), declared)?);
    }
    let loaded = all.len();

    let (mut records, duplicates) = dedup(all);
    sort(&mut records);
    if duplicates > 0 {
        warn!("Removed {} duplicate records", duplicates);
    }
    info!(
        "Merged {} reports: {} unique records",
        paths.len(),
        records.len()
    );

    Ok(Merged {
        records,
        reports: paths.len(),
        loaded,
        duplicates,
    })
}

/// Keep the first occurrence of every distinct record
pub fn dedup(records: Vec<Record>) -> (Vec<Record>, usize) {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<Record> = records
        .into_iter()
        .filter(|r| seen.insert(r.to_row()))
        .collect();
    let removed = total - unique.len();
    (unique, removed)
}

/// Stable sort by input, tool configuration and gene symbol
pub fn sort(records: &mut [Record]) {
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Read every record of one canonical report
pub fn load_report(path: &Path, declared: Option<ReportFormat>) -> Result<Vec<Record>> {
    let content = source::read_to_string(path)?;
    if content.trim().is_empty() {
        warn!("{}: report is empty", path.display());
        return Ok(Vec::new());
    }

    let format = match declared {
        Some(format) => format,
        None => match ReportFormat::detect(path, &content)? {
            Some(format) => format,
            None => return Ok(Vec::new()),
        },
    };
    debug!("{}: reading as {}", path.display(), format);

    let (records, skipped) = match format {
        ReportFormat::Tsv => parse_tsv(path, &content)?,
        ReportFormat::Json => parse_json(&content)?,
    };
    if skipped > 0 {
        warn!("{}: skipped {} malformed records", path.display(), skipped);
    }
    info!("{}: {} records", path.display(), records.len());
    Ok(records)
}

/// Keep a record, count a record-level fault, or fail
fn keep(built: Result<Record>, records: &mut Vec<Record>, skipped: &mut usize) -> Result<()> {
    match built {
        Ok(record) => records.push(record),
        Err(e) if e.is_record_level() => {
            warn!("Skipping record: {}", e);
            *skipped += 1;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn parse_tsv(path: &Path, content: &str) -> Result<(Vec<Record>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let columns: Vec<&str> = header.iter().map(String::as_str).collect();
    let missing = missing_mandatory(&columns);
    if !missing.is_empty() {
        return Err(HamronizeError::AmbiguousFormat {
            path: path.display().to_string(),
            reason: format!("header lacks mandatory columns {}", missing.join(", ")),
        });
    }
    let unknown: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| field_index(c).is_none())
        .collect();
    if !unknown.is_empty() {
        warn!("{}: ignoring columns {}", path.display(), unknown.join(", "));
    }

    let mut records = Vec::new();
    let mut skipped = 0;
    for row in reader.records() {
        let row = row?;
        if row.len() != header.len() {
            let line = row.position().map_or(0, |p| p.line());
            warn!(
                "Skipping line {}: {} cells for {} columns",
                line,
                row.len(),
                header.len()
            );
            skipped += 1;
            continue;
        }
        let mut builder = RecordBuilder::new();
        for (column, cell) in columns.iter().zip(row.iter()) {
            if field_index(column).is_some() {
                builder.set(column, cell)?;
            }
        }
        keep(builder.build_canonical(), &mut records, &mut skipped)?;
    }
    Ok((records, skipped))
}

/// Arrays of record objects, possibly several concatenated documents
fn parse_json(content: &str) -> Result<(Vec<Record>, usize)> {
    let mut records = Vec::new();
    let mut skipped = 0;
    for document in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        let items = match document? {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            other => {
                return Err(HamronizeError::SourceFormat(format!(
                    "expected an array of records, found {}",
                    other
                )));
            }
        };
        for item in items {
            let built = match item {
                Value::Object(map) => record_from_object(map),
                other => Err(HamronizeError::SourceFormat(format!(
                    "expected a record object, found {}",
                    other
                ))),
            };
            keep(built, &mut records, &mut skipped)?;
        }
    }
    Ok((records, skipped))
}

fn record_from_object(map: Map<String, Value>) -> Result<Record> {
    let mut builder = RecordBuilder::new();
    for (key, value) in map {
        if field_index(&key).is_some() {
            builder.set(&key, value)?;
        }
    }
    builder.build_canonical()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::json::JsonArrayWriter;
    use crate::output::tsv::TsvWriter;
    use crate::record::test_support::{builder, record};
    use std::fs;

    fn write_tsv(path: &Path, records: &[Record]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = TsvWriter::new(file, true);
        writer.write_all(records).unwrap();
        writer.flush().unwrap();
    }

    #[test]
    fn test_detect_formats() {
        let path = Path::new("r");
        assert_eq!(ReportFormat::detect(path, "  \n[{}]").unwrap(), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::detect(path, "{\"a\": 1}").unwrap(), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::detect(path, " \n\t").unwrap(), None);

        let header = crate::record::field_names().join("\t");
        assert_eq!(ReportFormat::detect(path, &header).unwrap(), Some(ReportFormat::Tsv));

        let err = ReportFormat::detect(path, "gene\tcoverage\nblaTEM\t100\n").unwrap_err();
        assert!(matches!(err, HamronizeError::AmbiguousFormat { .. }));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("TSV".parse::<ReportFormat>().unwrap(), ReportFormat::Tsv);
        let err = "xml".parse::<ReportFormat>().unwrap_err();
        assert!(err.to_string().contains("tsv, json"));
    }

    #[test]
    fn test_dedup_keeps_first_and_is_idempotent() {
        let a = record("S1", "abricate", "blaTEM");
        let b = record("S1", "abricate", "tet(A)");
        let (unique, removed) = dedup(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(unique, vec![a, b]);
        assert_eq!(removed, 1);

        let (again, removed) = dedup(unique.clone());
        assert_eq!(again, unique);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let first = builder("S1", "rgi", "mecA")
            .with("drug_class", "penam")
            .unwrap()
            .build()
            .unwrap();
        let second = builder("S1", "rgi", "mecA")
            .with("drug_class", "cephalosporin")
            .unwrap()
            .build()
            .unwrap();
        let earlier = record("S0", "rgi", "zzz");
        let mut records = vec![first.clone(), second.clone(), earlier.clone()];
        sort(&mut records);
        assert_eq!(records, vec![earlier, first, second]);
    }

    #[test]
    fn test_merge_empty_and_populated_reports() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.tsv");
        fs::write(&empty, "").unwrap();

        let full = dir.path().join("full.tsv");
        let records: Vec<Record> = ["e", "d", "c", "b", "a"]
            .iter()
            .map(|g| record("S1", "abricate", g))
            .collect();
        write_tsv(&full, &records);

        let merged = merge(&[&empty, &full], None).unwrap();
        assert_eq!(merged.records.len(), 5);
        assert_eq!(merged.duplicates, 0);
        assert_eq!(merged.reports, 2);
        assert_eq!(merged.records[0].gene_symbol(), "a");
    }

    fn written_records() -> Vec<Record> {
        vec![
            builder("S1", "rgi", "gyrA")
                .with("coverage_percentage", 100)
                .unwrap()
                .with("input_gene_start", "17")
                .unwrap()
                .with("amino_acid_mutation", "p.S83L")
                .unwrap()
                .build()
                .unwrap(),
            record("S2.fna.gz", "rgi", "mecA"),
            record("x.fa.fa", "rgi", "tet(M)"),
        ]
    }

    #[test]
    fn test_tsv_round_trip_returns_equal_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converted.tsv");
        let records = written_records();
        assert_eq!(records[2].input_file_name(), "x.fa");
        write_tsv(&path, &records);

        let merged = merge(&[&path], None).unwrap();
        assert_eq!(merged.records, records);
        assert_eq!(merged.duplicates, 0);
    }

    #[test]
    fn test_json_round_trip_returns_equal_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converted.json");
        let records = written_records();
        let mut writer = JsonArrayWriter::new(fs::File::create(&path).unwrap());
        writer.write_batch(&records).unwrap();
        writer.finish().unwrap();

        let merged = merge(&[&path], None).unwrap();
        assert_eq!(merged.records, records);
    }

    #[test]
    fn test_header_only_and_empty_array_reports() {
        let dir = tempfile::tempdir().unwrap();
        let header_only = dir.path().join("header.tsv");
        TsvWriter::new(fs::File::create(&header_only).unwrap(), true)
            .finish()
            .unwrap();
        let empty_array = dir.path().join("empty.json");
        fs::write(&empty_array, "[]\n").unwrap();

        assert!(load_report(&header_only, None).unwrap().is_empty());
        assert!(load_report(&empty_array, None).unwrap().is_empty());

        let full = dir.path().join("full.tsv");
        write_tsv(&full, &written_records());
        let merged = merge(&[&header_only, &empty_array, &full], None).unwrap();
        assert_eq!(merged.records.len(), 3);
        assert_eq!(merged.duplicates, 0);
    }

    #[test]
    fn test_merge_removes_duplicates_across_formats() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            builder("S2", "amrfinderplus", "blaOXA-48")
                .with("coverage_percentage", 99.5)
                .unwrap()
                .build()
                .unwrap(),
            record("S1", "amrfinderplus", "blaOXA-48"),
        ];
        let tsv = dir.path().join("a.tsv");
        write_tsv(&tsv, &records);

        let json = dir.path().join("b.json");
        let values: Vec<Value> = records
            .iter()
            .map(|r| Value::Object(r.to_map()))
            .collect();
        fs::write(&json, serde_json::to_string(&values).unwrap()).unwrap();

        let merged = merge(&[&tsv, &json], None).unwrap();
        assert_eq!(merged.loaded, 4);
        assert_eq!(merged.duplicates, 2);
        assert_eq!(merged.records[0].input_file_name(), "S1");
        assert_eq!(merged.records[1].text("coverage_percentage").as_deref(), Some("99.5"));
    }

    #[test]
    fn test_concatenated_json_documents() {
        let one = Value::Object(record("S1", "srst2", "aadA").to_map());
        let two = Value::Object(record("S2", "srst2", "aadA").to_map());
        let content = format!("[{}]\n[{}]", one, two);
        let (records, skipped) = parse_json(&content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_json_record_without_mandatory_is_skipped() {
        let good = Value::Object(record("S1", "srst2", "aadA").to_map());
        let content = format!("[{}, {{\"gene_symbol\": \"x\"}}, 7]", good);
        let (records, skipped) = parse_json(&content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_missing_report_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.tsv");
        assert!(matches!(
            merge(&[absent], None),
            Err(HamronizeError::Io(_))
        ));
    }

    #[test]
    fn test_declared_format_skips_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.txt");
        let value = Value::Object(record("S1", "ariba", "tet(M)").to_map());
        fs::write(&path, format!("  [{}]", value)).unwrap();
        let records = load_report(&path, Some(ReportFormat::Json)).unwrap();
        assert_eq!(records.len(), 1);
        assert!(load_report(&path, Some(ReportFormat::Tsv)).is_err());
    }
}
