//! Canonical record model
//!
//! This module provides:
//! - `Record`: one normalized detection (gene presence or mutation event)
//! - `RecordBuilder`: an explicit partial-record builder holding an optional
//!   value for every declared canonical field
//! - `FieldValue`: a typed value read back out of a record
//!
//! Construction is the only place values enter a record. Every value is
//! coerced to the declared type of its field; a value that cannot be coerced
//! fails the build with a fault naming the field, the expected type and the
//! offending value.

pub mod fields;
pub mod filename;

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{HamronizeError, Result};
use crate::metadata::MetadataContext;

pub use fields::{FIELDS, FieldSpec, FieldType, field_index, field_names, field_spec};
pub use filename::normalize_input_file_name;

/// Variation type for plain gene presence hits
pub const GENE_PRESENCE: &str = "gene_presence_detected";
/// Variation type for protein-level mutations
pub const AMINO_ACID_VARIANT: &str = "protein_variant_detected";
/// Variation type for nucleotide-level mutations
pub const NUCLEOTIDE_VARIANT: &str = "nucleotide_variant_detected";

// ============================================================================
// Record
// ============================================================================

/// A single AMR detection in the canonical schema.
///
/// Field order matches [`FIELDS`]. Unset optional fields serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Record {
    input_file_name: String,
    gene_symbol: String,
    gene_name: String,
    reference_database_name: String,
    reference_database_version: String,
    reference_accession: String,
    analysis_software_name: String,
    analysis_software_version: String,
    genetic_variation_type: String,
    antimicrobial_agent: Option<String>,
    coverage_percentage: Option<f64>,
    coverage_depth: Option<f64>,
    coverage_ratio: Option<f64>,
    drug_class: Option<String>,
    input_gene_length: Option<i64>,
    input_gene_start: Option<i64>,
    input_gene_stop: Option<i64>,
    input_protein_length: Option<i64>,
    input_protein_start: Option<i64>,
    input_protein_stop: Option<i64>,
    input_sequence_id: Option<String>,
    nucleotide_mutation: Option<String>,
    nucleotide_mutation_interpretation: Option<String>,
    predicted_phenotype: Option<String>,
    predicted_phenotype_confidence_level: Option<String>,
    amino_acid_mutation: Option<String>,
    amino_acid_mutation_interpretation: Option<String>,
    reference_gene_length: Option<i64>,
    reference_gene_start: Option<i64>,
    reference_gene_stop: Option<i64>,
    reference_protein_length: Option<i64>,
    reference_protein_start: Option<i64>,
    reference_protein_stop: Option<i64>,
    resistance_mechanism: Option<String>,
    strand_orientation: Option<String>,
    sequence_identity: Option<f64>,
}

/// Composite sort key: input, tool configuration, then gene symbol
pub type SortKey<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, &'a str);

impl Record {
    pub fn input_file_name(&self) -> &str {
        &self.input_file_name
    }

    pub fn gene_symbol(&self) -> &str {
        &self.gene_symbol
    }

    pub fn gene_name(&self) -> &str {
        &self.gene_name
    }

    pub fn reference_database_name(&self) -> &str {
        &self.reference_database_name
    }

    pub fn reference_database_version(&self) -> &str {
        &self.reference_database_version
    }

    pub fn reference_accession(&self) -> &str {
        &self.reference_accession
    }

    pub fn analysis_software_name(&self) -> &str {
        &self.analysis_software_name
    }

    pub fn analysis_software_version(&self) -> &str {
        &self.analysis_software_version
    }

    pub fn genetic_variation_type(&self) -> &str {
        &self.genetic_variation_type
    }

    /// Typed value of a canonical field, `None` when the field is null.
    ///
    /// Returns `None` for names outside the canonical schema as well; use
    /// [`field_spec`] to tell the two apart.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let spec = field_spec(name)?;
        let map = self.to_map();
        FieldValue::from_json(spec.kind, map.get(name)?)
    }

    /// Text value of a field (numbers are rendered)
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).map(|v| v.to_string())
    }

    /// Record as an ordered JSON object with typed values and explicit nulls
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct of strings, integers and finite floats always
            // serializes to an object.
            _ => Map::new(),
        }
    }

    /// Text cells in declaration order, null rendered as the empty string
    pub fn to_row(&self) -> Vec<String> {
        let map = self.to_map();
        FIELDS
            .iter()
            .map(|spec| {
                map.get(spec.name)
                    .and_then(|v| FieldValue::from_json(spec.kind, v))
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Key used to order aggregated records
    pub fn sort_key(&self) -> SortKey<'_> {
        (
            &self.input_file_name,
            &self.analysis_software_name,
            &self.analysis_software_version,
            &self.reference_database_name,
            &self.reference_database_version,
            &self.gene_symbol,
        )
    }

    /// Key identifying the tool configuration that produced this record
    pub fn config_key(&self) -> String {
        format!(
            "{}{}{}{}",
            self.analysis_software_name,
            self.analysis_software_version,
            self.reference_database_name,
            self.reference_database_version
        )
    }
}

// ============================================================================
// Field values
// ============================================================================

/// A typed canonical value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    fn from_json(kind: FieldType, value: &Value) -> Option<Self> {
        match (kind, value) {
            (_, Value::Null) => None,
            (FieldType::Text, Value::String(s)) => Some(FieldValue::Text(s.clone())),
            (FieldType::Integer, Value::Number(n)) => n.as_i64().map(FieldValue::Integer),
            (FieldType::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the fractional part ("100.0") and round-trips exactly
            FieldValue::Float(x) => write!(f, "{:?}", x),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Partial record: one optional, loosely-typed value per canonical field.
///
/// Values are held as JSON values so that text cells from delimited reports
/// and typed numbers from JSON reports go through the same coercion.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    values: Vec<Value>,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBuilder {
    /// Builder with every field null
    pub fn new() -> Self {
        Self {
            values: vec![Value::Null; FIELDS.len()],
        }
    }

    /// Builder seeded with every fact of a metadata context
    pub fn from_metadata(metadata: &MetadataContext) -> Self {
        let mut builder = Self::new();
        for (key, value) in metadata.iter() {
            if let Some(idx) = field_index(key) {
                builder.values[idx] = Value::String(value.to_string());
            }
        }
        builder
    }

    /// Set the raw value of a canonical field
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let idx =
            field_index(field).ok_or_else(|| HamronizeError::UnknownField(field.to_string()))?;
        self.values[idx] = value.into();
        Ok(self)
    }

    /// Chaining form of [`RecordBuilder::set`]
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Raw value currently held for a field
    pub fn raw(&self, field: &str) -> Option<&Value> {
        field_index(field).map(|idx| &self.values[idx])
    }

    /// Coerce, validate and normalize into an immutable [`Record`]
    pub fn build(self) -> Result<Record> {
        self.finish(true)
    }

    /// Coerce and validate values that already form a canonical record.
    ///
    /// `input_file_name` is kept as written: it was normalized when the
    /// record was first built from a tool report.
    pub fn build_canonical(self) -> Result<Record> {
        self.finish(false)
    }

    fn finish(self, normalize: bool) -> Result<Record> {
        let mut map = Map::with_capacity(FIELDS.len());
        for (spec, raw) in FIELDS.iter().zip(self.values) {
            let value = coerce(spec, raw)?;
            if spec.mandatory && value.is_null() {
                return Err(HamronizeError::MissingMandatory {
                    field: spec.name.to_string(),
                });
            }
            map.insert(spec.name.to_string(), value);
        }

        if normalize && let Some(Value::String(name)) = map.get_mut("input_file_name") {
            *name = normalize_input_file_name(name);
            if name.is_empty() {
                return Err(HamronizeError::MissingMandatory {
                    field: "input_file_name".to_string(),
                });
            }
        }

        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// Cast a raw value to the declared type of its field
fn coerce(spec: &FieldSpec, raw: Value) -> Result<Value> {
    let fault = |raw: &Value| HamronizeError::Coercion {
        field: spec.name.to_string(),
        expected: spec.kind.as_str(),
        actual: raw.to_string(),
    };

    match raw {
        Value::Null => Ok(Value::Null),
        Value::String(ref s) if s.trim().is_empty() => Ok(Value::Null),
        Value::Array(_) | Value::Object(_) => Err(fault(&raw)),
        _ => match spec.kind {
            FieldType::Text => Ok(Value::String(match &raw {
                Value::String(s) => s.clone(),
                Value::Bool(true) => "True".to_string(),
                Value::Bool(false) => "False".to_string(),
                other => other.to_string(),
            })),
            FieldType::Integer => to_integer(&raw)
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| fault(&raw)),
            FieldType::Float => to_float(&raw)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| fault(&raw)),
        },
    }
}

fn to_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn to_float(raw: &Value) -> Option<f64> {
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
