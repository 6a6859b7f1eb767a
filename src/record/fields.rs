//! Canonical field declarations
//!
//! The order of [`FIELDS`] is the canonical declaration order: it drives
//! tabular column order and must match the field order of [`super::Record`].

use std::fmt;

/// Declared type of a canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Float,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, type and mandatory flag of one canonical field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub mandatory: bool,
}

const fn mandatory(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldType::Text, mandatory: true }
}

const fn optional(name: &'static str, kind: FieldType) -> FieldSpec {
    FieldSpec { name, kind, mandatory: false }
}

use FieldType::{Float, Integer, Text};

/// Every canonical field in declaration order
pub const FIELDS: [FieldSpec; 36] = [
    mandatory("input_file_name"),
    mandatory("gene_symbol"),
    mandatory("gene_name"),
    mandatory("reference_database_name"),
    mandatory("reference_database_version"),
    mandatory("reference_accession"),
    mandatory("analysis_software_name"),
    mandatory("analysis_software_version"),
    mandatory("genetic_variation_type"),
    optional("antimicrobial_agent", Text),
    optional("coverage_percentage", Float),
    optional("coverage_depth", Float),
    optional("coverage_ratio", Float),
    optional("drug_class", Text),
    optional("input_gene_length", Integer),
    optional("input_gene_start", Integer),
    optional("input_gene_stop", Integer),
    optional("input_protein_length", Integer),
    optional("input_protein_start", Integer),
    optional("input_protein_stop", Integer),
    optional("input_sequence_id", Text),
    optional("nucleotide_mutation", Text),
    optional("nucleotide_mutation_interpretation", Text),
    optional("predicted_phenotype", Text),
    optional("predicted_phenotype_confidence_level", Text),
    optional("amino_acid_mutation", Text),
    optional("amino_acid_mutation_interpretation", Text),
    optional("reference_gene_length", Integer),
    optional("reference_gene_start", Integer),
    optional("reference_gene_stop", Integer),
    optional("reference_protein_length", Integer),
    optional("reference_protein_start", Integer),
    optional("reference_protein_stop", Integer),
    optional("resistance_mechanism", Text),
    optional("strand_orientation", Text),
    optional("sequence_identity", Float),
];

/// Position of a canonical field in [`FIELDS`]
pub fn field_index(name: &str) -> Option<usize> {
    FIELDS.iter().position(|f| f.name == name)
}

/// Look up the declaration of a canonical field
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Canonical field names in declaration order
pub fn field_names() -> Vec<&'static str> {
    FIELDS.iter().map(|f| f.name).collect()
}

/// Names of the mandatory fields
pub fn mandatory_field_names() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().filter(|f| f.mandatory).map(|f| f.name)
}
