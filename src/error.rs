//! Error types for hamronize
//!
//! One error enum covers every fault the library can raise. Record-level
//! faults ([`HamronizeError::SourceFormat`], [`HamronizeError::MissingMandatory`])
//! are isolated by the adapters; the rest abort the current invocation.

use thiserror::Error;

/// Main error type for the normalization pipeline
#[derive(Error, Debug)]
pub enum HamronizeError {
    /// Required metadata keys were not supplied for a tool
    #[error("{tool} requires metadata {} to be supplied", .missing.join(", "))]
    MissingMetadata { tool: String, missing: Vec<String> },

    /// A value could not be cast to the declared canonical type
    #[error("Expected {field} to be {expected}, got {actual}")]
    Coercion {
        field: String,
        expected: &'static str,
        actual: String,
    },

    /// A mandatory canonical field was absent or null
    #[error("Mandatory field {field} is missing")]
    MissingMandatory { field: String },

    /// A field name that is not part of the canonical schema
    #[error("Unknown canonical field: {0}")]
    UnknownField(String),

    /// The report lacks a column or graph reference the adapter expects
    #[error("Source format error: {0}")]
    SourceFormat(String),

    /// Unrecognized tool name
    #[error("Unknown tool: {name} (valid tools: {})", .valid.join(", "))]
    UnknownTool { name: String, valid: Vec<String> },

    /// Unrecognized output or input format name
    #[error("Unknown format: {name} (valid formats: {})", .valid.join(", "))]
    UnknownFormat { name: String, valid: Vec<String> },

    /// The format of a report could not be determined
    #[error("Cannot determine report format of {path}: {reason}")]
    AmbiguousFormat { path: String, reason: String },

    /// Written output does not match its JSON Schema
    #[error("{0}")]
    Validation(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text parsing or writing errors
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or writing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HamronizeError {
    /// True for faults that only invalidate the record being built
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            HamronizeError::SourceFormat(_) | HamronizeError::MissingMandatory { .. }
        )
    }
}

/// Result type alias for hamronize operations
pub type Result<T> = std::result::Result<T, HamronizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metadata_lists_all_keys() {
        let err = HamronizeError::MissingMetadata {
            tool: "abricate".to_string(),
            missing: vec![
                "analysis_software_version".to_string(),
                "reference_database_version".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("analysis_software_version, reference_database_version"));
        assert!(msg.starts_with("abricate"));
    }

    #[test]
    fn test_record_level_classification() {
        assert!(HamronizeError::SourceFormat("x".into()).is_record_level());
        assert!(
            HamronizeError::MissingMandatory { field: "gene_symbol".into() }.is_record_level()
        );
        let coercion = HamronizeError::Coercion {
            field: "input_gene_start".into(),
            expected: "integer",
            actual: "\"abc\"".into(),
        };
        assert!(!coercion.is_record_level());
    }
}
