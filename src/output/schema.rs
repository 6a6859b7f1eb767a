//! JSON Schema generation and runtime validation of record output

use std::sync::LazyLock;

use schemars::schema_for;
use serde_json::Value;

use super::interactive::InteractiveSummary;
use crate::record::Record;

static RECORD_SCHEMA: LazyLock<schemars::Schema> = LazyLock::new(|| schema_for!(Record));

static SUMMARY_SCHEMA: LazyLock<schemars::Schema> =
    LazyLock::new(|| schema_for!(InteractiveSummary));

/// The canonical record schema as pretty-printed JSON
pub fn schema_json_pretty() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&*RECORD_SCHEMA)
}

/// Validate a grouped summary against its schema.
///
/// Returns `Err` with a description of every validation error.
pub fn validate(value: &Value) -> Result<(), String> {
    let schema_val = serde_json::to_value(&*SUMMARY_SCHEMA)
        .map_err(|e| format!("Failed to serialize schema: {}", e))?;
    let validator = jsonschema::validator_for(&schema_val)
        .map_err(|e| format!("Failed to compile schema: {}", e))?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("  - {}: {}", e.instance_path, e))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Summary JSON failed schema validation ({} errors):\n{}",
            errors.len(),
            errors.join("\n")
        ))
    }
}

/// Always true in debug builds; in release builds only with
/// `HAMRONIZE_VALIDATE_OUTPUT=1`
pub fn should_validate() -> bool {
    if cfg!(debug_assertions) {
        true
    } else {
        std::env::var("HAMRONIZE_VALIDATE_OUTPUT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}
