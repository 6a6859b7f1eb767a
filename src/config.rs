//! Optional JSON configuration for hamronize runs
//!
//! ```json
//! {
//!   "metadata": {"reference_database_version": "2024-01-01"},
//!   "field_maps": {"abricate": {"COVERAGE": "coverage_depth", "GENE": null}},
//!   "summary": {"input_format": "tsv"}
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::adapter::FieldOverrides;
use crate::aggregate::ReportFormat;
use crate::metadata::MetadataContext;

/// Settings for `summarize`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SummaryConfig {
    /// Declared format of every input report, bypassing detection
    #[serde(default)]
    pub input_format: Option<ReportFormat>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HamronizeConfig {
    /// Default metadata, applied under values given on the command line
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Per-tool overrides of the built-in field maps
    #[serde(default)]
    pub field_maps: HashMap<String, FieldOverrides>,
    #[serde(default)]
    pub summary: SummaryConfig,
}

impl HamronizeConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: HamronizeConfig = serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Caller metadata with configured defaults filled in underneath
    pub fn metadata_under(&self, caller: &MetadataContext) -> MetadataContext {
        caller.with_defaults(&self.metadata)
    }

    pub fn field_overrides(&self, tool: &str) -> Option<&FieldOverrides> {
        self.field_maps.get(tool)
    }
}
