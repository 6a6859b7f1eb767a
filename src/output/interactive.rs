//! Grouped summary shape consumed by the interactive report viewer

use std::collections::{BTreeMap, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Records grouped by input file, then by tool configuration:
/// `{file: [{"<software>: config <n>": [records]}]}`.
///
/// Files are sorted; configurations keep first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct InteractiveSummary(pub BTreeMap<String, Vec<BTreeMap<String, Vec<Record>>>>);

impl InteractiveSummary {
    pub fn from_records(records: &[Record]) -> Self {
        // config key -> display name, numbered per software in appearance order
        let mut names: HashMap<String, String> = HashMap::new();
        let mut per_software: HashMap<&str, usize> = HashMap::new();
        let mut files: BTreeMap<String, Vec<(String, Vec<Record>)>> = BTreeMap::new();

        for record in records {
            let key = record.config_key();
            let display = names
                .entry(key)
                .or_insert_with(|| {
                    let software = record.analysis_software_name();
                    let n = per_software.entry(software).or_insert(0);
                    let name = format!("{}: config {}", software, n);
                    *n += 1;
                    name
                })
                .clone();

            let configs = files.entry(record.input_file_name().to_string()).or_default();
            match configs.iter_mut().find(|(name, _)| *name == display) {
                Some((_, group)) => group.push(record.clone()),
                None => configs.push((display, vec![record.clone()])),
            }
        }

        Self(
            files
                .into_iter()
                .map(|(file, configs)| {
                    let groups = configs
                        .into_iter()
                        .map(|(name, group)| BTreeMap::from([(name, group)]))
                        .collect();
                    (file, groups)
                })
                .collect(),
        )
    }
}
