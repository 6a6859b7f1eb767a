//! Reference graph as written by graph-shaped reports
//!
//! The three entity tables are JSON objects keyed by id. They are kept as
//! ordered `(id, entity)` lists so that flattening follows report order.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A whole graph report
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResultGraph {
    pub software_name: Option<String>,
    pub software_version: Option<String>,
    #[serde(deserialize_with = "ordered")]
    pub databases: Vec<(String, Database)>,
    #[serde(deserialize_with = "ordered")]
    pub seq_regions: Vec<(String, Region)>,
    #[serde(deserialize_with = "ordered")]
    pub seq_variations: Vec<(String, Variant)>,
    #[serde(deserialize_with = "ordered")]
    pub phenotypes: Vec<(String, Phenotype)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Database {
    pub database_name: Option<String>,
    pub database_version: Option<String>,
}

/// A candidate resistance locus
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Region {
    pub name: Option<String>,
    pub ref_id: Option<String>,
    pub ref_acc: Option<String>,
    pub query_id: Option<String>,
    pub query_start_pos: Option<i64>,
    pub query_end_pos: Option<i64>,
    pub ref_start_pos: Option<i64>,
    pub ref_end_pos: Option<i64>,
    #[serde(alias = "ref_gene_lenght", alias = "ref_gene_length")]
    pub ref_seq_length: Option<i64>,
    pub alignment_length: Option<i64>,
    pub coverage: Option<f64>,
    pub identity: Option<f64>,
    pub phenotypes: Vec<String>,
}

/// A mutation event on one or more regions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Variant {
    /// Change string, `p.` for protein-level changes
    pub seq_var: Option<String>,
    pub nuc_change: Option<String>,
    pub codon_change: Option<String>,
    pub ref_start_pos: Option<i64>,
    pub seq_regions: Vec<String>,
    pub phenotypes: Vec<String>,
    pub notes: Vec<String>,
    #[serde(deserialize_with = "texts")]
    pub pmids: Vec<String>,
}

/// An antimicrobial with its resistance call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Phenotype {
    pub amr_resistant: bool,
    /// Antimicrobial name
    pub amr_resistance: Option<String>,
    pub amr_classes: Vec<String>,
    pub seq_regions: Vec<String>,
    pub seq_variations: Vec<String>,
}

impl ResultGraph {
    /// Software and database facts carried by the report itself
    pub fn facts(&self) -> BTreeMap<String, String> {
        let mut facts = BTreeMap::new();
        if let Some(version) = &self.software_version {
            facts.insert("analysis_software_version".to_string(), version.clone());
        }
        let database = self
            .databases
            .iter()
            .map(|(_, db)| db)
            .find(|db| {
                db.database_name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case("resfinder"))
            })
            .or_else(|| self.databases.first().map(|(_, db)| db));
        if let Some(version) = database.and_then(|db| db.database_version.clone()) {
            facts.insert("reference_database_version".to_string(), version);
        }
        facts
    }
}

impl Phenotype {
    /// Antimicrobial name, falling back to the phenotype id
    pub fn name<'a>(&'a self, id: &'a str) -> &'a str {
        self.amr_resistance.as_deref().unwrap_or(id)
    }
}

fn ordered<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(id, value)| {
            serde_json::from_value(value)
                .map(|entity| (id.clone(), entity))
                .map_err(|e| D::Error::custom(format!("entry {}: {}", id, e)))
        })
        .collect()
}

/// Identifier lists written as strings or numbers
fn texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tables_keep_report_order() {
        let graph: ResultGraph = serde_json::from_value(json!({
            "software_version": "4.5.0",
            "seq_regions": {
                "z": {"name": "blaZ"},
                "a": {"name": "aac", "ref_gene_lenght": 555}
            },
            "seq_variations": {"v": {"seq_var": "p.S83L", "pmids": ["123", 456]}}
        }))
        .unwrap();
        let ids: Vec<&str> = graph.seq_regions.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(graph.seq_regions[1].1.ref_seq_length, Some(555));
        assert_eq!(graph.seq_variations[0].1.pmids, vec!["123", "456"]);
        assert!(graph.phenotypes.is_empty());
    }

    #[test]
    fn test_facts_prefer_resfinder_database() {
        let graph: ResultGraph = serde_json::from_value(json!({
            "software_version": "4.5.0",
            "databases": {
                "PointFinder-4.1.1": {"database_name": "PointFinder", "database_version": "4.1.1"},
                "ResFinder-2.3.2": {"database_name": "ResFinder", "database_version": "2.3.2"}
            }
        }))
        .unwrap();
        let facts = graph.facts();
        assert_eq!(facts["analysis_software_version"], "4.5.0");
        assert_eq!(facts["reference_database_version"], "2.3.2");
    }
}
