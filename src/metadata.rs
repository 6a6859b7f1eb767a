//! Metadata context merged into every record of one parse invocation
//!
//! Tool reports rarely carry everything the canonical schema requires
//! (software version, database version, sometimes the input name). Callers
//! supply those facts, adapters add the ones they know (tool name, database
//! name, variation-type default), and the resulting context is frozen before
//! the first row is read.

use std::collections::BTreeMap;

use crate::error::{HamronizeError, Result};

/// Immutable key/value facts shared by every record from one source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataContext {
    values: BTreeMap<String, String>,
}

impl MetadataContext {
    /// Build a context from caller-supplied key/value pairs
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// New context with `injected` facts unioned in; injected keys win
    pub fn union<'a, I>(&self, injected: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut values = self.values.clone();
        for (k, v) in injected {
            values.insert(k.to_string(), v.to_string());
        }
        Self { values }
    }

    /// New context with `defaults` filled in only where no value exists
    pub fn with_defaults<'a, I>(&self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut values = self.values.clone();
        for (k, v) in defaults {
            values.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Required keys that are absent or blank, in the order given
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|key| self.get(key).is_none_or(|v| v.trim().is_empty()))
            .map(|key| key.to_string())
            .collect()
    }

    /// Fail with the complete set of missing keys for `tool`
    pub fn require(&self, tool: &str, required: &[&str]) -> Result<()> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HamronizeError::MissingMetadata {
                tool: tool.to_string(),
                missing,
            })
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetadataContext {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter)
    }
}
