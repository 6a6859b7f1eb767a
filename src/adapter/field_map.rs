//! External-column to canonical-field tables

use std::collections::BTreeMap;

use crate::error::{HamronizeError, Result};
use crate::record::field_index;

/// Override table as read from configuration: external column to canonical
/// field, `None` (or the literal `"drop"`) to drop the column
pub type FieldOverrides = BTreeMap<String, Option<String>>;

/// Ordered (external column, canonical field or drop) pairs.
///
/// When two columns map to the same canonical field the later one wins.
/// Columns whose name begins with `_` are helper columns derived by a row
/// transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Option<String>)>,
}

impl FieldMap {
    pub fn new(entries: &[(&str, Option<&str>)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(ext, canon)| (ext.to_string(), canon.map(str::to_string)))
                .collect(),
        }
    }

    /// Replace (or append) the target of an external column
    pub fn set(&mut self, external: &str, canonical: Option<&str>) {
        let canonical = canonical.filter(|c| *c != "drop").map(str::to_string);
        match self.entries.iter_mut().find(|(ext, _)| ext == external) {
            Some(entry) => entry.1 = canonical,
            None => self.entries.push((external.to_string(), canonical)),
        }
    }

    /// Apply configured overrides on top of this table
    pub fn with_overrides(mut self, overrides: &FieldOverrides) -> Result<Self> {
        for (external, canonical) in overrides {
            self.set(external, canonical.as_deref());
        }
        self.validate()?;
        Ok(self)
    }

    /// Every mapped target must be a canonical field
    pub fn validate(&self) -> Result<()> {
        for (_, canonical) in self.mapped() {
            if field_index(canonical).is_none() {
                return Err(HamronizeError::UnknownField(canonical.to_string()));
            }
        }
        Ok(())
    }

    /// Target of an external column; `Some(None)` when it is dropped
    pub fn target(&self, external: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(ext, _)| ext == external)
            .map(|(_, canon)| canon.as_deref())
    }

    /// (external, canonical) pairs that are not dropped, in table order
    pub fn mapped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(ext, canon)| canon.as_deref().map(|c| (ext.as_str(), c)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
