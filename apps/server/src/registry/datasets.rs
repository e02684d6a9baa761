//! Dataset policy: which datasets exist, who may read them and how their
//! names map onto the search index.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use togovar_format::{DatasetAccess, Identity};
use togovar_query::{Clause, DatasetAliasConfig, DatasetAliases};

use crate::{Error, Result};

const BUNDLED_DATASETS: &str = include_str!("../../data/datasets.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Frequency,
    Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetEntry {
    /// Public name.
    pub name: String,
    pub kind: DatasetKind,
    /// Readable only by identities granted this dataset.
    #[serde(default)]
    pub restricted: bool,
    /// Expansion group; hidden from statistics unless requested.
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    aliases: Option<DatasetAliasConfig>,
    #[serde(default)]
    datasets: Vec<DatasetEntry>,
    /// Raw backend clause applied to every query.
    #[serde(default)]
    baseline: Option<JsonValue>,
}

/// Static dataset table loaded from JSON.
#[derive(Debug, Clone)]
pub struct DatasetPolicy {
    datasets: Vec<DatasetEntry>,
    baseline: Option<JsonValue>,
}

impl DatasetPolicy {
    pub fn new(datasets: Vec<DatasetEntry>) -> Self {
        Self {
            datasets,
            baseline: None,
        }
    }

    /// Parse a dataset file; returns the policy and its alias table.
    pub fn from_json(json: &str) -> Result<(Self, DatasetAliases)> {
        let file: DatasetFile = serde_json::from_str(json)
            .map_err(|e| Error::Registry(format!("Invalid dataset file: {e}")))?;
        let aliases = DatasetAliases::from_config(&file.aliases.unwrap_or_default())?;

        let mut seen = BTreeSet::new();
        for entry in &file.datasets {
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::Registry(format!(
                    "Dataset '{}' is declared more than once",
                    entry.name
                )));
            }
        }

        Ok((
            Self {
                datasets: file.datasets,
                baseline: file.baseline,
            },
            aliases,
        ))
    }

    pub fn bundled() -> Result<(Self, DatasetAliases)> {
        Self::from_json(BUNDLED_DATASETS)
    }

    pub fn datasets(&self) -> &[DatasetEntry] {
        &self.datasets
    }

    fn readable<'a>(
        &'a self,
        identity: &'a Identity,
    ) -> impl Iterator<Item = &'a DatasetEntry> + 'a {
        self.datasets
            .iter()
            .filter(move |d| !d.restricted || identity.may_read(&d.name))
    }

    fn readable_of_kind(&self, identity: &Identity, kind: DatasetKind) -> Vec<String> {
        self.readable(identity)
            .filter(|d| d.kind == kind)
            .map(|d| d.name.clone())
            .collect()
    }
}

impl DatasetAccess for DatasetPolicy {
    fn frequency_datasets(&self, identity: &Identity) -> Vec<String> {
        self.readable_of_kind(identity, DatasetKind::Frequency)
    }

    fn condition_datasets(&self, identity: &Identity) -> Vec<String> {
        self.readable_of_kind(identity, DatasetKind::Condition)
    }

    fn all_datasets(&self, identity: &Identity, groups: &[String]) -> BTreeSet<String> {
        self.readable(identity)
            .filter(|d| match &d.group {
                Some(group) => groups.iter().any(|g| g == group),
                None => true,
            })
            .map(|d| d.name.clone())
            .collect()
    }

    fn baseline(&self) -> Option<Clause> {
        self.baseline.clone().map(Clause::Raw)
    }
}
