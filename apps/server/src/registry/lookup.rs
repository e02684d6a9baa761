//! Gene synonym and condition name tables.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use togovar_format::{ConditionNames, GeneSynonyms};

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
struct GeneEntry {
    hgnc_id: u64,
    #[serde(default)]
    synonyms: Vec<String>,
}

/// HGNC id to synonyms.
#[derive(Debug, Clone, Default)]
pub struct GeneTable {
    synonyms: HashMap<u64, Vec<String>>,
}

impl GeneTable {
    /// Parse `[{"hgnc_id": 1100, "synonyms": ["BRCC1", ...]}, ...]`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<GeneEntry> = serde_json::from_str(json)
            .map_err(|e| Error::Registry(format!("Invalid gene table: {e}")))?;
        Ok(Self {
            synonyms: entries
                .into_iter()
                .map(|e| (e.hgnc_id, e.synonyms))
                .collect(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&read(path)?)
    }

    pub fn len(&self) -> usize {
        self.synonyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synonyms.is_empty()
    }
}

impl GeneSynonyms for GeneTable {
    fn synonyms(&self, hgnc_id: u64) -> Option<Vec<String>> {
        self.synonyms.get(&hgnc_id).cloned()
    }
}

/// MedGen concept id to preferred name.
#[derive(Debug, Clone, Default)]
pub struct DiseaseTable {
    names: HashMap<String, String>,
}

impl DiseaseTable {
    /// Parse `{"C0006142": "Malignant tumor of breast", ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let names = serde_json::from_str(json)
            .map_err(|e| Error::Registry(format!("Invalid disease table: {e}")))?;
        Ok(Self { names })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&read(path)?)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ConditionNames for DiseaseTable {
    fn name(&self, medgen: &str) -> Option<String> {
        self.names.get(medgen).cloned()
    }
}

pub(crate) fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Registry(format!("Failed to read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gene_synonyms_by_hgnc_id() {
        let genes = GeneTable::from_json(
            r#"[
                { "hgnc_id": 1100, "synonyms": ["BRCC1", "RNF53"] },
                { "hgnc_id": 404 }
            ]"#,
        )
        .unwrap();
        assert_eq!(genes.len(), 2);
        assert_eq!(
            genes.synonyms(1100),
            Some(vec!["BRCC1".to_string(), "RNF53".to_string()])
        );
        assert_eq!(genes.synonyms(404), Some(vec![]));
        assert_eq!(genes.synonyms(1), None);
    }

    #[test]
    fn disease_names_by_medgen_id() {
        let diseases =
            DiseaseTable::from_json(r#"{ "C0006142": "Malignant tumor of breast" }"#).unwrap();
        assert_eq!(
            diseases.name("C0006142").as_deref(),
            Some("Malignant tumor of breast")
        );
        assert_eq!(diseases.name("C0000000"), None);
    }

    #[test]
    fn malformed_tables_are_registry_errors() {
        assert!(matches!(
            GeneTable::from_json("{}"),
            Err(Error::Registry(_))
        ));
    }
}
