//! Canonical enumerations shared by the compiler and the formatter.
//!
//! A [`Vocabulary`] is an ordered list of terms. Order is meaningful: variant
//! types are listed in display order, consequences from most to least
//! severe, clinical significances by rank.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One vocabulary entry.
///
/// * `id` - stable public identifier (`SO_0001583`, `pathogenic`)
/// * `key` - value stored in the search index (`missense_variant`, `P`)
/// * `label` - human readable name (`Missense variant`, `Pathogenic`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    terms: Vec<Term>,
}

impl Vocabulary {
    pub fn new(terms: Vec<Term>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for term in &terms {
            if !ids.insert(term.id.as_str()) {
                return Err(Error::InvalidVocabulary(format!(
                    "duplicate id '{}'",
                    term.id
                )));
            }
            if !keys.insert(term.key.as_str()) {
                return Err(Error::InvalidVocabulary(format!(
                    "duplicate key '{}'",
                    term.key
                )));
            }
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.id == id)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.key == key)
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.label == label)
    }

    /// Position of the term with `key` in canonical order.
    pub fn rank_of_key(&self, key: &str) -> Option<usize> {
        self.terms.iter().position(|t| t.key == key)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.id.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.key.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.label.as_str())
    }

    /// First term in canonical order whose key appears in `keys`.
    ///
    /// For the consequence vocabulary this is the most severe consequence.
    pub fn most_severe<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Option<&Term> {
        let present: HashSet<&str> = keys.into_iter().collect();
        self.terms.iter().find(|t| present.contains(t.key.as_str()))
    }

    /// Terms for `keys` re-ordered into canonical order. Unknown keys are dropped.
    pub fn in_canonical_order<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Vec<&Term> {
        let present: HashSet<&str> = keys.into_iter().collect();
        self.terms
            .iter()
            .filter(|t| present.contains(t.key.as_str()))
            .collect()
    }
}

/// The three vocabularies consulted while compiling and formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabularies {
    pub variant_types: Vocabulary,
    pub consequences: Vocabulary,
    pub significances: Vocabulary,
}

const BUNDLED_VOCABULARIES: &str = include_str!("../data/vocabularies.json");

impl Vocabularies {
    /// Parse and check vocabularies from their JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vocabularies = serde_json::from_str(json)?;
        Ok(Self {
            variant_types: Vocabulary::new(raw.variant_types.terms)?,
            consequences: Vocabulary::new(raw.consequences.terms)?,
            significances: Vocabulary::new(raw.significances.terms)?,
        })
    }

    /// Sequence Ontology variant classes and consequences plus the clinical
    /// significance vocabulary shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_VOCABULARIES)
    }
}

/// Normalise a clinical classification as written by submitters
/// (`"Likely pathogenic"`, `"pathogenic, low penetrance"`) into a
/// significance id (`likely_pathogenic`, `pathogenic_low_penetrance`).
pub fn normalize_significance_id(raw: &str) -> String {
    raw.trim()
        .replace(',', "")
        .replace(' ', "_")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_vocabularies_load() {
        let vocab = Vocabularies::bundled().unwrap();
        assert_eq!(
            vocab.variant_types.find_by_label("SNV").map(|t| t.id.as_str()),
            Some("SO_0001483")
        );
        assert_eq!(
            vocab
                .consequences
                .find_by_id("SO_0001583")
                .map(|t| t.key.as_str()),
            Some("missense_variant")
        );
        assert_eq!(
            vocab
                .significances
                .find_by_key("P")
                .map(|t| t.id.as_str()),
            Some("pathogenic")
        );
    }

    #[test]
    fn most_severe_follows_canonical_order() {
        let vocab = Vocabularies::bundled().unwrap();
        let most = vocab
            .consequences
            .most_severe(["intron_variant", "stop_gained", "missense_variant"])
            .unwrap();
        assert_eq!(most.key, "stop_gained");
    }

    #[test]
    fn canonical_order_drops_unknown_keys() {
        let vocab = Vocabularies::bundled().unwrap();
        let ordered: Vec<&str> = vocab
            .consequences
            .in_canonical_order(["intron_variant", "bogus", "missense_variant"])
            .into_iter()
            .map(|t| t.key.as_str())
            .collect();
        assert_eq!(ordered, vec!["missense_variant", "intron_variant"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let term = Term {
            id: "a".into(),
            key: "k1".into(),
            label: "A".into(),
        };
        let mut dup = term.clone();
        dup.key = "k2".into();
        assert!(Vocabulary::new(vec![term, dup]).is_err());
    }

    #[test]
    fn significance_ids_are_normalised() {
        assert_eq!(
            normalize_significance_id("Pathogenic, low penetrance"),
            "pathogenic_low_penetrance"
        );
        assert_eq!(normalize_significance_id("likely benign"), "likely_benign");
    }
}
