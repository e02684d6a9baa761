//! Collaborators the formatter consults: the caller's identity, dataset
//! accessibility, gene synonyms, condition names and the condition enricher.
//!
//! All of them are read-only for the duration of a request.

use std::collections::BTreeSet;
use togovar_query::Clause;

/// Who is asking. Anonymous callers have no user and no grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<String>,
    /// Restricted datasets this identity may read.
    pub grants: BTreeSet<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            grants: BTreeSet::new(),
        }
    }

    pub fn with_grant(mut self, dataset: impl Into<String>) -> Self {
        self.grants.insert(dataset.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    pub fn may_read(&self, dataset: &str) -> bool {
        self.grants.contains(dataset)
    }
}

/// Dataset visibility policy.
pub trait DatasetAccess: Send + Sync {
    /// Public names of the frequency datasets visible to `identity`.
    fn frequency_datasets(&self, identity: &Identity) -> Vec<String>;

    /// Clinical annotation sources visible to `identity`.
    fn condition_datasets(&self, identity: &Identity) -> Vec<String>;

    /// Every dataset visible to `identity`, including the datasets of the
    /// requested expansion `groups`.
    fn all_datasets(&self, identity: &Identity, groups: &[String]) -> BTreeSet<String>;

    /// Filter applied to every query regardless of identity.
    fn baseline(&self) -> Option<Clause> {
        None
    }
}

pub trait GeneSynonyms: Send + Sync {
    /// Synonyms of the gene with `hgnc_id`; `None` when unknown.
    fn synonyms(&self, hgnc_id: u64) -> Option<Vec<String>>;
}

pub trait ConditionNames: Send + Sync {
    /// Preferred name of a MedGen concept.
    fn name(&self, medgen: &str) -> Option<String>;
}

/// Classification of one condition reported for an accession.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionInterpretation {
    /// Normalised significance ids (`likely_pathogenic`).
    pub classification: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionLookup {
    Found(Vec<ConditionInterpretation>),
    NotFound,
}

/// Supplies condition interpretations for annotation records submitted
/// without them.
pub trait ConditionEnricher: Send + Sync {
    fn lookup(&self, accession: &str) -> ConditionLookup;
}

/// Enricher that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConditionEnricher;

impl ConditionEnricher for NoConditionEnricher {
    fn lookup(&self, _accession: &str) -> ConditionLookup {
        ConditionLookup::NotFound
    }
}

/// Lookup tables with no entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl GeneSynonyms for NoLookup {
    fn synonyms(&self, _hgnc_id: u64) -> Option<Vec<String>> {
        None
    }
}

impl ConditionNames for NoLookup {
    fn name(&self, _medgen: &str) -> Option<String> {
        None
    }
}
