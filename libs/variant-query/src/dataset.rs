//! Dataset-name aliasing between public names and search index names.
//!
//! Two kinds of rules exist:
//! - a renamed dataset whose index name differs from its public name
//!   (`jga_wes` is indexed as `jga_ngs`);
//! - parametrised cohort families whose public `"<base>"` form is indexed as
//!   `"<base>.all"` (`bbj_riken.mpheno12` ↔ `bbj_riken.mpheno12.all`).
//!
//! The same table is applied in both directions: the query assembler maps
//! public names to index names, the formatter maps index names back.

use crate::error::Result;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetRename {
    /// Name stored in the search index.
    pub index: String,
    /// Name exposed to API clients.
    pub public: String,
}

/// Serializable description of the alias table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetAliasConfig {
    #[serde(default)]
    pub renames: Vec<DatasetRename>,
    /// Anchored patterns matching the public `<base>` names of cohort families.
    #[serde(default)]
    pub cohort_patterns: Vec<String>,
    #[serde(default = "default_cohort_suffix")]
    pub cohort_suffix: String,
}

fn default_cohort_suffix() -> String {
    ".all".to_string()
}

impl Default for DatasetAliasConfig {
    fn default() -> Self {
        Self {
            renames: vec![DatasetRename {
                index: "jga_ngs".to_string(),
                public: "jga_wes".to_string(),
            }],
            cohort_patterns: vec![r"^bbj_riken\.mpheno\d+$".to_string()],
            cohort_suffix: default_cohort_suffix(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetAliases {
    renames: Vec<DatasetRename>,
    cohort_patterns: Vec<Regex>,
    cohort_suffix: String,
}

impl DatasetAliases {
    pub fn from_config(config: &DatasetAliasConfig) -> Result<Self> {
        let cohort_patterns = config
            .cohort_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            renames: config.renames.clone(),
            cohort_patterns,
            cohort_suffix: config.cohort_suffix.clone(),
        })
    }

    /// A table without any rule; every name maps to itself.
    pub fn identity() -> Self {
        Self {
            renames: Vec::new(),
            cohort_patterns: Vec::new(),
            cohort_suffix: default_cohort_suffix(),
        }
    }

    /// Public dataset name → name used in the search index.
    pub fn to_index(&self, public: &str) -> String {
        if let Some(rename) = self.renames.iter().find(|r| r.public == public) {
            return rename.index.clone();
        }
        if self.is_cohort_base(public) {
            return format!("{public}{}", self.cohort_suffix);
        }
        public.to_string()
    }

    /// Search index name → public dataset name.
    pub fn to_public(&self, index: &str) -> String {
        if let Some(rename) = self.renames.iter().find(|r| r.index == index) {
            return rename.public.clone();
        }
        if let Some(base) = index.strip_suffix(self.cohort_suffix.as_str()) {
            if self.is_cohort_base(base) {
                return base.to_string();
            }
        }
        index.to_string()
    }

    fn is_cohort_base(&self, name: &str) -> bool {
        self.cohort_patterns.iter().any(|p| p.is_match(name))
    }
}

impl Default for DatasetAliases {
    fn default() -> Self {
        // The default config only holds literal, known-good patterns.
        Self::from_config(&DatasetAliasConfig::default()).unwrap_or_else(|_| Self::identity())
    }
}
