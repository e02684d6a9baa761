//! Response model of the search endpoint.

use crate::document::JsonObject;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Ordered `key -> count` map.
pub type Counts = Map<String, JsonValue>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormattedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<Scroll>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warning: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notice: Vec<String>,
}

impl FormattedResponse {
    /// Response carrying only error messages.
    pub fn errors(messages: Vec<String>) -> Self {
        Self {
            error: messages,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scroll {
    /// Numeric offset or cursor array, as requested.
    pub offset: JsonValue,
    pub limit: u64,
    pub max_rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total: u64,
    pub filtered: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Counts>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub variant_type: Option<Counts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<Counts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consequence: Option<Counts>,
}

/// One formatted variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub variant_type: Option<String>,
    pub chromosome: Option<String>,
    pub position: Option<u64>,
    pub reference: Option<String>,
    pub alternate: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub existing_variations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<GeneSymbol>,
    #[serde(skip_serializing_if = "ExternalLinks::is_empty")]
    pub external_link: ExternalLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<Vec<Significance>>,
    #[serde(flatten)]
    pub vep: Option<VepSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequencies: Option<Vec<JsonObject>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneSymbol {
    pub name: Option<String>,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub title: String,
    pub xref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbsnp: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinvar: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mgend: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tommo: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gnomad: Option<Vec<Link>>,
}

impl ExternalLinks {
    pub fn is_empty(&self) -> bool {
        self.dbsnp.is_none()
            && self.clinvar.is_none()
            && self.mgend.is_none()
            && self.tommo.is_none()
            && self.gnomad.is_none()
    }
}

/// A condition named in a clinical annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionName {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medgen: Option<String>,
}

/// One `(conditions, interpretations)` tuple of a clinical annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Significance {
    pub conditions: Vec<ConditionName>,
    /// Significance keys (`P`, `LB`).
    pub interpretations: Vec<String>,
    pub submission_count: Option<u64>,
    pub source: Option<String>,
}

/// Predicted-effect block, emitted only for documents carrying a `vep` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VepSummary {
    pub most_severe_consequence: Option<String>,
    pub sift: Option<f64>,
    /// Score, or `"Unknown"` for the negative sentinel.
    pub polyphen: Option<JsonValue>,
    pub alphamissense: Option<f64>,
    pub transcripts: Option<Vec<JsonObject>>,
}
