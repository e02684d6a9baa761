//! Statistics aggregations: the request body sent to the backend and the
//! flattened bucket lists read back from its response.
//!
//! Bucket lists are addressed by dotted names (`frequency.source`) built
//! from the aggregation tree, so the formatter never walks raw responses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

pub const FREQUENCY_SOURCE: &str = "frequency.source";
pub const CONDITION_SOURCE: &str = "condition.source";
pub const VARIANT_TYPE: &str = "type";
pub const CLASSIFICATION: &str = "conditions_condition.classification";
pub const CONSEQUENCE: &str = "vep.consequence";
/// Filter aggregation counting variants without any clinical annotation.
pub const CONDITION_ABSENCE: &str = "condition_absence";

/// Name of the sub-aggregation counting parent variants inside nested buckets.
const VARIANT_COUNT: &str = "variants";

const TERMS_SIZE: u64 = 100;

fn terms(field: &str) -> JsonValue {
    json!({ "terms": { "field": field, "size": TERMS_SIZE } })
}

/// Terms aggregation inside a nested scope, counting variants rather than
/// nested documents.
fn nested_terms(path: &str, name: &str, field: &str) -> JsonValue {
    let mut bucket = terms(field);
    bucket["aggs"] = json!({ VARIANT_COUNT: { "reverse_nested": {} } });
    json!({
        "nested": { "path": path },
        "aggs": { name: bucket }
    })
}

/// Aggregations requested when statistics are enabled.
pub fn request_body() -> JsonValue {
    json!({
        "frequency": nested_terms("frequency", "source", "frequency.source"),
        "condition": nested_terms("conditions", "source", "conditions.source"),
        "type": terms("type"),
        "conditions_condition": nested_terms(
            "conditions.condition",
            "classification",
            "conditions.condition.classification"
        ),
        "vep": nested_terms("vep", "consequence", "vep.consequence"),
        CONDITION_ABSENCE: {
            "filter": {
                "bool": {
                    "must_not": [
                        {
                            "nested": {
                                "path": "conditions",
                                "query": { "exists": { "field": "conditions.source" } }
                            }
                        }
                    ]
                }
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: String,
    pub count: u64,
}

impl Bucket {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Bucket lists keyed by dotted aggregation name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregations {
    buckets: BTreeMap<String, Vec<Bucket>>,
}

impl Aggregations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, buckets: Vec<Bucket>) {
        self.buckets.insert(name.into(), buckets);
    }

    pub fn with(mut self, name: impl Into<String>, buckets: Vec<Bucket>) -> Self {
        self.insert(name, buckets);
        self
    }

    /// Buckets of `name`; empty when the aggregation is missing.
    pub fn buckets(&self, name: &str) -> &[Bucket] {
        self.buckets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Flatten the `aggregations` object of a backend response.
    ///
    /// Every bucket list found in the tree is stored under the dotted path of
    /// aggregation names leading to it. Single-bucket aggregations (`filter`,
    /// `nested`) are descended into; their own counts are read with
    /// [`doc_count`].
    pub fn from_response(aggregations: &JsonValue) -> Self {
        let mut out = Self::new();
        if let Some(tree) = aggregations.as_object() {
            collect(tree, "", &mut out);
        }
        out
    }
}

fn collect(tree: &Map<String, JsonValue>, prefix: &str, out: &mut Aggregations) {
    for (name, node) in tree {
        let Some(node) = node.as_object() else {
            continue;
        };
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match node.get("buckets").and_then(JsonValue::as_array) {
            Some(buckets) => out.insert(path, buckets.iter().filter_map(bucket).collect()),
            None => collect(node, &path, out),
        }
    }
}

fn bucket(raw: &JsonValue) -> Option<Bucket> {
    let key = match raw.get("key")? {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };
    let count = raw
        .get(VARIANT_COUNT)
        .and_then(|v| v.get("doc_count"))
        .or_else(|| raw.get("doc_count"))
        .and_then(JsonValue::as_u64)
        .unwrap_or(0);
    Some(Bucket { key, count })
}

/// `doc_count` of a single-bucket aggregation at the top of the tree.
pub fn doc_count(aggregations: &JsonValue, name: &str) -> Option<u64> {
    aggregations.get(name)?.get("doc_count")?.as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_names_match_flattened_names() {
        let body = request_body();
        for name in [FREQUENCY_SOURCE, CONDITION_SOURCE, CLASSIFICATION, CONSEQUENCE] {
            let (outer, inner) = name.split_once('.').unwrap();
            assert!(body[outer]["aggs"][inner].is_object(), "{name}");
        }
        assert!(body[VARIANT_TYPE]["terms"].is_object());
        assert!(body[CONDITION_ABSENCE]["filter"].is_object());
    }

    #[test]
    fn flattens_nested_buckets_with_variant_counts() {
        let response = json!({
            "frequency": {
                "doc_count": 120,
                "source": {
                    "buckets": [
                        { "key": "jga_ngs", "doc_count": 40, "variants": { "doc_count": 30 } },
                        { "key": "tommo", "doc_count": 80, "variants": { "doc_count": 75 } }
                    ]
                }
            },
            "type": {
                "buckets": [ { "key": "SNV", "doc_count": 90 } ]
            },
            "condition_absence": { "doc_count": 12 }
        });

        let aggs = Aggregations::from_response(&response);
        assert_eq!(
            aggs.buckets(FREQUENCY_SOURCE),
            &[Bucket::new("jga_ngs", 30), Bucket::new("tommo", 75)]
        );
        assert_eq!(aggs.buckets(VARIANT_TYPE), &[Bucket::new("SNV", 90)]);
        assert!(aggs.buckets(CONSEQUENCE).is_empty());
        assert_eq!(doc_count(&response, CONDITION_ABSENCE), Some(12));
    }
}
