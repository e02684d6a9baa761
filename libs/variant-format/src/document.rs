//! Typed view of an indexed variant document.
//!
//! Every field is optional; absent, `null` and ill-typed fields decode to
//! their defaults, so one bad field never loses the rest of the document.
//! List fields also accept a lone item, and skip items that do not decode.
//! Transcript and frequency entries stay as JSON objects since they are
//! re-emitted with their own keys.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};

pub type JsonObject = Map<String, JsonValue>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VariantDocument {
    pub id: Option<JsonValue>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub variant_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub chromosome: Option<Chromosome>,
    #[serde(deserialize_with = "lenient")]
    pub vcf: Option<Vcf>,
    #[serde(deserialize_with = "list")]
    pub xref: Vec<Xref>,
    /// `None` when the document carries no `vep` key at all.
    #[serde(deserialize_with = "present_list")]
    pub vep: Option<Vec<JsonObject>>,
    #[serde(deserialize_with = "lenient")]
    pub sift: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub polyphen: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub alphamissense: Option<f64>,
    #[serde(deserialize_with = "present_list")]
    pub conditions: Option<Vec<ConditionRecord>>,
    #[serde(deserialize_with = "present_list")]
    pub frequency: Option<Vec<JsonObject>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Chromosome {
    #[serde(deserialize_with = "lenient")]
    pub index: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Vcf {
    #[serde(deserialize_with = "lenient")]
    pub position: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub reference: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub alternate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Xref {
    #[serde(deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
}

/// One clinical annotation submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConditionRecord {
    #[serde(deserialize_with = "lenient")]
    pub source: Option<String>,
    /// Accession at the source; numeric for ClinVar.
    pub id: Option<JsonValue>,
    #[serde(deserialize_with = "list")]
    pub condition: Vec<ConditionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConditionEntry {
    #[serde(deserialize_with = "list")]
    pub medgen: Vec<String>,
    #[serde(deserialize_with = "list")]
    pub pref_name: Vec<String>,
    #[serde(deserialize_with = "list")]
    pub classification: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub submission_count: Option<u64>,
}

impl VariantDocument {
    pub fn chromosome_label(&self) -> Option<&str> {
        self.chromosome.as_ref()?.label.as_deref()
    }

    pub fn position(&self) -> Option<u64> {
        self.vcf.as_ref()?.position
    }

    pub fn reference(&self) -> Option<&str> {
        self.vcf.as_ref()?.reference.as_deref()
    }

    pub fn alternate(&self) -> Option<&str> {
        self.vcf.as_ref()?.alternate.as_deref()
    }

    /// Source names of the frequency entries, as indexed.
    pub fn frequency_sources(&self) -> impl Iterator<Item = &str> {
        self.frequency
            .iter()
            .flatten()
            .filter_map(|f| f.get("source").and_then(JsonValue::as_str))
    }

    pub fn condition_from(&self, source: &str) -> Option<&ConditionRecord> {
        self.conditions
            .iter()
            .flatten()
            .find(|c| c.source.as_deref() == Some(source))
    }
}

/// `T`, or `None` when the value has another shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Items of a list, or a lone item, that decode as `T`. Others are skipped.
fn items<T: DeserializeOwned>(value: JsonValue) -> Vec<T> {
    match value {
        JsonValue::Null => Vec::new(),
        JsonValue::Array(values) => values
            .into_iter()
            .filter_map(|v| T::deserialize(v).ok())
            .collect(),
        single => T::deserialize(single).ok().into_iter().collect(),
    }
}

fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(items(JsonValue::deserialize(deserializer)?))
}

/// A present key decodes to `Some`, even when `null`.
fn present_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Some(items(JsonValue::deserialize(deserializer)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_scalar_or_list_condition_fields() {
        let doc: VariantDocument = serde_json::from_value(json!({
            "id": 1,
            "conditions": [
                {
                    "source": "clinvar",
                    "id": 12345,
                    "condition": [
                        { "medgen": "C0006142", "classification": ["Pathogenic"], "submission_count": 3 },
                        { "medgen": ["C0027672", "C3661900"], "classification": "Likely benign" }
                    ]
                }
            ]
        }))
        .unwrap();

        let entries = &doc.conditions.as_ref().unwrap()[0].condition;
        assert_eq!(entries[0].medgen, vec!["C0006142"]);
        assert_eq!(entries[1].medgen, vec!["C0027672", "C3661900"]);
        assert_eq!(entries[1].classification, vec!["Likely benign"]);
        assert_eq!(entries[1].submission_count, None);
    }

    #[test]
    fn ill_typed_fields_fall_back_to_defaults() {
        let doc: VariantDocument = serde_json::from_value(json!({
            "type": 7,
            "vcf": { "position": "high", "reference": "A" },
            "xref": [
                { "source": "dbSNP", "id": "rs1" },
                { "source": "other", "id": 12345 },
                "rs2"
            ],
            "sift": "0.01",
            "polyphen": 0.5,
            "conditions": [{ "source": "mgend", "condition": { "medgen": ["C1", 2], "submission_count": "many" } }]
        }))
        .unwrap();

        assert_eq!(doc.variant_type, None);
        assert_eq!(doc.position(), None);
        assert_eq!(doc.reference(), Some("A"));
        assert_eq!(doc.xref.len(), 2);
        assert_eq!(doc.xref[1].source.as_deref(), Some("other"));
        assert_eq!(doc.xref[1].id, None);
        assert_eq!(doc.sift, None);
        assert_eq!(doc.polyphen, Some(0.5));

        let entry = &doc.condition_from("mgend").unwrap().condition[0];
        assert_eq!(entry.medgen, vec!["C1"]);
        assert_eq!(entry.submission_count, None);
    }

    #[test]
    fn key_presence_is_kept_for_list_sections() {
        let doc: VariantDocument =
            serde_json::from_value(json!({ "vep": null, "xref": null })).unwrap();
        assert_eq!(doc.vep, Some(Vec::new()));
        assert!(doc.xref.is_empty());
        assert_eq!(doc.conditions, None);
        assert_eq!(doc.frequency, None);
    }
}
