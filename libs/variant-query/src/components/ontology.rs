//! Sequence Ontology backed filters: variant class and predicted consequence.

use super::{child_path, expect_object, index_path, parse_relation, parse_string_list};
use super::{ParseContext, Relation};
use crate::clause::Clause;
use crate::vocabulary::{Term, Vocabulary};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFilter {
    pub relation: Relation,
    /// Variant class labels as stored in the index (`SNV`, `Deletion`).
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsequenceFilter {
    pub relation: Relation,
    /// Consequence keys as stored in the index (`missense_variant`).
    pub keys: Vec<String>,
}

/// Resolve SO ids (or index keys) through `vocabulary`, reporting each
/// unknown term at its own index.
fn resolve_terms<'v>(
    vocabulary: &'v Vocabulary,
    terms: &[String],
    kind: &str,
    path: &str,
    cx: &mut ParseContext<'_>,
) -> Option<Vec<&'v Term>> {
    let mut resolved = Vec::with_capacity(terms.len());
    let mut valid = true;
    for (i, raw) in terms.iter().enumerate() {
        match vocabulary
            .find_by_id(raw)
            .or_else(|| vocabulary.find_by_key(raw))
        {
            Some(term) => resolved.push(term),
            None => {
                cx.error(&index_path(path, i), format!("'{raw}' is not a known {kind}"));
                valid = false;
            }
        }
    }
    valid.then_some(resolved)
}

impl TypeFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;
        let relation = parse_relation(obj, path, cx);
        let terms_path = child_path(path, "terms");
        let terms = parse_string_list(obj.get("terms"), &terms_path, cx)?;

        let vocabularies = cx.vocabularies;
        let labels = resolve_terms(&vocabularies.variant_types, &terms, "variant type", &terms_path, cx)?
            .into_iter()
            .map(|t| t.label.clone())
            .collect();
        Some(Self { relation, labels })
    }

    pub fn compile(&self) -> Clause {
        self.relation
            .apply(Clause::terms("type", self.labels.iter().cloned()))
    }
}

impl ConsequenceFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;
        let relation = parse_relation(obj, path, cx);
        let terms_path = child_path(path, "terms");
        let terms = parse_string_list(obj.get("terms"), &terms_path, cx)?;

        let vocabularies = cx.vocabularies;
        let keys = resolve_terms(&vocabularies.consequences, &terms, "consequence", &terms_path, cx)?
            .into_iter()
            .map(|t| t.key.clone())
            .collect();
        Some(Self { relation, keys })
    }

    pub fn compile(&self) -> Clause {
        self.relation.apply(Clause::nested(
            "vep",
            Clause::terms("vep.consequence", self.keys.iter().cloned()),
        ))
    }
}
