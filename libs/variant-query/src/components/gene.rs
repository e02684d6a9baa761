use super::{child_path, expect_object, index_path, parse_relation, ParseContext, Relation};
use crate::clause::Clause;
use serde_json::Value as JsonValue;

/// Variants annotated on a transcript of one of the given HGNC genes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneFilter {
    pub relation: Relation,
    pub hgnc_ids: Vec<u64>,
}

/// Accepts `404`, `"404"` and `"HGNC:404"`.
fn hgnc_id(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.strip_prefix("HGNC:").unwrap_or(s).parse().ok(),
        _ => None,
    }
}

impl GeneFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;
        let relation = parse_relation(obj, path, cx);

        let terms_path = child_path(path, "terms");
        let terms = match obj.get("terms").and_then(JsonValue::as_array) {
            Some(terms) if !terms.is_empty() => terms,
            Some(_) => {
                cx.error(&terms_path, "must contain at least one element");
                return None;
            }
            None => {
                cx.error(&terms_path, "must be an array");
                return None;
            }
        };

        let mut hgnc_ids = Vec::with_capacity(terms.len());
        let mut valid = true;
        for (i, term) in terms.iter().enumerate() {
            match hgnc_id(term) {
                Some(id) => hgnc_ids.push(id),
                None => {
                    cx.error(&index_path(&terms_path, i), "must be an HGNC ID");
                    valid = false;
                }
            }
        }
        valid.then_some(Self { relation, hgnc_ids })
    }

    pub fn compile(&self) -> Clause {
        self.relation.apply(Clause::nested(
            "vep",
            Clause::terms("vep.hgnc_id", self.hgnc_ids.iter().copied()),
        ))
    }
}
