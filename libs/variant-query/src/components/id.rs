use super::{index_path, parse_string_list, ParseContext};
use crate::clause::Clause;
use serde_json::Value as JsonValue;

/// Prefix of TogoVar variant accessions (`tgv421843`).
pub const VARIANT_ID_PREFIX: &str = "tgv";

/// Match variants by TogoVar accession or by an external identifier such as
/// a dbSNP rs number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFilter {
    pub variant_ids: Vec<u64>,
    pub xref_ids: Vec<String>,
}

impl IdFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let ids = parse_string_list(Some(value), path, cx)?;

        let mut filter = Self {
            variant_ids: Vec::new(),
            xref_ids: Vec::new(),
        };
        let mut valid = true;
        for (i, id) in ids.into_iter().enumerate() {
            match id.strip_prefix(VARIANT_ID_PREFIX) {
                Some(number) => match number.parse::<u64>() {
                    Ok(n) => filter.variant_ids.push(n),
                    Err(_) => {
                        cx.error(&index_path(path, i), format!("'{id}' is not a valid TogoVar ID"));
                        valid = false;
                    }
                },
                None => filter.xref_ids.push(id),
            }
        }
        valid.then_some(filter)
    }

    pub fn compile(&self) -> Clause {
        let mut alternatives = Vec::with_capacity(2);
        if !self.variant_ids.is_empty() {
            alternatives.push(Clause::terms("id", self.variant_ids.iter().copied()));
        }
        if !self.xref_ids.is_empty() {
            alternatives.push(Clause::nested(
                "xref",
                Clause::terms("xref.id", self.xref_ids.iter().cloned()),
            ));
        }
        Clause::any_of(alternatives)
    }
}
