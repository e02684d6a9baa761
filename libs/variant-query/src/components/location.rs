use super::{child_path, expect_object, parse_range, ParseContext};
use crate::clause::{Clause, RangeBounds};
use serde_json::Value as JsonValue;

const CHROMOSOMES: [&str; 25] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

#[derive(Debug, Clone, PartialEq)]
pub enum PositionFilter {
    Exact(u64),
    Range(RangeBounds),
}

/// Restrict to a chromosome and, optionally, a position or interval on it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFilter {
    pub chromosome: String,
    pub position: Option<PositionFilter>,
}

/// Canonical chromosome label: `chr` prefix dropped, `M` spelled `MT`.
/// Returns `None` for anything outside 1-22, X, Y and MT.
pub fn canonical_chromosome(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    let bare = trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("CHR"))
        .or_else(|| trimmed.strip_prefix("Chr"))
        .unwrap_or(trimmed);
    let upper = bare.to_ascii_uppercase();
    let name = if upper == "M" { "MT" } else { upper.as_str() };
    CHROMOSOMES.iter().copied().find(|c| *c == name)
}

impl LocationFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;

        let chromosome_path = child_path(path, "chromosome");
        let chromosome = match obj.get("chromosome") {
            Some(JsonValue::String(s)) => canonical_chromosome(s),
            Some(JsonValue::Number(n)) => canonical_chromosome(&n.to_string()),
            None | Some(JsonValue::Null) => {
                cx.error(&chromosome_path, "can't be blank");
                return None;
            }
            Some(_) => None,
        };
        let chromosome = match chromosome {
            Some(c) => c.to_string(),
            None => {
                cx.error(&chromosome_path, "must be one of 1-22, X, Y or MT");
                return None;
            }
        };

        let position_path = child_path(path, "position");
        let position = match obj.get("position") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Number(n)) => match n.as_u64() {
                Some(p) => Some(PositionFilter::Exact(p)),
                None => {
                    cx.error(&position_path, "must be a non-negative integer");
                    return None;
                }
            },
            Some(range @ JsonValue::Object(_)) => {
                Some(PositionFilter::Range(parse_range(range, &position_path, true, cx)?))
            }
            Some(_) => {
                cx.error(&position_path, "must be an integer or a range");
                return None;
            }
        };

        Some(Self {
            chromosome,
            position,
        })
    }

    pub fn compile(&self) -> Clause {
        let mut clauses = vec![Clause::term("chromosome.label", self.chromosome.as_str())];
        match &self.position {
            Some(PositionFilter::Exact(p)) => clauses.push(Clause::term("vcf.position", *p)),
            Some(PositionFilter::Range(bounds)) => {
                clauses.push(Clause::range("vcf.position", bounds.clone()))
            }
            None => {}
        }
        Clause::all_of(clauses)
    }
}
