//! Filter components of a search expression.
//!
//! Each leaf component lives in its own module and owns two rules: how its
//! raw JSON parameter is validated, and how the validated value compiles to
//! a [`Clause`]. The tag table in [`ComponentTag::from_str`] is the only
//! place a tag is resolved to an implementation.

mod clinical;
mod frequency;
mod gene;
mod id;
mod location;
mod ontology;
mod score;

pub use clinical::{DiseaseFilter, SignificanceFilter, CONDITION_SOURCES, NO_CONDITION_KEY};
pub use frequency::{FrequencyFilter, FrequencyMeasure};
pub use gene::GeneFilter;
pub use id::{IdFilter, VARIANT_ID_PREFIX};
pub use location::{canonical_chromosome, LocationFilter, PositionFilter};
pub use ontology::{ConsequenceFilter, TypeFilter};
pub use score::{ScoreFilter, ScoreKind};

use crate::clause::{Clause, RangeBounds};
use crate::dataset::DatasetAliases;
use crate::error::ValidationErrors;
use crate::vocabulary::Vocabularies;
use serde_json::{Map, Value as JsonValue};

/// Discriminant of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTag {
    Id,
    Location,
    Type,
    Consequence,
    Sift,
    Polyphen,
    AlphaMissense,
    Frequency,
    Significance,
    Gene,
    Disease,
    And,
    Or,
}

impl ComponentTag {
    pub const ALL: [ComponentTag; 13] = [
        Self::Id,
        Self::Location,
        Self::Type,
        Self::Consequence,
        Self::Sift,
        Self::Polyphen,
        Self::AlphaMissense,
        Self::Frequency,
        Self::Significance,
        Self::Gene,
        Self::Disease,
        Self::And,
        Self::Or,
    ];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "id" => Some(Self::Id),
            "location" => Some(Self::Location),
            "type" => Some(Self::Type),
            "consequence" => Some(Self::Consequence),
            "sift" => Some(Self::Sift),
            "polyphen" => Some(Self::Polyphen),
            "alphamissense" => Some(Self::AlphaMissense),
            "frequency" => Some(Self::Frequency),
            "significance" => Some(Self::Significance),
            "gene" => Some(Self::Gene),
            "disease" => Some(Self::Disease),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Location => "location",
            Self::Type => "type",
            Self::Consequence => "consequence",
            Self::Sift => "sift",
            Self::Polyphen => "polyphen",
            Self::AlphaMissense => "alphamissense",
            Self::Frequency => "frequency",
            Self::Significance => "significance",
            Self::Gene => "gene",
            Self::Disease => "disease",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// `'id', 'location', ... or 'or'` for error messages.
    pub fn vocabulary_sentence() -> String {
        let quoted: Vec<String> = Self::ALL
            .iter()
            .map(|t| format!("'{}'", t.as_str()))
            .collect();
        match quoted.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }
}

/// A validated leaf filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Id(IdFilter),
    Location(LocationFilter),
    Type(TypeFilter),
    Consequence(ConsequenceFilter),
    Sift(ScoreFilter),
    Polyphen(ScoreFilter),
    AlphaMissense(ScoreFilter),
    Frequency(FrequencyFilter),
    Significance(SignificanceFilter),
    Gene(GeneFilter),
    Disease(DiseaseFilter),
}

impl Component {
    /// Validate the parameter of a leaf tag. Combinator tags return `None`
    /// without recording an error; they are handled by the expression parser.
    pub(crate) fn parse(
        tag: ComponentTag,
        value: &JsonValue,
        path: &str,
        cx: &mut ParseContext<'_>,
    ) -> Option<Self> {
        match tag {
            ComponentTag::Id => IdFilter::parse(value, path, cx).map(Self::Id),
            ComponentTag::Location => LocationFilter::parse(value, path, cx).map(Self::Location),
            ComponentTag::Type => TypeFilter::parse(value, path, cx).map(Self::Type),
            ComponentTag::Consequence => {
                ConsequenceFilter::parse(value, path, cx).map(Self::Consequence)
            }
            ComponentTag::Sift => ScoreFilter::parse(ScoreKind::Sift, value, path, cx).map(Self::Sift),
            ComponentTag::Polyphen => {
                ScoreFilter::parse(ScoreKind::Polyphen, value, path, cx).map(Self::Polyphen)
            }
            ComponentTag::AlphaMissense => {
                ScoreFilter::parse(ScoreKind::AlphaMissense, value, path, cx)
                    .map(Self::AlphaMissense)
            }
            ComponentTag::Frequency => {
                FrequencyFilter::parse(value, path, cx).map(Self::Frequency)
            }
            ComponentTag::Significance => {
                SignificanceFilter::parse(value, path, cx).map(Self::Significance)
            }
            ComponentTag::Gene => GeneFilter::parse(value, path, cx).map(Self::Gene),
            ComponentTag::Disease => DiseaseFilter::parse(value, path, cx).map(Self::Disease),
            ComponentTag::And | ComponentTag::Or => None,
        }
    }

    pub fn compile(&self) -> Clause {
        match self {
            Self::Id(c) => c.compile(),
            Self::Location(c) => c.compile(),
            Self::Type(c) => c.compile(),
            Self::Consequence(c) => c.compile(),
            Self::Sift(c) | Self::Polyphen(c) | Self::AlphaMissense(c) => c.compile(),
            Self::Frequency(c) => c.compile(),
            Self::Significance(c) => c.compile(),
            Self::Gene(c) => c.compile(),
            Self::Disease(c) => c.compile(),
        }
    }
}

/// `eq` keeps the compiled clause, `ne` negates it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Relation {
    #[default]
    Eq,
    Ne,
}

impl Relation {
    pub fn apply(self, clause: Clause) -> Clause {
        match self {
            Self::Eq => clause,
            Self::Ne => Clause::not(clause),
        }
    }
}

/// State threaded through validation: reference data plus the error sink.
pub(crate) struct ParseContext<'a> {
    pub vocabularies: &'a Vocabularies,
    pub aliases: &'a DatasetAliases,
    pub errors: ValidationErrors,
}

impl<'a> ParseContext<'a> {
    pub fn new(vocabularies: &'a Vocabularies, aliases: &'a DatasetAliases) -> Self {
        Self {
            vocabularies,
            aliases,
            errors: ValidationErrors::new(),
        }
    }

    pub fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.add(path, message);
    }
}

pub(crate) fn child_path(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

pub(crate) fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

pub(crate) fn expect_object<'v>(
    value: &'v JsonValue,
    path: &str,
    cx: &mut ParseContext<'_>,
) -> Option<&'v Map<String, JsonValue>> {
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            cx.error(path, "must be an object");
            None
        }
    }
}

pub(crate) fn parse_relation(
    obj: &Map<String, JsonValue>,
    path: &str,
    cx: &mut ParseContext<'_>,
) -> Relation {
    match obj.get("relation") {
        None | Some(JsonValue::Null) => Relation::Eq,
        Some(JsonValue::String(s)) if s == "eq" => Relation::Eq,
        Some(JsonValue::String(s)) if s == "ne" => Relation::Ne,
        Some(_) => {
            cx.error(&child_path(path, "relation"), "must be 'eq' or 'ne'");
            Relation::Eq
        }
    }
}

/// A required, non-empty array of strings.
pub(crate) fn parse_string_list(
    value: Option<&JsonValue>,
    path: &str,
    cx: &mut ParseContext<'_>,
) -> Option<Vec<String>> {
    let Some(value) = value else {
        cx.error(path, "can't be blank");
        return None;
    };
    let Some(items) = value.as_array() else {
        cx.error(path, "must be an array");
        return None;
    };
    if items.is_empty() {
        cx.error(path, "must contain at least one element");
        return None;
    }

    let mut out = Vec::with_capacity(items.len());
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(s) => out.push(s.to_string()),
            None => {
                cx.error(&index_path(path, i), "must be a string");
                valid = false;
            }
        }
    }
    valid.then_some(out)
}

/// A range object using any of `gt`, `gte`, `lt`, `lte`.
pub(crate) fn parse_range(
    value: &JsonValue,
    path: &str,
    integer_only: bool,
    cx: &mut ParseContext<'_>,
) -> Option<RangeBounds> {
    let obj = expect_object(value, path, cx)?;
    let mut bounds = RangeBounds::default();
    let mut valid = true;

    for (key, bound) in obj {
        let slot = match key.as_str() {
            "gt" => &mut bounds.gt,
            "gte" => &mut bounds.gte,
            "lt" => &mut bounds.lt,
            "lte" => &mut bounds.lte,
            other => {
                cx.error(
                    &child_path(path, other),
                    "is not a range operator (use 'gt', 'gte', 'lt' or 'lte')",
                );
                valid = false;
                continue;
            }
        };
        let numeric = if integer_only {
            bound.is_i64() || bound.is_u64()
        } else {
            bound.is_number()
        };
        if !numeric {
            let expected = if integer_only { "an integer" } else { "a number" };
            cx.error(&child_path(path, key), format!("must be {expected}"));
            valid = false;
            continue;
        }
        *slot = Some(bound.clone());
    }

    if valid && bounds.is_empty() {
        cx.error(
            path,
            "must have at least one of 'gt', 'gte', 'lt' or 'lte'",
        );
        return None;
    }
    valid.then_some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_table_round_trips_every_tag() {
        for tag in ComponentTag::ALL {
            assert_eq!(ComponentTag::from_str(tag.as_str()), Some(tag));
        }
        assert_eq!(ComponentTag::from_str("chromosome"), None);
    }

    #[test]
    fn vocabulary_sentence_lists_all_tags() {
        let sentence = ComponentTag::vocabulary_sentence();
        assert!(sentence.starts_with("'id', 'location'"));
        assert!(sentence.ends_with("'and' or 'or'"));
    }

    #[test]
    fn range_rejects_unknown_operators_and_non_numbers() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let parsed = parse_range(&json!({ "gte": "a", "between": 1 }), "q.r", false, &mut cx);
        assert!(parsed.is_none());
        assert!(cx.errors.has_field("q.r.gte"));
        assert!(cx.errors.has_field("q.r.between"));
    }

    #[test]
    fn empty_range_is_rejected() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);

        assert!(parse_range(&json!({}), "q.r", true, &mut cx).is_none());
        assert!(cx.errors.has_field("q.r"));
    }
}
