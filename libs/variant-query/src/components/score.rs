//! Pathogenicity predictor filters. Each predictor publishes a small set of
//! class codes, each code being a fixed interval of the raw score.

use super::{child_path, expect_object, index_path, parse_relation, parse_string_list};
use super::{ParseContext, Relation};
use crate::clause::{Clause, RangeBounds};
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Sift,
    Polyphen,
    AlphaMissense,
}

struct ScoreClass {
    code: &'static str,
    gt: Option<f64>,
    gte: Option<f64>,
    lt: Option<f64>,
    lte: Option<f64>,
}

impl ScoreClass {
    const UNBOUNDED: Self = Self {
        code: "",
        gt: None,
        gte: None,
        lt: None,
        lte: None,
    };

    fn bounds(&self) -> RangeBounds {
        RangeBounds {
            gt: self.gt.map(|v| json!(v)),
            gte: self.gte.map(|v| json!(v)),
            lt: self.lt.map(|v| json!(v)),
            lte: self.lte.map(|v| json!(v)),
        }
    }
}

const SIFT_CLASSES: &[ScoreClass] = &[
    ScoreClass {
        code: "D",
        lt: Some(0.05),
        ..ScoreClass::UNBOUNDED
    },
    ScoreClass {
        code: "T",
        gte: Some(0.05),
        ..ScoreClass::UNBOUNDED
    },
];

// Negative PolyPhen scores encode an "unknown" prediction.
const POLYPHEN_CLASSES: &[ScoreClass] = &[
    ScoreClass {
        code: "PROBD",
        gt: Some(0.908),
        ..ScoreClass::UNBOUNDED
    },
    ScoreClass {
        code: "POSSD",
        gt: Some(0.446),
        lte: Some(0.908),
        ..ScoreClass::UNBOUNDED
    },
    ScoreClass {
        code: "B",
        gte: Some(0.0),
        lte: Some(0.446),
        ..ScoreClass::UNBOUNDED
    },
    ScoreClass {
        code: "U",
        lt: Some(0.0),
        ..ScoreClass::UNBOUNDED
    },
];

const ALPHAMISSENSE_CLASSES: &[ScoreClass] = &[
    ScoreClass {
        code: "LP",
        gt: Some(0.564),
        ..ScoreClass::UNBOUNDED
    },
    ScoreClass {
        code: "A",
        gte: Some(0.34),
        lte: Some(0.564),
        ..ScoreClass::UNBOUNDED
    },
    ScoreClass {
        code: "LB",
        lt: Some(0.34),
        ..ScoreClass::UNBOUNDED
    },
];

impl ScoreKind {
    pub fn field(self) -> &'static str {
        match self {
            Self::Sift => "sift",
            Self::Polyphen => "polyphen",
            Self::AlphaMissense => "alphamissense",
        }
    }

    fn classes(self) -> &'static [ScoreClass] {
        match self {
            Self::Sift => SIFT_CLASSES,
            Self::Polyphen => POLYPHEN_CLASSES,
            Self::AlphaMissense => ALPHAMISSENSE_CLASSES,
        }
    }

    pub fn codes(self) -> impl Iterator<Item = &'static str> {
        self.classes().iter().map(|c| c.code)
    }

    fn class(self, code: &str) -> Option<&'static ScoreClass> {
        self.classes().iter().find(|c| c.code == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreFilter {
    pub kind: ScoreKind,
    pub relation: Relation,
    pub codes: Vec<&'static str>,
}

impl ScoreFilter {
    pub(crate) fn parse(
        kind: ScoreKind,
        value: &JsonValue,
        path: &str,
        cx: &mut ParseContext<'_>,
    ) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;
        let relation = parse_relation(obj, path, cx);
        let terms_path = child_path(path, "terms");
        let terms = parse_string_list(obj.get("terms"), &terms_path, cx)?;

        let mut codes = Vec::with_capacity(terms.len());
        let mut valid = true;
        for (i, term) in terms.iter().enumerate() {
            match kind.class(term) {
                Some(class) => codes.push(class.code),
                None => {
                    let allowed: Vec<&str> = kind.codes().collect();
                    cx.error(
                        &index_path(&terms_path, i),
                        format!("must be one of {}", allowed.join(", ")),
                    );
                    valid = false;
                }
            }
        }

        valid.then_some(Self {
            kind,
            relation,
            codes,
        })
    }

    pub fn compile(&self) -> Clause {
        let field = self.kind.field();
        let ranges = self
            .codes
            .iter()
            .filter_map(|code| self.kind.class(code))
            .map(|class| Clause::range(field, class.bounds()))
            .collect();
        self.relation.apply(Clause::any_of(ranges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetAliases;
    use crate::vocabulary::Vocabularies;

    fn parse(kind: ScoreKind, value: JsonValue) -> (Option<ScoreFilter>, Vec<String>) {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);
        let parsed = ScoreFilter::parse(kind, &value, "query.score", &mut cx);
        (parsed, cx.errors.messages())
    }

    #[test]
    fn polyphen_possibly_damaging_is_half_open() {
        let (filter, _) = parse(ScoreKind::Polyphen, json!({ "terms": ["POSSD"] }));
        assert_eq!(
            filter.unwrap().compile().to_dsl(),
            json!({ "range": { "polyphen": { "gt": 0.446, "lte": 0.908 } } })
        );
    }

    #[test]
    fn several_classes_become_alternatives() {
        let (filter, _) = parse(ScoreKind::AlphaMissense, json!({ "terms": ["LP", "LB"] }));
        assert_eq!(
            filter.unwrap().compile().to_dsl(),
            json!({
                "bool": {
                    "should": [
                        { "range": { "alphamissense": { "gt": 0.564 } } },
                        { "range": { "alphamissense": { "lt": 0.34 } } }
                    ],
                    "minimum_should_match": 1
                }
            })
        );
    }

    #[test]
    fn sift_boundary_belongs_to_tolerated() {
        let (filter, _) = parse(ScoreKind::Sift, json!({ "relation": "ne", "terms": ["T"] }));
        assert_eq!(
            filter.unwrap().compile().to_dsl(),
            json!({ "bool": { "must_not": [ { "range": { "sift": { "gte": 0.05 } } } ] } })
        );
    }

    #[test]
    fn unknown_code_is_rejected() {
        let (filter, errors) = parse(ScoreKind::Sift, json!({ "terms": ["B"] }));
        assert!(filter.is_none());
        assert_eq!(errors, vec!["query.score.terms[0] must be one of D, T"]);
    }
}
