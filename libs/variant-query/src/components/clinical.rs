//! Filters over clinical annotations: interpretation and associated disease.

use super::{child_path, expect_object, index_path, parse_relation, parse_string_list};
use super::{ParseContext, Relation};
use crate::clause::Clause;
use serde_json::Value as JsonValue;

/// Submission sources of clinical annotations.
pub const CONDITION_SOURCES: [&str; 2] = ["mgend", "clinvar"];

/// Pseudo significance matching variants without any clinical annotation.
pub const NO_CONDITION_KEY: &str = "NC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignificanceFilter {
    pub relation: Relation,
    /// Empty means any source.
    pub sources: Vec<String>,
    /// Significance ids (`pathogenic`, `likely_benign`).
    pub classifications: Vec<String>,
    pub no_condition: bool,
}

impl SignificanceFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;
        let relation = parse_relation(obj, path, cx);

        let mut valid = true;
        let mut sources = Vec::new();
        if let Some(raw) = obj.get("source").filter(|v| !v.is_null()) {
            let source_path = child_path(path, "source");
            match parse_string_list(Some(raw), &source_path, cx) {
                Some(list) => {
                    for (i, source) in list.into_iter().enumerate() {
                        if CONDITION_SOURCES.contains(&source.as_str()) {
                            sources.push(source);
                        } else {
                            cx.error(
                                &index_path(&source_path, i),
                                format!("must be one of {}", CONDITION_SOURCES.join(", ")),
                            );
                            valid = false;
                        }
                    }
                }
                None => valid = false,
            }
        }

        let terms_path = child_path(path, "terms");
        let terms = parse_string_list(obj.get("terms"), &terms_path, cx)?;
        let vocabularies = cx.vocabularies;
        let mut classifications = Vec::new();
        let mut no_condition = false;
        for (i, term) in terms.iter().enumerate() {
            if term == NO_CONDITION_KEY {
                no_condition = true;
                continue;
            }
            match vocabularies.significances.find_by_key(term) {
                Some(found) => classifications.push(found.id.clone()),
                None => {
                    cx.error(
                        &index_path(&terms_path, i),
                        format!("'{term}' is not a known clinical significance"),
                    );
                    valid = false;
                }
            }
        }

        valid.then_some(Self {
            relation,
            sources,
            classifications,
            no_condition,
        })
    }

    pub fn compile(&self) -> Clause {
        let source_clause = (!self.sources.is_empty())
            .then(|| Clause::terms("conditions.source", self.sources.iter().cloned()));

        let mut alternatives = Vec::with_capacity(2);
        if !self.classifications.is_empty() {
            let mut scope: Vec<Clause> = source_clause.iter().cloned().collect();
            scope.push(Clause::nested(
                "conditions.condition",
                Clause::terms(
                    "conditions.condition.classification",
                    self.classifications.iter().cloned(),
                ),
            ));
            alternatives.push(Clause::nested("conditions", Clause::all_of(scope)));
        }
        if self.no_condition {
            let annotated =
                source_clause.unwrap_or_else(|| Clause::exists("conditions.source"));
            alternatives.push(Clause::not(Clause::nested("conditions", annotated)));
        }
        self.relation.apply(Clause::any_of(alternatives))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseFilter {
    pub relation: Relation,
    pub medgen_ids: Vec<String>,
}

impl DiseaseFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;
        let relation = parse_relation(obj, path, cx);
        let medgen_ids = parse_string_list(obj.get("terms"), &child_path(path, "terms"), cx)?;
        Some(Self {
            relation,
            medgen_ids,
        })
    }

    pub fn compile(&self) -> Clause {
        self.relation.apply(Clause::nested(
            "conditions",
            Clause::nested(
                "conditions.condition",
                Clause::terms(
                    "conditions.condition.medgen",
                    self.medgen_ids.iter().cloned(),
                ),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetAliases;
    use crate::vocabulary::Vocabularies;
    use serde_json::json;

    #[test]
    fn significance_with_source_scopes_classification() {
        let vocab = Vocabularies::bundled().unwrap();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let filter = SignificanceFilter::parse(
            &json!({ "source": ["clinvar"], "terms": ["P", "LP"] }),
            "query.significance",
            &mut cx,
        )
        .unwrap();
        assert_eq!(filter.classifications, vec!["pathogenic", "likely_pathogenic"]);

        assert_eq!(
            filter.compile().to_dsl(),
            json!({
                "nested": {
                    "path": "conditions",
                    "query": {
                        "bool": {
                            "must": [
                                { "terms": { "conditions.source": ["clinvar"] } },
                                {
                                    "nested": {
                                        "path": "conditions.condition",
                                        "query": {
                                            "terms": {
                                                "conditions.condition.classification": ["pathogenic", "likely_pathogenic"]
                                            }
                                        }
                                    }
                                }
                            ]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn no_condition_matches_unannotated_variants() {
        let vocab = Vocabularies::bundled().unwrap();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let filter = SignificanceFilter::parse(
            &json!({ "terms": ["NC"] }),
            "query.significance",
            &mut cx,
        )
        .unwrap();
        assert_eq!(
            filter.compile().to_dsl(),
            json!({
                "bool": {
                    "must_not": [
                        { "nested": { "path": "conditions", "query": { "exists": { "field": "conditions.source" } } } }
                    ]
                }
            })
        );
    }

    #[test]
    fn unknown_source_and_term_are_both_reported() {
        let vocab = Vocabularies::bundled().unwrap();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let parsed = SignificanceFilter::parse(
            &json!({ "source": ["omim"], "terms": ["XX"] }),
            "query.significance",
            &mut cx,
        );
        assert!(parsed.is_none());
        assert!(cx.errors.has_field("query.significance.source[0]"));
        assert!(cx.errors.has_field("query.significance.terms[0]"));
    }

    #[test]
    fn disease_compiles_doubly_nested_terms() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::identity();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let filter =
            DiseaseFilter::parse(&json!({ "terms": ["C0006142"] }), "query.disease", &mut cx)
                .unwrap();
        let dsl = filter.compile().to_dsl();
        assert_eq!(dsl["nested"]["path"], "conditions");
        assert_eq!(
            dsl["nested"]["query"]["nested"]["query"],
            json!({ "terms": { "conditions.condition.medgen": ["C0006142"] } })
        );
    }
}
