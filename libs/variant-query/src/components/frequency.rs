use super::{child_path, expect_object, parse_range, ParseContext};
use crate::clause::{Clause, RangeBounds};
use serde_json::Value as JsonValue;

/// What the frequency range applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencyMeasure {
    /// Allele frequency in `[0, 1]`.
    AlleleFrequency(RangeBounds),
    AlleleCount(RangeBounds),
}

/// Allele frequency or count within one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyFilter {
    /// Dataset name as stored in the index.
    pub dataset: String,
    pub measure: Option<FrequencyMeasure>,
    /// Only count calls that passed the dataset's quality filters.
    pub filtered: bool,
}

fn within_unit_interval(bounds: &RangeBounds) -> bool {
    [&bounds.gt, &bounds.gte, &bounds.lt, &bounds.lte]
        .into_iter()
        .flatten()
        .filter_map(JsonValue::as_f64)
        .all(|v| (0.0..=1.0).contains(&v))
}

impl FrequencyFilter {
    pub(crate) fn parse(value: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Self> {
        let obj = expect_object(value, path, cx)?;

        let dataset_path = child_path(path, "dataset");
        let name = match obj.get("dataset") {
            Some(JsonValue::Object(dataset)) => match dataset.get("name").and_then(JsonValue::as_str)
            {
                Some(name) if !name.is_empty() => Some(name),
                _ => {
                    cx.error(&child_path(&dataset_path, "name"), "can't be blank");
                    None
                }
            },
            None | Some(JsonValue::Null) => {
                cx.error(&dataset_path, "can't be blank");
                None
            }
            Some(_) => {
                cx.error(&dataset_path, "must be an object");
                None
            }
        };

        let measure = match (obj.get("frequency"), obj.get("count")) {
            (Some(_), Some(_)) => {
                cx.error(path, "must specify either 'frequency' or 'count', not both");
                return None;
            }
            (Some(range), None) => {
                let range_path = child_path(path, "frequency");
                let bounds = parse_range(range, &range_path, false, cx)?;
                if !within_unit_interval(&bounds) {
                    cx.error(&range_path, "must be between 0 and 1");
                    return None;
                }
                Some(FrequencyMeasure::AlleleFrequency(bounds))
            }
            (None, Some(range)) => Some(FrequencyMeasure::AlleleCount(parse_range(
                range,
                &child_path(path, "count"),
                true,
                cx,
            )?)),
            (None, None) => None,
        };

        let filtered = match obj.get("filtered") {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::Bool(b)) => *b,
            Some(_) => {
                cx.error(&child_path(path, "filtered"), "must be a boolean");
                return None;
            }
        };

        Some(Self {
            dataset: cx.aliases.to_index(name?),
            measure,
            filtered,
        })
    }

    pub fn compile(&self) -> Clause {
        let mut clauses = vec![Clause::term("frequency.source", self.dataset.as_str())];
        match &self.measure {
            Some(FrequencyMeasure::AlleleFrequency(bounds)) => {
                clauses.push(Clause::range("frequency.af", bounds.clone()))
            }
            Some(FrequencyMeasure::AlleleCount(bounds)) => {
                clauses.push(Clause::range("frequency.ac", bounds.clone()))
            }
            None => {}
        }
        if self.filtered {
            clauses.push(Clause::term("frequency.filter", "PASS"));
        }
        Clause::nested("frequency", Clause::all_of(clauses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetAliases;
    use crate::vocabulary::Vocabularies;
    use serde_json::json;

    #[test]
    fn public_dataset_name_is_aliased_to_index_name() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::default();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let filter = FrequencyFilter::parse(
            &json!({
                "dataset": { "name": "jga_wes" },
                "frequency": { "gte": 0.0, "lte": 0.01 },
                "filtered": true
            }),
            "query.frequency",
            &mut cx,
        )
        .unwrap();

        assert_eq!(
            filter.compile().to_dsl(),
            json!({
                "nested": {
                    "path": "frequency",
                    "query": {
                        "bool": {
                            "must": [
                                { "term": { "frequency.source": "jga_ngs" } },
                                { "range": { "frequency.af": { "gte": 0.0, "lte": 0.01 } } },
                                { "term": { "frequency.filter": "PASS" } }
                            ]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn count_range_targets_allele_count() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::default();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let filter = FrequencyFilter::parse(
            &json!({ "dataset": { "name": "gem_j_wga" }, "count": { "gt": 2 } }),
            "query.frequency",
            &mut cx,
        )
        .unwrap();
        let dsl = filter.compile().to_dsl();
        assert_eq!(
            dsl["nested"]["query"]["bool"]["must"][1],
            json!({ "range": { "frequency.ac": { "gt": 2 } } })
        );
    }

    #[test]
    fn frequency_and_count_are_exclusive() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::default();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let parsed = FrequencyFilter::parse(
            &json!({
                "dataset": { "name": "tommo" },
                "frequency": { "gte": 0.1 },
                "count": { "gte": 1 }
            }),
            "query.frequency",
            &mut cx,
        );
        assert!(parsed.is_none());
        assert!(cx.errors.has_field("query.frequency"));
    }

    #[test]
    fn frequency_out_of_unit_interval_is_rejected() {
        let vocab = Vocabularies::default();
        let aliases = DatasetAliases::default();
        let mut cx = ParseContext::new(&vocab, &aliases);

        let parsed = FrequencyFilter::parse(
            &json!({ "dataset": { "name": "tommo" }, "frequency": { "lte": 2 } }),
            "query.frequency",
            &mut cx,
        );
        assert!(parsed.is_none());
        assert!(cx.errors.has_field("query.frequency.frequency"));
    }
}
