//! Result Formatter: raw backend result to the public response.

use crate::access::{
    ConditionEnricher, ConditionNames, DatasetAccess, GeneSynonyms, Identity,
};
use crate::config::FormatterConfig;
use crate::document::VariantDocument;
use crate::raw::RawSearchResult;
use crate::record;
use crate::response::{Counts, FormattedResponse, Record, Scroll, Statistics};
use once_cell::unsync::OnceCell;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeSet, HashMap};
use togovar_query::aggregation::{
    CLASSIFICATION, CONDITION_SOURCE, CONSEQUENCE, FREQUENCY_SOURCE, VARIANT_TYPE,
};
use togovar_query::components::NO_CONDITION_KEY;
use togovar_query::vocabulary::normalize_significance_id;
use togovar_query::{Aggregations, Bucket, DatasetAliases, PaginationSpec, Vocabularies, MAX_ROWS};

/// Output layout selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Full,
    /// Records only: no `scroll`, no `statistics`.
    Reduced,
}

impl OutputMode {
    /// `formatter=jogo` selects the reduced layout.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("jogo") => Self::Reduced,
            _ => Self::Full,
        }
    }
}

/// Per-request inputs of [`ResultFormatter::format`].
#[derive(Debug, Clone, Default)]
pub struct FormatRequest {
    pub pagination: PaginationSpec,
    pub mode: OutputMode,
    pub identity: Identity,
    /// Dataset expansion groups requested by the caller.
    pub expand_dataset: Vec<String>,
    /// HGNC ids listed first among gene symbols.
    pub gene_order: Vec<u64>,
}

/// Reference data and collaborators shared by all requests.
#[derive(Clone, Copy)]
pub struct ResultFormatter<'a> {
    pub config: &'a FormatterConfig,
    pub vocabularies: &'a Vocabularies,
    pub aliases: &'a DatasetAliases,
    pub datasets: &'a dyn DatasetAccess,
    pub synonyms: &'a dyn GeneSynonyms,
    pub names: &'a dyn ConditionNames,
    pub enricher: &'a dyn ConditionEnricher,
}

/// Lookups memoized for the duration of one `format` call.
struct RequestScope<'f, 'r> {
    formatter: &'f ResultFormatter<'f>,
    request: &'r FormatRequest,
    accessible: OnceCell<BTreeSet<String>>,
    synonyms: HashMap<u64, Option<Vec<String>>>,
    names: HashMap<String, Option<String>>,
}

impl<'f, 'r> RequestScope<'f, 'r> {
    fn accessible_datasets(&self) -> &BTreeSet<String> {
        self.accessible.get_or_init(|| {
            self.formatter
                .datasets
                .all_datasets(&self.request.identity, &self.request.expand_dataset)
        })
    }
}

impl<'a> ResultFormatter<'a> {
    pub fn format(&self, raw: RawSearchResult, request: &FormatRequest) -> FormattedResponse {
        let mut scope = RequestScope {
            formatter: self,
            request,
            accessible: OnceCell::new(),
            synonyms: HashMap::new(),
            names: HashMap::new(),
        };
        let mut response = FormattedResponse::default();

        if request.mode == OutputMode::Full {
            response.scroll = Some(scroll(&request.pagination));
            response.statistics = self.statistics(&raw, &scope);
        }

        if let Some(hits) = raw.hits {
            let mut records = Vec::with_capacity(hits.len());
            for (i, hit) in hits.into_iter().enumerate() {
                match decode_hit(hit) {
                    Ok(doc) => records.push(self.record(&doc, &mut scope)),
                    Err(e) => {
                        tracing::warn!(hit = i, error = %e, "skipping undecodable search hit");
                        response
                            .warning
                            .push(format!("Skipped an unreadable record at position {i}"));
                    }
                }
            }
            response.data = Some(records);
        }

        response
    }

    /// `None` unless aggregations were returned.
    fn statistics(&self, raw: &RawSearchResult, scope: &RequestScope<'_, '_>) -> Option<Statistics> {
        let aggs = raw.aggregations.as_ref().filter(|a| !a.is_empty())?;
        Some(Statistics {
            total: raw.total,
            filtered: raw.filtered,
            dataset: Some(self.dataset_counts(aggs, scope.accessible_datasets())),
            variant_type: Some(self.type_counts(aggs)),
            significance: Some(self.significance_counts(aggs, raw.condition_absence)),
            consequence: Some(self.consequence_counts(aggs)),
        })
    }

    /// Bucket counts under public dataset names, zero-filled for every
    /// accessible dataset and restricted to them.
    fn dataset_counts(&self, aggs: &Aggregations, accessible: &BTreeSet<String>) -> Counts {
        let buckets = aggs
            .buckets(FREQUENCY_SOURCE)
            .iter()
            .chain(aggs.buckets(CONDITION_SOURCE))
            .map(|b| Bucket::new(self.aliases.to_public(&b.key), b.count));
        let filled = zero_fill(buckets, accessible.iter().map(String::as_str));

        let mut counts = Counts::new();
        for bucket in filled {
            if accessible.contains(&bucket.key) {
                counts.entry(bucket.key).or_insert(json!(bucket.count));
            }
        }
        counts
    }

    fn type_counts(&self, aggs: &Aggregations) -> Counts {
        let types = &self.vocabularies.variant_types;
        let filled = zero_fill(aggs.buckets(VARIANT_TYPE).iter().cloned(), types.labels());
        let mut counts = Counts::new();
        for bucket in filled {
            if let Some(term) = types.find_by_label(&bucket.key) {
                counts.entry(term.id.clone()).or_insert(json!(bucket.count));
            }
        }
        counts
    }

    /// Classification buckets keyed by significance key, plus the
    /// no-condition count.
    fn significance_counts(&self, aggs: &Aggregations, condition_absence: Option<u64>) -> Counts {
        let significances = &self.vocabularies.significances;
        let normalized = aggs
            .buckets(CLASSIFICATION)
            .iter()
            .map(|b| Bucket::new(normalize_significance_id(&b.key), b.count));
        let filled = zero_fill(normalized, significances.ids());

        let mut counts = Counts::new();
        for bucket in filled {
            if let Some(term) = significances.find_by_id(&bucket.key) {
                counts.entry(term.key.clone()).or_insert(json!(bucket.count));
            }
        }
        counts.insert(
            NO_CONDITION_KEY.to_string(),
            json!(condition_absence.unwrap_or(0)),
        );
        counts
    }

    fn consequence_counts(&self, aggs: &Aggregations) -> Counts {
        let consequences = &self.vocabularies.consequences;
        let filled = zero_fill(aggs.buckets(CONSEQUENCE).iter().cloned(), consequences.keys());
        let mut counts = Counts::new();
        for bucket in filled {
            if let Some(term) = consequences.find_by_key(&bucket.key) {
                counts.entry(term.id.clone()).or_insert(json!(bucket.count));
            }
        }
        counts
    }

    fn record(&self, doc: &VariantDocument, scope: &mut RequestScope<'_, '_>) -> Record {
        let existing_variations = record::existing_variations(doc);
        let external_link =
            record::external_links(doc, &existing_variations, &self.config.xref);

        let synonyms = self.synonyms;
        let symbols = record::gene_symbols(doc, &scope.request.gene_order, |id| {
            scope
                .synonyms
                .entry(id)
                .or_insert_with(|| synonyms.synonyms(id))
                .clone()
        });

        let names = self.names;
        let significance = doc.conditions.as_deref().map(|conditions| {
            record::significance(
                conditions,
                &self.vocabularies.significances,
                self.enricher,
                |medgen| {
                    scope
                        .names
                        .entry(medgen.to_string())
                        .or_insert_with(|| names.name(medgen))
                        .clone()
                },
            )
        });

        let frequencies = doc.frequency.as_deref().map(|entries| {
            record::frequencies(entries, self.aliases, scope.accessible_datasets())
        });

        Record {
            id: record::accession(doc),
            variant_type: record::variant_type(doc, &self.vocabularies.variant_types),
            chromosome: doc.chromosome_label().map(str::to_string),
            position: doc.position(),
            reference: doc.reference().map(str::to_string),
            alternate: doc.alternate().map(str::to_string),
            existing_variations,
            symbols,
            external_link,
            significance,
            vep: record::vep_summary(doc, self.vocabularies),
            frequencies,
        }
    }
}

/// Ill-typed fields inside an object decode to defaults; only a hit that is
/// not an object at all is rejected.
fn decode_hit(hit: JsonValue) -> serde_json::Result<VariantDocument> {
    if !hit.is_object() {
        return Err(serde::de::Error::custom(format!(
            "expected a document object, found {hit}"
        )));
    }
    serde_json::from_value(hit)
}

fn scroll(pagination: &PaginationSpec) -> Scroll {
    Scroll {
        offset: pagination
            .offset
            .as_ref()
            .map(|o| o.to_json())
            .unwrap_or_else(|| JsonValue::from(0)),
        limit: pagination.limit,
        max_rows: MAX_ROWS,
    }
}

/// `buckets` followed by a zero-count bucket for every canonical key they
/// do not contain.
fn zero_fill<'k>(
    buckets: impl IntoIterator<Item = Bucket>,
    canonical: impl IntoIterator<Item = &'k str>,
) -> Vec<Bucket> {
    let mut out: Vec<Bucket> = buckets.into_iter().collect();
    for key in canonical {
        if !out.iter().any(|b| b.key == key) {
            out.push(Bucket::new(key, 0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{NoConditionEnricher, NoLookup};

    struct Datasets;

    impl DatasetAccess for Datasets {
        fn frequency_datasets(&self, _identity: &Identity) -> Vec<String> {
            vec!["jga_wes".into(), "tommo".into()]
        }

        fn condition_datasets(&self, _identity: &Identity) -> Vec<String> {
            vec!["clinvar".into()]
        }

        fn all_datasets(&self, _identity: &Identity, _groups: &[String]) -> BTreeSet<String> {
            ["jga_wes", "tommo", "clinvar"].iter().map(|s| s.to_string()).collect()
        }
    }

    fn with_formatter<T>(f: impl FnOnce(&ResultFormatter<'_>) -> T) -> T {
        let config = FormatterConfig::default();
        let vocabularies = Vocabularies::bundled().unwrap();
        let aliases = DatasetAliases::default();
        let formatter = ResultFormatter {
            config: &config,
            vocabularies: &vocabularies,
            aliases: &aliases,
            datasets: &Datasets,
            synonyms: &NoLookup,
            names: &NoLookup,
            enricher: &NoConditionEnricher,
        };
        f(&formatter)
    }

    #[test]
    fn statistics_zero_fill_and_filter_datasets() {
        let aggs = Aggregations::new()
            .with(FREQUENCY_SOURCE, vec![Bucket::new("jga_ngs", 4), Bucket::new("gem_j_wga", 9)])
            .with(CONDITION_SOURCE, vec![Bucket::new("clinvar", 2)])
            .with(VARIANT_TYPE, vec![Bucket::new("SNV", 5)])
            .with(CLASSIFICATION, vec![Bucket::new("Likely pathogenic", 3)])
            .with(CONSEQUENCE, vec![Bucket::new("missense_variant", 6)]);
        let raw = RawSearchResult {
            total: 100,
            filtered: 6,
            hits: None,
            aggregations: Some(aggs),
            condition_absence: Some(1),
        };

        let response = with_formatter(|f| f.format(raw, &FormatRequest::default()));
        let stats = response.statistics.unwrap();
        assert_eq!((stats.total, stats.filtered), (100, 6));

        let dataset = stats.dataset.unwrap();
        assert_eq!(dataset.get("jga_wes"), Some(&json!(4)));
        assert_eq!(dataset.get("clinvar"), Some(&json!(2)));
        assert_eq!(dataset.get("tommo"), Some(&json!(0)));
        assert!(dataset.get("gem_j_wga").is_none());

        let types = stats.variant_type.unwrap();
        assert_eq!(types.get("SO_0001483"), Some(&json!(5)));
        assert_eq!(types.len(), 5);

        let significance = stats.significance.unwrap();
        assert_eq!(significance.get("LP"), Some(&json!(3)));
        assert_eq!(significance.get("P"), Some(&json!(0)));
        assert_eq!(significance.get("NC"), Some(&json!(1)));

        let consequence = stats.consequence.unwrap();
        assert_eq!(consequence.get("SO_0001583"), Some(&json!(6)));
        assert_eq!(consequence.get("SO_0001587"), Some(&json!(0)));
        // First entry is the bucket, zero-filled keys follow.
        assert_eq!(consequence.keys().next().map(String::as_str), Some("SO_0001583"));
    }

    #[test]
    fn reduced_mode_skips_scroll_and_statistics() {
        let raw = RawSearchResult {
            hits: Some(vec![json!({ "id": 1 })]),
            aggregations: Some(Aggregations::new().with(VARIANT_TYPE, vec![])),
            ..Default::default()
        };
        let request = FormatRequest {
            mode: OutputMode::from_param(Some("jogo")),
            ..Default::default()
        };

        let response = with_formatter(|f| f.format(raw, &request));
        assert!(response.scroll.is_none());
        assert!(response.statistics.is_none());
        assert_eq!(response.data.map(|d| d.len()), Some(1));
    }

    #[test]
    fn non_object_hit_becomes_a_warning() {
        let raw = RawSearchResult {
            hits: Some(vec![json!({ "id": 1 }), json!("tgv2"), json!([3])]),
            ..Default::default()
        };
        let response = with_formatter(|f| f.format(raw, &FormatRequest::default()));
        assert_eq!(response.data.map(|d| d.len()), Some(1));
        assert_eq!(
            response.warning,
            vec![
                "Skipped an unreadable record at position 1",
                "Skipped an unreadable record at position 2"
            ]
        );
    }

    #[test]
    fn ill_typed_fields_keep_the_rest_of_the_record() {
        let raw = RawSearchResult {
            hits: Some(vec![
                json!({
                    "id": 10,
                    "vcf": { "position": 100, "reference": "A", "alternate": "T" },
                    "xref": [
                        { "source": "dbSNP", "id": "rs1" },
                        { "source": "other", "id": 12345 }
                    ]
                }),
                json!({
                    "id": 11,
                    "chromosome": { "index": 2, "label": "2" },
                    "vcf": { "position": "high", "reference": "G", "alternate": "C" },
                    "sift": "0.01"
                }),
            ]),
            ..Default::default()
        };
        let response = with_formatter(|f| f.format(raw, &FormatRequest::default()));
        assert!(response.warning.is_empty());

        let data = response.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].id.as_deref(), Some("tgv10"));
        assert_eq!(data[0].position, Some(100));
        assert_eq!(data[0].existing_variations, vec!["rs1"]);

        assert_eq!(data[1].id.as_deref(), Some("tgv11"));
        assert_eq!(data[1].chromosome.as_deref(), Some("2"));
        assert_eq!(data[1].position, None);
        assert_eq!(data[1].reference.as_deref(), Some("G"));
    }

    #[test]
    fn scroll_echoes_pagination() {
        let request = FormatRequest {
            pagination: PaginationSpec {
                limit: 10,
                offset: Some(togovar_query::Offset::Position(20)),
            },
            ..Default::default()
        };
        let response = with_formatter(|f| f.format(RawSearchResult::default(), &request));
        assert_eq!(
            serde_json::to_value(response.scroll).unwrap(),
            json!({ "offset": 20, "limit": 10, "max_rows": 10000 })
        );
    }
}
