//! Assembly of the complete backend request: visibility scoping, sort
//! order, page size and exactly one pagination mechanism.

use crate::aggregation;
use crate::clause::Clause;
use crate::dataset::DatasetAliases;
use crate::pagination::{CursorKey, Offset, PaginationSpec};
use serde_json::{json, Map, Value as JsonValue};

/// Total order over variants, ascending.
pub const SORT_FIELDS: [&str; 4] = [
    "chromosome.index",
    "vcf.position",
    "vcf.reference",
    "vcf.alternate",
];

/// Which records the caller is allowed to see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityFilters {
    /// Public names of the frequency datasets the caller may read.
    pub frequency_datasets: Vec<String>,
    /// Names of the clinical annotation sources the caller may read.
    pub condition_datasets: Vec<String>,
    /// Applied to every query regardless of caller (e.g. withdrawn records).
    pub baseline: Option<Clause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Request aggregations for the statistics section.
    pub statistics: bool,
    /// Request hits; when off only counts and aggregations are fetched.
    pub data: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            statistics: true,
            data: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDirective {
    From(u64),
    SearchAfter(CursorKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Visibility plus the caller's expression.
    pub query: Clause,
    /// Visibility only; its hit count is the unfiltered total.
    pub total_query: Clause,
    pub sort: [&'static str; 4],
    pub size: u64,
    pub page: Option<PageDirective>,
    pub aggregations: Option<JsonValue>,
}

impl BackendRequest {
    /// Body of the paged search call.
    pub fn search_body(&self) -> JsonValue {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_dsl());
        body.insert(
            "sort".to_string(),
            JsonValue::Array(self.sort.iter().map(|f| json!({ *f: "asc" })).collect()),
        );
        body.insert("size".to_string(), json!(self.size));
        body.insert("track_total_hits".to_string(), json!(true));
        match &self.page {
            Some(PageDirective::From(n)) => {
                body.insert("from".to_string(), json!(n));
            }
            Some(PageDirective::SearchAfter(key)) => {
                body.insert("search_after".to_string(), key.to_json());
            }
            None => {}
        }
        if let Some(aggs) = &self.aggregations {
            body.insert("aggs".to_string(), aggs.clone());
        }
        JsonValue::Object(body)
    }

    /// Body of the unfiltered count call.
    pub fn count_body(&self) -> JsonValue {
        json!({ "query": self.total_query.to_dsl() })
    }
}

pub struct QueryAssembler<'a> {
    aliases: &'a DatasetAliases,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(aliases: &'a DatasetAliases) -> Self {
        Self { aliases }
    }

    pub fn assemble(
        &self,
        expression: Option<Clause>,
        visibility: &VisibilityFilters,
        pagination: &PaginationSpec,
        options: AssembleOptions,
    ) -> BackendRequest {
        let mut scope = Vec::with_capacity(3);
        if let Some(baseline) = &visibility.baseline {
            scope.push(baseline.clone());
        }
        scope.push(self.visibility_clause(visibility));

        let total_query = Clause::and(scope.clone());
        let mut must = scope;
        if let Some(expression) = expression {
            must.push(expression);
        }

        let page = match &pagination.offset {
            Some(Offset::Position(n)) => Some(PageDirective::From(*n)),
            Some(Offset::Cursor(key)) => Some(PageDirective::SearchAfter(key.clone())),
            None => None,
        };

        BackendRequest {
            query: Clause::and(must),
            total_query,
            sort: SORT_FIELDS,
            size: if options.data { pagination.limit } else { 0 },
            page: page.filter(|_| options.data),
            aggregations: options.statistics.then(aggregation::request_body),
        }
    }

    /// A variant is visible when it carries a frequency from a readable
    /// dataset or an annotation from a readable source.
    fn visibility_clause(&self, visibility: &VisibilityFilters) -> Clause {
        let sources: Vec<String> = visibility
            .frequency_datasets
            .iter()
            .map(|name| self.aliases.to_index(name))
            .collect();

        Clause::or(vec![
            Clause::nested("frequency", Clause::terms("frequency.source", sources)),
            Clause::nested(
                "conditions",
                Clause::terms(
                    "conditions.source",
                    visibility.condition_datasets.iter().cloned(),
                ),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visibility() -> VisibilityFilters {
        VisibilityFilters {
            frequency_datasets: vec!["jga_wes".into(), "gem_j_wga".into()],
            condition_datasets: vec!["clinvar".into()],
            baseline: Some(Clause::Raw(json!({ "term": { "withdrawn": false } }))),
        }
    }

    #[test]
    fn numeric_offset_uses_from() {
        let aliases = DatasetAliases::default();
        let assembler = QueryAssembler::new(&aliases);
        let pagination = PaginationSpec {
            limit: 10,
            offset: Some(Offset::Position(20)),
        };

        let request = assembler.assemble(None, &visibility(), &pagination, AssembleOptions::default());
        let body = request.search_body();
        assert_eq!(body["from"], json!(20));
        assert!(body.get("search_after").is_none());
        assert_eq!(body["size"], json!(10));
        assert_eq!(
            body["sort"],
            json!([
                { "chromosome.index": "asc" },
                { "vcf.position": "asc" },
                { "vcf.reference": "asc" },
                { "vcf.alternate": "asc" }
            ])
        );
    }

    #[test]
    fn cursor_uses_search_after() {
        let aliases = DatasetAliases::default();
        let assembler = QueryAssembler::new(&aliases);
        let pagination = PaginationSpec {
            limit: 10,
            offset: Some(Offset::Cursor(CursorKey {
                chromosome_index: 23,
                position: 1000,
                reference: String::new(),
                alternate: String::new(),
            })),
        };

        let body = assembler
            .assemble(None, &visibility(), &pagination, AssembleOptions::default())
            .search_body();
        assert_eq!(body["search_after"], json!([23, 1000, "", ""]));
        assert!(body.get("from").is_none());
    }

    #[test]
    fn visibility_wraps_expression_and_aliases_sources() {
        let aliases = DatasetAliases::default();
        let assembler = QueryAssembler::new(&aliases);
        let expression = Clause::term("chromosome.label", "1");

        let request = assembler.assemble(
            Some(expression.clone()),
            &visibility(),
            &PaginationSpec::default(),
            AssembleOptions::default(),
        );

        let Clause::Bool(root) = &request.query else {
            panic!("expected bool root");
        };
        assert_eq!(root.must.len(), 3);
        assert_eq!(root.must[2], expression);

        let dsl = request.query.to_dsl();
        assert_eq!(
            dsl["bool"]["must"][1]["bool"]["should"][0]["nested"]["query"],
            json!({ "terms": { "frequency.source": ["jga_ngs", "gem_j_wga"] } })
        );

        // The total query is the same scope without the expression.
        let Clause::Bool(total) = &request.total_query else {
            panic!("expected bool root");
        };
        assert_eq!(total.must, root.must[..2].to_vec());
    }

    #[test]
    fn data_off_requests_no_rows() {
        let aliases = DatasetAliases::default();
        let assembler = QueryAssembler::new(&aliases);
        let pagination = PaginationSpec {
            limit: 50,
            offset: Some(Offset::Position(100)),
        };
        let options = AssembleOptions {
            statistics: false,
            data: false,
        };

        let request = assembler.assemble(None, &visibility(), &pagination, options);
        assert_eq!(request.size, 0);
        assert_eq!(request.page, None);
        assert!(request.search_body().get("aggs").is_none());
    }
}
