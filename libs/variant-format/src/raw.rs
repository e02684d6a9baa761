//! Backend search result as handed to the formatter.

use serde_json::Value as JsonValue;
use togovar_query::Aggregations;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResult {
    /// Variants visible to the caller, before the expression is applied.
    pub total: u64,
    /// Variants matching the expression.
    pub filtered: u64,
    /// `_source` documents of the returned page; `None` when hits were not
    /// requested.
    pub hits: Option<Vec<JsonValue>>,
    /// `None` when statistics were not requested.
    pub aggregations: Option<Aggregations>,
    /// Matching variants without any clinical annotation.
    pub condition_absence: Option<u64>,
}
