//! Variant search query compiler.
//!
//! Turns a JSON search request into a backend request:
//!
//! ```text
//! {query, limit, offset}
//!      |
//!   SearchRequest::from_json  (validation, all errors collected)
//!      |
//!   Expression::compile       -> Clause tree
//!      |
//!   QueryAssembler::assemble  -> BackendRequest (visibility, sort, paging, aggs)
//! ```

pub mod aggregation;
pub mod assembler;
pub mod clause;
pub mod components;
pub mod dataset;
pub mod error;
pub mod expression;
pub mod pagination;
pub mod request;
pub mod vocabulary;

pub use aggregation::{Aggregations, Bucket};
pub use assembler::{AssembleOptions, BackendRequest, PageDirective, QueryAssembler, VisibilityFilters};
pub use clause::{BoolClause, Clause, RangeBounds};
pub use components::{Component, ComponentTag, Relation};
pub use dataset::{DatasetAliasConfig, DatasetAliases};
pub use error::{Error, FieldError, Result, ValidationErrors};
pub use expression::{Expression, ExpressionCompiler};
pub use pagination::{CursorKey, Offset, PaginationSpec, DEFAULT_LIMIT, MAX_LIMIT, MAX_ROWS};
pub use request::SearchRequest;
pub use vocabulary::{Term, Vocabularies, Vocabulary};
