//! Boolean clause tree produced by the expression compiler.
//!
//! The tree is backend-agnostic: leaves are term/terms/range/exists
//! predicates over dotted document fields, inner nodes are boolean nodes or
//! nested-path scopes. [`Clause::to_dsl`] renders the tree as an
//! Elasticsearch query DSL object.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Term {
        field: String,
        value: JsonValue,
    },
    Terms {
        field: String,
        values: Vec<JsonValue>,
    },
    Range {
        field: String,
        bounds: RangeBounds,
    },
    Exists {
        field: String,
    },
    /// Scope a query to the documents of a nested list field.
    Nested {
        path: String,
        query: Box<Clause>,
    },
    Bool(BoolClause),
    /// Pre-rendered DSL supplied by an external collaborator (e.g. a baseline filter).
    Raw(JsonValue),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolClause {
    pub must: Vec<Clause>,
    pub should: Vec<Clause>,
    pub must_not: Vec<Clause>,
}

/// Numeric bounds of a range predicate. At least one bound is set for
/// ranges built by the compiler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<JsonValue>,
    pub gte: Option<JsonValue>,
    pub lt: Option<JsonValue>,
    pub lte: Option<JsonValue>,
}

impl RangeBounds {
    pub fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    fn to_dsl(&self) -> JsonValue {
        let mut out = Map::new();
        for (op, bound) in [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ] {
            if let Some(v) = bound {
                out.insert(op.to_string(), v.clone());
            }
        }
        JsonValue::Object(out)
    }
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<V: Into<JsonValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Self::Range {
            field: field.into(),
            bounds,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    pub fn nested(path: impl Into<String>, query: Clause) -> Self {
        Self::Nested {
            path: path.into(),
            query: Box::new(query),
        }
    }

    /// Boolean node requiring every child.
    pub fn and(children: Vec<Clause>) -> Self {
        Self::Bool(BoolClause {
            must: children,
            ..Default::default()
        })
    }

    /// Boolean node requiring at least one child.
    pub fn or(children: Vec<Clause>) -> Self {
        Self::Bool(BoolClause {
            should: children,
            ..Default::default()
        })
    }

    pub fn not(child: Clause) -> Self {
        Self::Bool(BoolClause {
            must_not: vec![child],
            ..Default::default()
        })
    }

    /// Like [`Clause::and`] but a single child is returned as is.
    pub fn all_of(mut children: Vec<Clause>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::and(children)
        }
    }

    /// Like [`Clause::or`] but a single child is returned as is.
    pub fn any_of(mut children: Vec<Clause>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::or(children)
        }
    }

    /// Render as Elasticsearch query DSL.
    pub fn to_dsl(&self) -> JsonValue {
        match self {
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Self::Range { field, bounds } => {
                json!({ "range": { field.as_str(): bounds.to_dsl() } })
            }
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::Nested { path, query } => json!({
                "nested": {
                    "path": path,
                    "query": query.to_dsl()
                }
            }),
            Self::Bool(b) => b.to_dsl(),
            Self::Raw(v) => v.clone(),
        }
    }
}

impl BoolClause {
    fn to_dsl(&self) -> JsonValue {
        let mut body = Map::new();
        for (occur, clauses) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    occur.to_string(),
                    JsonValue::Array(clauses.iter().map(Clause::to_dsl).collect()),
                );
            }
        }
        // A should list next to must clauses is optional in query context
        // unless a minimum is given.
        if !self.should.is_empty() {
            body.insert("minimum_should_match".to_string(), json!(1));
        }
        json!({ "bool": body })
    }
}

impl From<BoolClause> for Clause {
    fn from(value: BoolClause) -> Self {
        Self::Bool(value)
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dsl().serialize(serializer)
    }
}
