//! Validation of a complete search request body.

use crate::error::{ValidationErrors, BASE_FIELD};
use crate::expression::{Expression, ExpressionCompiler, QUERY_FIELD};
use crate::pagination::PaginationSpec;
use serde_json::Value as JsonValue;

/// A validated `{query, limit, offset}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// `None` when the query is absent or empty.
    pub expression: Option<Expression>,
    pub pagination: PaginationSpec,
}

impl SearchRequest {
    /// Validate every part of the body, reporting all errors at once.
    pub fn from_json(
        body: &JsonValue,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let Some(fields) = body.as_object() else {
            errors.add(BASE_FIELD, "Request body must be a JSON object");
            return Err(errors);
        };

        let pagination =
            PaginationSpec::validate_into(fields.get("limit"), fields.get("offset"), &mut errors);
        let expression = match fields.get(QUERY_FIELD) {
            None | Some(JsonValue::Null) => None,
            Some(raw) => compiler.parse_into(raw, &mut errors),
        };

        match pagination {
            Some(pagination) if errors.is_empty() => Ok(Self {
                expression,
                pagination,
            }),
            _ => Err(errors),
        }
    }
}
