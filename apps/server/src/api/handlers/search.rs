//! Variant search handler
//!
//! `POST /api/search/variant` with a `{query, limit, offset}` JSON body.
//! Query-string switches:
//! - `stat=false` skips aggregations and the `statistics` section
//! - `data=false` skips hits and the `data` section
//! - `formatter=jogo` selects the reduced record-only layout
//! - `expand_dataset=a,b` (or repeated) shows the datasets of those groups

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    Extension, Json,
};
use serde_json::Value as JsonValue;
use togovar_format::{FormattedResponse, Identity, OutputMode};
use url::form_urlencoded;

use crate::services::SearchOptions;
use crate::state::AppState;
use crate::{Error, Result};

pub async fn search_variant(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<FormattedResponse>> {
    let options = search_options(query.as_deref().unwrap_or(""))?;
    let body = parse_body(&body)?;
    let identity = identity.map(|Extension(id)| id).unwrap_or_default();

    let response = state
        .search_service
        .search(&body, &identity, &options)
        .await?;
    Ok(Json(response))
}

fn search_options(query: &str) -> Result<SearchOptions> {
    let mut options = SearchOptions::default();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "stat" => options.statistics = flag(&key, &value)?,
            "data" => options.data = flag(&key, &value)?,
            "formatter" => options.mode = OutputMode::from_param(Some(value.as_ref())),
            "expand_dataset" => options.expand_dataset.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|group| !group.is_empty())
                    .map(String::from),
            ),
            _ => {}
        }
    }
    Ok(options)
}

fn flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "" | "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::BadRequest(format!("{key} must be true or false"))),
    }
}

/// An empty body searches everything with default paging.
fn parse_body(body: &[u8]) -> Result<JsonValue> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(Default::default()));
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::BadRequest(format!("Request body is not valid JSON: {e}")))
}
