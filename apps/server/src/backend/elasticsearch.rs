//! Elasticsearch client

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use togovar_format::RawSearchResult;
use togovar_query::aggregation::{doc_count, CONDITION_ABSENCE};
use togovar_query::{Aggregations, BackendRequest};
use url::Url;

use super::{BackendError, SearchBackend};
use crate::config::BackendConfig;
use crate::{Error, Result};

pub struct ElasticsearchBackend {
    client: reqwest::Client,
    search_url: Url,
    count_url: Url,
    health_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("backend.url is invalid: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| Error::Config(format!("Invalid backend endpoint '{path}': {e}")))
        };

        // The overall deadline is enforced by the caller; this only bounds
        // connection setup.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .gzip(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            search_url: join(&format!("{}/_search", config.index))?,
            count_url: join(&format!("{}/_count", config.index))?,
            health_url: join("_cluster/health")?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    async fn post(&self, url: &Url, body: &JsonValue) -> std::result::Result<JsonValue, BackendError> {
        let response = self
            .authorize(self.client.post(url.clone()).json(body))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> std::result::Result<JsonValue, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: truncate(&body, 512),
        });
    }
    response
        .json()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    #[tracing::instrument(name = "backend.search", skip_all, fields(size = request.size))]
    async fn search(
        &self,
        request: &BackendRequest,
    ) -> std::result::Result<RawSearchResult, BackendError> {
        let search_body = request.search_body();
        let count_body = request.count_body();
        let (search, count) = futures::try_join!(
            self.post(&self.search_url, &search_body),
            self.post(&self.count_url, &count_body),
        )?;

        let mut raw = parse_search(&search, request.aggregations.is_some())?;
        raw.total = count
            .get("count")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| BackendError::Decode("count response lacks 'count'".to_string()))?;

        tracing::debug!(
            total = raw.total,
            filtered = raw.filtered,
            hits = raw.hits.as_ref().map_or(0, Vec::len),
            "Backend search completed"
        );
        Ok(raw)
    }

    async fn ping(&self) -> std::result::Result<(), BackendError> {
        let response = self
            .authorize(self.client.get(self.health_url.clone()))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_json(response).await.map(|_| ())
    }
}

/// Read filtered count, `_source` documents and aggregations of a
/// `_search` response. `total` is left at zero.
pub fn parse_search(
    response: &JsonValue,
    with_aggregations: bool,
) -> std::result::Result<RawSearchResult, BackendError> {
    let hits = response
        .get("hits")
        .ok_or_else(|| BackendError::Decode("search response lacks 'hits'".to_string()))?;

    // `hits.total` is an object since Elasticsearch 7 and a number before.
    let filtered = match hits.get("total") {
        Some(JsonValue::Object(total)) => total.get("value").and_then(JsonValue::as_u64),
        Some(total) => total.as_u64(),
        None => None,
    }
    .ok_or_else(|| BackendError::Decode("search response lacks 'hits.total'".to_string()))?;

    let documents = hits
        .get("hits")
        .and_then(JsonValue::as_array)
        .map(|hits| {
            hits.iter()
                .map(|hit| hit.get("_source").cloned().unwrap_or(JsonValue::Null))
                .collect()
        })
        .unwrap_or_default();

    let (aggregations, condition_absence) = match response.get("aggregations") {
        Some(aggs) if with_aggregations => (
            Some(Aggregations::from_response(aggs)),
            doc_count(aggs, CONDITION_ABSENCE),
        ),
        _ => (None, None),
    };

    Ok(RawSearchResult {
        total: 0,
        filtered,
        hits: Some(documents),
        aggregations,
        condition_absence,
    })
}
