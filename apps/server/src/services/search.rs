//! Variant search service
//!
//! Request body to formatted response:
//! validate and compile the expression, scope it to the caller's datasets,
//! run it against the backend under a deadline, then format the result.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use togovar_format::{FormatRequest, FormattedResponse, FormatterConfig, Identity, OutputMode};
use togovar_query::{AssembleOptions, BackendRequest, Expression, QueryAssembler, SearchRequest};

use crate::backend::SearchBackend;
use crate::metrics::{self, SearchOutcome};
use crate::registry::{RegistryStore, Snapshot};
use crate::{Error, Result};

/// Query-string switches of the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Request aggregations and emit `statistics`.
    pub statistics: bool,
    /// Request hits and emit `data`.
    pub data: bool,
    pub mode: OutputMode,
    /// Dataset expansion groups shown in statistics and frequencies.
    pub expand_dataset: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            statistics: true,
            data: true,
            mode: OutputMode::Full,
            expand_dataset: Vec::new(),
        }
    }
}

pub struct SearchService {
    registry: Arc<RegistryStore>,
    backend: Arc<dyn SearchBackend>,
    formatter: FormatterConfig,
    timeout: Duration,
}

impl SearchService {
    pub fn new(
        registry: Arc<RegistryStore>,
        backend: Arc<dyn SearchBackend>,
        formatter: FormatterConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            formatter,
            timeout,
        }
    }

    #[tracing::instrument(
        name = "search.variant",
        skip_all,
        fields(user = identity.user.as_deref().unwrap_or("anonymous"), filtered = tracing::field::Empty)
    )]
    pub async fn search(
        &self,
        body: &JsonValue,
        identity: &Identity,
        options: &SearchOptions,
    ) -> Result<FormattedResponse> {
        let result = self.run(body, identity, options).await;
        metrics::record_search(outcome(&result));
        result
    }

    async fn run(
        &self,
        body: &JsonValue,
        identity: &Identity,
        options: &SearchOptions,
    ) -> Result<FormattedResponse> {
        let snapshot = self.registry.snapshot();

        let request = SearchRequest::from_json(body, &snapshot.compiler())?;
        let gene_order = request
            .expression
            .as_ref()
            .map(Expression::gene_ids)
            .unwrap_or_default();
        let backend_request = assemble(&snapshot, &request, identity, options);

        let mut raw = self.execute(&backend_request).await?;
        tracing::Span::current().record("filtered", raw.filtered);
        if !options.data {
            raw.hits = None;
        }

        let format_request = FormatRequest {
            pagination: request.pagination,
            mode: options.mode,
            identity: identity.clone(),
            expand_dataset: options.expand_dataset.clone(),
            gene_order,
        };
        let response = snapshot
            .formatter(&self.formatter)
            .format(raw, &format_request);

        if let Some(data) = &response.data {
            metrics::SEARCH_RECORDS_RETURNED.observe(data.len() as f64);
        }
        Ok(response)
    }

    /// Run the backend call, dropping it when the deadline passes.
    async fn execute(&self, request: &BackendRequest) -> Result<togovar_format::RawSearchResult> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.backend.search(request)).await;
        metrics::BACKEND_REQUEST_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        match outcome {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }
}

#[tracing::instrument(name = "search.assemble", skip_all)]
fn assemble(
    snapshot: &Snapshot,
    request: &SearchRequest,
    identity: &Identity,
    options: &SearchOptions,
) -> BackendRequest {
    let clause = request.expression.as_ref().map(Expression::compile);
    QueryAssembler::new(&snapshot.aliases).assemble(
        clause,
        &snapshot.visibility(identity),
        &request.pagination,
        AssembleOptions {
            statistics: options.statistics && options.mode == OutputMode::Full,
            data: options.data,
        },
    )
}

fn outcome(result: &Result<FormattedResponse>) -> SearchOutcome {
    match result {
        Ok(_) => SearchOutcome::Ok,
        Err(Error::Validation(_) | Error::BadRequest(_)) => SearchOutcome::Invalid,
        Err(Error::Timeout(_)) => SearchOutcome::Timeout,
        Err(Error::Backend(_)) => SearchOutcome::BackendError,
        Err(_) => SearchOutcome::InternalError,
    }
}
