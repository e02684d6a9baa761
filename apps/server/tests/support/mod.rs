use anyhow::Context as _;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Extension, Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use togovar_api::{
    api::create_router,
    backend::{BackendError, SearchBackend},
    registry::RegistryStore,
    AppState, Config,
};
use togovar_format::{Identity, RawSearchResult};
use togovar_query::BackendRequest;
use tower::ServiceExt as _;

/// Backend returning a canned result and recording every request body.
pub struct StubBackend {
    result: RawSearchResult,
    delay: Option<Duration>,
    failure: Option<String>,
    pub requests: Mutex<Vec<Value>>,
}

impl StubBackend {
    pub fn returning(result: RawSearchResult) -> Self {
        Self {
            result,
            delay: None,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn last_request(&self) -> Option<Value> {
        self.requests.lock().ok()?.last().cloned()
    }
}

#[async_trait]
impl SearchBackend for StubBackend {
    async fn search(&self, request: &BackendRequest) -> Result<RawSearchResult, BackendError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.search_body());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(BackendError::Transport(message.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn ping(&self) -> Result<(), BackendError> {
        match &self.failure {
            Some(message) => Err(BackendError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<StubBackend>,
}

impl TestApp {
    pub fn new(backend: StubBackend) -> anyhow::Result<Self> {
        Self::new_with_config(backend, |_| {})
    }

    pub fn new_with_config(
        backend: StubBackend,
        configure: impl FnOnce(&mut Config),
    ) -> anyhow::Result<Self> {
        let mut config = Config::default();
        configure(&mut config);

        let registry =
            RegistryStore::load(config.registry.clone()).context("load bundled registry")?;
        let backend = Arc::new(backend);
        let state = AppState::with_parts(config, registry, backend.clone());

        Ok(Self {
            router: create_router(state),
            backend,
        })
    }

    /// Requests carry `identity` as the upstream authentication layer would.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.router = self.router.layer(Extension(identity));
        self
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let (status, headers, bytes) = self.request_raw(method, path_and_query, body).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("parse response body")?
        };
        Ok((status, headers, json))
    }

    pub async fn request_raw(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Vec<u8>)> {
        let request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(serde_json::to_vec(&json)?),
                None => Body::empty(),
            })
            .context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;
        Ok((status, headers, bytes.to_vec()))
    }
}
