//! Search backend seam
//!
//! The service hands a [`BackendRequest`] to a [`SearchBackend`] and gets a
//! [`RawSearchResult`] back. The Elasticsearch client is the production
//! implementation; tests substitute their own.

pub mod elasticsearch;

use async_trait::async_trait;
use togovar_format::RawSearchResult;
use togovar_query::BackendRequest;

pub use elasticsearch::ElasticsearchBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err.to_string())
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run the paged search and the unfiltered count of `request`.
    async fn search(&self, request: &BackendRequest) -> Result<RawSearchResult, BackendError>;

    /// Cheap reachability probe for the health endpoint.
    async fn ping(&self) -> Result<(), BackendError>;
}
