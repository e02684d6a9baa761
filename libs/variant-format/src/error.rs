//! Error types for formatter configuration

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid link template for '{source_name}': {message}")]
    InvalidTemplate {
        source_name: String,
        message: String,
    },

    #[error(transparent)]
    Query(#[from] togovar_query::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
