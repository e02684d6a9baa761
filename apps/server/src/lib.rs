//! TogoVar variant search server
//!
//! HTTP front of the variant search core:
//! - Expression compilation and pagination via `togovar-query`
//! - Elasticsearch execution under a request deadline
//! - Response formatting via `togovar-format`
//! - Reference data snapshots reloaded in the background

pub mod api;
pub mod backend;
pub mod background;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
