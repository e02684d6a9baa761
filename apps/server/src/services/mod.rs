//! Business logic services

pub mod search;

pub use search::{SearchOptions, SearchService};
