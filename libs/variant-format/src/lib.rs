//! Variant search result formatter.
//!
//! [`ResultFormatter::format`] turns a [`RawSearchResult`] into the public
//! [`FormattedResponse`]: a `scroll` echo, per-enumeration `statistics`
//! and one [`Record`] per hit. Reference data and collaborators are passed
//! in at construction; the formatter itself holds no state between calls.

pub mod access;
pub mod comparators;
pub mod config;
pub mod document;
pub mod error;
pub mod formatter;
pub mod raw;
pub mod record;
pub mod response;

pub use access::{
    ConditionEnricher, ConditionInterpretation, ConditionLookup, ConditionNames, DatasetAccess,
    GeneSynonyms, Identity, NoConditionEnricher, NoLookup,
};
pub use config::{FormatterConfig, XrefTemplates};
pub use error::{Error, Result};
pub use formatter::{FormatRequest, OutputMode, ResultFormatter};
pub use raw::RawSearchResult;
pub use response::{FormattedResponse, Record};
