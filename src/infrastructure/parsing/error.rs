//! Parsing error types.
//!
//! An [`ExtractionGap`] is the normal "this strategy found nothing"
//! outcome consumed by the cascading-selector chain; it is never fatal.

use thiserror::Error;

/// A single extraction strategy found no usable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionGap {
    #[error("no match for selector `{0}`")]
    NoMatch(String),

    #[error("selector `{0}` did not compile")]
    BadSelector(String),

    #[error("pattern `{0}` not found in page text")]
    PatternMiss(&'static str),

    #[error("attribute `{0}` absent")]
    MissingAttr(&'static str),
}

/// Errors that abort parsing of a whole document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("listing page yielded no items (parser `{parser}`)")]
    EmptyListing { parser: String },

    #[error("product feed is not valid JSON: {0}")]
    InvalidFeed(#[from] serde_json::Error),
}

pub type FieldResult = Result<String, ExtractionGap>;
