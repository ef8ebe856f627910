//! Top-K documents for word queries under a trained topic model
//!
//! Every document of a corpus is scored against a batch of queries by a
//! short Gibbs pass restricted to the document; for each query, the
//! documents with the lowest negative log-probability are kept. BM25 is
//! computed for the retained documents only.

pub mod base;
pub mod corpus;
pub mod error;
pub mod model;
pub mod output;
pub mod query;
pub mod rerank;
pub mod scoring;
pub mod search;
pub mod utils;

pub use error::{Error, Result};
pub use search::{QueryEngine, QueryOptions, RetainedDocument, TopKStore};
