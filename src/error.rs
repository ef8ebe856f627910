//! Errors raised while reading inputs or writing results

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read entry {position} of query {query}: {reason}")]
    MalformedQuery {
        query: usize,
        position: usize,
        reason: String,
    },

    #[error("query word slots exceed the configured maximum ({limit})")]
    QueryCapacity { limit: usize },

    #[error("malformed corpus at line {line}: {reason}")]
    MalformedCorpus { line: usize, reason: String },

    #[error("invalid topic model: {0}")]
    InvalidModel(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
