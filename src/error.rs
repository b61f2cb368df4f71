use std::io;

use thiserror::Error;

use crate::decode::DecodeError;

/// Errors raised while reading, converting or decoding CSV records.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot infer structure from an empty batch of records")]
    EmptyBatch,
    #[error("record {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status code {0}")]
    UnexpectedStatus(u16),
}

pub type Result<T> = std::result::Result<T, Error>;
