use thiserror::Error;

use crate::record::RecordError;

#[derive(Debug, Error, Clone)]
pub enum GamalogError {
    #[error("image access error: {0}")]
    Image(String),
    #[error("timeout waiting for image toolset")]
    Timeout,
    #[error("{0} not found (install mtools)")]
    ToolMissing(String),
    #[error("{0} not found in image")]
    MissingFile(String),
    #[error("malformed record: {0}")]
    Record(#[from] RecordError),
    #[error("{0} has no data records")]
    NoRecords(String),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("lock error: {0}")]
    Lock(String),
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
