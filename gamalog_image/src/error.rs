use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{tool} failed (exit {status:?}): {stderr}")]
    Tool {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("{0} not found on PATH (install mtools)")]
    ToolMissing(String),
    #[error("{tool} timeout after {after_ms} ms")]
    Timeout { tool: String, after_ms: u64 },
    #[error("simulated {op} failure on {name}")]
    Simulated { op: &'static str, name: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImageError>;
