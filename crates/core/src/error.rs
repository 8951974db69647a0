use thiserror::Error;

#[derive(Debug, Error)]
pub enum RumshopError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Store(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("span already ended: {0}")]
    SpanEnded(String),
}

pub type Result<T> = std::result::Result<T, RumshopError>;
