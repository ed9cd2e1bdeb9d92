use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid envelope encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid envelope schema: {0}")]
    InvalidSchema(String),

    #[error("dedup store error: {0}")]
    DedupStore(#[source] anyhow::Error),

    #[error("metric sink error: {0}")]
    MetricSink(#[source] anyhow::Error),

    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
