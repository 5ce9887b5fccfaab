/// Failures on the broker ingestion path. These are logged and never reach an HTTP caller.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("payload is not valid UTF-8")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("payload is not a JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload matches no known sensor shape")]
    Unrecognized,

    #[error("store write failed: {0}")]
    Database(#[from] sqlx::Error),
}
