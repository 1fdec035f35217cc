use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(#[from] std::io::Error),
    #[error("request timed out")]
    Timeout,
    #[error("tls setup failed: {0}")]
    Tls(String),
    #[error("response did not contain a JSON array of objects")]
    EmptyOrMalformedResponse,
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("device id not set")]
    DeviceUnset,
    #[error("response body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Invalid {
        path: String,
        source: serde_json::Error,
    },
}
