use thiserror::Error;

#[derive(Error, Debug)]
pub enum QpxError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid qpm.json: {message}")]
    InvalidManifest { message: String },

    // JSON/parsing errors
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Network errors
    #[error("Error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    // VCS tool errors
    #[error("{tool} is not available: {reason}")]
    VcsToolMissing { tool: String, reason: String },

    #[error("`{command}` failed: {stderr}")]
    VcsCommand { command: String, stderr: String },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Commit {revision} has not been pushed yet")]
    NotPublished { revision: String },

    #[error("Repository type {0} is not supported")]
    UnsupportedRepository(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    // Archive errors
    #[error("Extraction failed: {0}")]
    Extract(String),

    // Key and signature errors
    #[error("No key with fingerprint {fingerprint} in {keyring}")]
    KeyNotFound { fingerprint: String, keyring: String },

    #[error("Key error: {0}")]
    Key(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Unsupported signature hash algorithm {0}, expected SHA-256 or SHA-512")]
    UnsupportedHashAlgorithm(String),

    #[error("Unsupported signature type {0}, expected a binary document signature")]
    UnsupportedSignatureType(String),

    #[error("Signature does not match the package content")]
    SignatureMismatch,
}

impl QpxError {
    /// Shorthand for a network failure against `url`.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        QpxError::Network {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<crate::http::HttpError> for QpxError {
    fn from(err: crate::http::HttpError) -> Self {
        use crate::http::HttpError;

        match err {
            HttpError::Io(e) => QpxError::Io(e),
            HttpError::HttpStatus { url, message, .. } => QpxError::Network { url, message },
            HttpError::MaxRetries { url } => QpxError::network(url, "max retries exceeded"),
            HttpError::Request(e) => {
                let url = e.url().map(|u| u.to_string()).unwrap_or_default();
                QpxError::network(url, e.to_string())
            }
            HttpError::JsonParse { url, message } => QpxError::network(url, message),
        }
    }
}

pub type Result<T> = std::result::Result<T, QpxError>;
