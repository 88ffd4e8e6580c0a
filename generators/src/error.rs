use thiserror::Error;

/// Errors returned by the generation clients.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured: set {0}")]
    NoApiKey(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Service returned no usable content: {0}")]
    Empty(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
