//! Error types for rerank-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include credentials.
//! The caller's API key is consumed when building the upstream request and
//! no error variant carries it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// A `get_reranking` argument that violates the tool's input schema.
///
/// The display text is what the client sees in the `invalid params` error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Arguments are not an object with the expected fields and types.
    #[error("Invalid arguments: {0}")]
    Malformed(String),

    /// Query is empty.
    #[error("query must not be empty")]
    EmptyQuery,

    /// Query exceeds the maximum length.
    #[error("query must be at most {max} characters, got {len}")]
    QueryTooLong {
        /// Length of the supplied query in characters.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Document list is empty.
    #[error("documents must contain at least one entry")]
    NoDocuments,

    /// Document list exceeds the maximum size.
    #[error("documents must contain at most {max} entries, got {count}")]
    TooManyDocuments {
        /// Number of supplied documents.
        count: usize,
        /// Maximum accepted number of documents.
        max: usize,
    },

    /// A document is empty or whitespace only.
    #[error("Documents cannot be empty strings (document {index})")]
    BlankDocument {
        /// Position of the offending document.
        index: usize,
    },

    /// API key is empty.
    #[error("api_key must not be empty")]
    EmptyApiKey,
}

/// Failures of a single upstream rerank call.
///
/// Every variant is terminal for the request that triggered it; nothing is
/// retried.
#[derive(Error, Debug)]
pub enum RerankError {
    /// Upstream rejected the API key (HTTP 401).
    #[error("Invalid API key")]
    Auth,

    /// Upstream throttled the caller (HTTP 429).
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Upstream answered with any other non-success status.
    #[error("API error: {status}")]
    Upstream {
        /// HTTP status code returned by the upstream API.
        status: u16,
    },

    /// The HTTP transport gave up waiting for the upstream API.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be sent (DNS, connect, TLS, ...).
    #[error("Request error: {0}")]
    Transport(String),

    /// The response body could not be decoded as JSON.
    #[error("Reranking failed: {0}")]
    Decode(String),

    /// The response decoded but does not have the expected shape or bounds.
    #[error("Invalid API response format: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for RerankError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            // reqwest includes the URL but never headers, so no credential leaks.
            Self::Transport(err.to_string())
        }
    }
}
