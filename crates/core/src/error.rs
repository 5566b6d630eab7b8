//! Error types for objref-core
//!
//! Address errors come from the resolvers and are never retried. The
//! remaining variants describe upstream store failures and are passed
//! through the caching layers unchanged.

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving or fetching objects
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed URI or ARN
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Bare key given without a configured default bucket
    #[error("No default bucket configured for key: {0}")]
    NoDefaultBucket(String),

    /// Composite provider invoked without the backing capability
    #[error("Capability not configured: {0}")]
    CapabilityMissing(&'static str),

    /// Object or bucket does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport or service failure
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

impl Error {
    /// True for errors caused by the caller's address string
    pub fn is_address_error(&self) -> bool {
        matches!(self, Error::InvalidAddress(_) | Error::NoDefaultBucket(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidAddress("http://b/k".to_string());
        assert_eq!(err.to_string(), "Invalid address: http://b/k");

        let err = Error::CapabilityMissing("content");
        assert_eq!(err.to_string(), "Capability not configured: content");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidAddress(String::new()).is_address_error());
        assert!(Error::NoDefaultBucket("k".into()).is_address_error());
        assert!(!Error::Network("timeout".into()).is_address_error());
        assert!(Error::NotFound("s3://b/k".into()).is_not_found());
    }
}
