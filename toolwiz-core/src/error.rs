//! Error types for generation operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure category reported to callers in a
/// [`GenerationResult::Failure`](crate::types::GenerationResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The prompt was empty after trimming
    EmptyPrompt,
    /// No credential or model is configured for the provider
    NotConfigured,
    /// The local model runtime has not finished bootstrapping
    NotInitialized,
    /// The provider rejected the credential
    InvalidCredential,
    /// The backend returned a domain error (quota, policy, bad input)
    ProviderRejected,
    /// Network failure or timeout
    Transport,
    /// The pending call was aborted by the host
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmptyPrompt => "empty_prompt",
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::NotInitialized => "not_initialized",
            ErrorKind::InvalidCredential => "invalid_credential",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::Transport => "transport",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for generation operations.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// Prompt missing or whitespace-only
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// Credential or model missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Model bootstrap incomplete
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Credential rejected locally or by the provider
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Backend-originated domain error
    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    /// Transport failure reported by the adapter
    #[error("Transport error: {0}")]
    Transport(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pending call aborted
    #[error("Request cancelled")]
    Cancelled,

    /// A configure or bootstrap call is already in flight
    #[error("Session busy: {0}")]
    Busy(String),

    /// Durable credential storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GenError {
    /// Create a not-configured error
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    /// Create a not-initialized error
    pub fn not_initialized(msg: impl Into<String>) -> Self {
        Self::NotInitialized(msg.into())
    }

    /// Create an invalid credential error
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    /// Create a provider-rejected error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::ProviderRejected(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a busy error
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Project this error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenError::EmptyPrompt => ErrorKind::EmptyPrompt,
            GenError::NotConfigured(_)
            | GenError::Busy(_)
            | GenError::Storage(_)
            | GenError::Configuration(_) => ErrorKind::NotConfigured,
            GenError::NotInitialized(_) => ErrorKind::NotInitialized,
            GenError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            GenError::ProviderRejected(_) | GenError::Serialization(_) => {
                ErrorKind::ProviderRejected
            }
            GenError::Transport(_) => ErrorKind::Transport,
            GenError::Network(e) => match e.status().map(|s| s.as_u16()) {
                Some(401) | Some(403) => ErrorKind::InvalidCredential,
                Some(_) => ErrorKind::ProviderRejected,
                None => ErrorKind::Transport,
            },
            GenError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_projection() {
        assert_eq!(GenError::EmptyPrompt.kind(), ErrorKind::EmptyPrompt);
        assert_eq!(GenError::busy("configure").kind(), ErrorKind::NotConfigured);
        assert_eq!(GenError::transport("timed out").kind(), ErrorKind::Transport);
        assert_eq!(GenError::Cancelled.kind(), ErrorKind::Cancelled);

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            GenError::from(bad_json).kind(),
            ErrorKind::ProviderRejected
        );
    }

    fn http_error(status: u16) -> GenError {
        let response = http::Response::builder().status(status).body("").unwrap();
        reqwest::Response::from(response)
            .error_for_status()
            .unwrap_err()
            .into()
    }

    #[test]
    fn test_network_error_follows_http_status() {
        assert_eq!(http_error(401).kind(), ErrorKind::InvalidCredential);
        assert_eq!(http_error(403).kind(), ErrorKind::InvalidCredential);
        assert_eq!(http_error(429).kind(), ErrorKind::ProviderRejected);
        assert_eq!(http_error(500).kind(), ErrorKind::ProviderRejected);

        // No response at all
        let unsent = reqwest::Client::new().get("http://[::1").build().unwrap_err();
        assert_eq!(GenError::from(unsent).kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidCredential).unwrap();
        assert_eq!(json, "\"invalid_credential\"");
        assert_eq!(ErrorKind::NotInitialized.to_string(), "not_initialized");
    }
}
