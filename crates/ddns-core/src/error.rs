//! Error types for the DDNS synchronizer
//!
//! This module defines the error taxonomy used throughout the crate:
//!
//! - [`Error::Config`]: desired configuration is unusable. Fatal, raised
//!   before any network call.
//! - [`Error::Discovery`]: no public address could be obtained. Aborts the
//!   run before any write.
//! - [`Error::Provider`]: a record store call failed. Fatal while listing,
//!   recorded per operation while executing a plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS synchronizer
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Address discovery errors
    #[error("Address discovery error: {0}")]
    Discovery(String),

    /// Record store errors
    #[error("DNS provider error: {0}")]
    Provider(#[from] ProviderError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an address discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Returns `true` for errors that must stop a run before any network call
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Json(_) | Self::Io(_))
    }
}

/// One `{code, message}` entry from a provider response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Provider error code, absent for locally generated messages
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message
    pub message: String,
}

impl ApiMessage {
    /// Create a message carrying a provider error code
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Create a message without a provider code
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} - {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// How a record store call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// The provider answered with a non-2xx status or `success: false`
    Http(u16),
    /// The call did not finish within its timeout
    Timeout,
    /// The request never produced a response (connect, TLS, reset)
    Transport,
    /// A 2xx response whose body could not be understood
    InvalidResponse,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Http(code) => write!(f, "HTTP {}", code),
            ProviderStatus::Timeout => f.write_str("timeout"),
            ProviderStatus::Transport => f.write_str("transport failure"),
            ProviderStatus::InvalidResponse => f.write_str("invalid response"),
        }
    }
}

/// Failure of a single record store call
///
/// Carries every provider-reported message so the run summary can show
/// the provider's own codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub status: ProviderStatus,
    pub messages: Vec<ApiMessage>,
}

impl ProviderError {
    pub fn new(status: ProviderStatus, messages: Vec<ApiMessage>) -> Self {
        Self { status, messages }
    }

    pub fn http(status: u16, messages: Vec<ApiMessage>) -> Self {
        Self::new(ProviderStatus::Http(status), messages)
    }

    pub fn timeout() -> Self {
        Self::new(ProviderStatus::Timeout, Vec::new())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ProviderStatus::Transport, vec![ApiMessage::local(msg)])
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ProviderStatus::InvalidResponse, vec![ApiMessage::local(msg)])
    }

    pub fn is_timeout(&self) -> bool {
        self.status == ProviderStatus::Timeout
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        for (i, message) in self.messages.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}
