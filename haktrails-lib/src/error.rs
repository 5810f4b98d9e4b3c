//! Error handling for SecurityTrails lookups.
//!
//! One error type covers the whole engine. Only configuration errors are
//! fatal; every remote failure is attached to the item(s) it was issued for
//! so the worker can report it and move on.

use std::time::Duration;
use thiserror::Error;

/// Main error type for haktrails operations.
#[derive(Debug, Clone, Error)]
pub enum TrailsError {
    /// Missing, unreadable or malformed configuration. Fatal.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An input line that cannot be used in a request path.
    #[error("Invalid item '{item}': {reason}")]
    InvalidItem { item: String, reason: String },

    /// Read failure on the input stream.
    #[error("Input error: {message}")]
    Input { message: String },

    /// Connection-level failure before a response arrived.
    #[error("Network error for '{item}': {message}")]
    Network { item: String, message: String },

    /// The request did not complete within the configured timeout.
    #[error("Timeout after {duration:?} for '{item}'")]
    Timeout { item: String, duration: Duration },

    /// Non-success HTTP status other than an authorization failure.
    #[error("Remote error for '{item}' (HTTP {status}): {message}")]
    Status {
        item: String,
        status: u16,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Decode error for '{item}': {message}")]
    Decode { item: String, message: String },

    /// The API key was missing or rejected by the remote service.
    #[error("Authentication rejected for '{item}' (HTTP {status})")]
    Auth { item: String, status: u16 },

    /// Generic internal errors that don't fit other categories.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrailsError {
    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new input error.
    pub fn input<M: Into<String>>(message: M) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a new invalid item error.
    pub fn invalid_item<I: Into<String>, R: Into<String>>(item: I, reason: R) -> Self {
        Self::InvalidItem {
            item: item.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<I: Into<String>, M: Into<String>>(item: I, message: M) -> Self {
        Self::Network {
            item: item.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<I: Into<String>>(item: I, duration: Duration) -> Self {
        Self::Timeout {
            item: item.into(),
            duration,
        }
    }

    /// Create an error from a non-success HTTP status.
    ///
    /// 401 and 403 become [`TrailsError::Auth`]; everything else is a
    /// [`TrailsError::Status`].
    pub fn from_status<I: Into<String>, M: Into<String>>(item: I, status: u16, message: M) -> Self {
        match status {
            401 | 403 => Self::Auth {
                item: item.into(),
                status,
            },
            _ => Self::Status {
                item: item.into(),
                status,
                message: message.into(),
            },
        }
    }

    /// Create a new decode error.
    pub fn decode<I: Into<String>, M: Into<String>>(item: I, message: M) -> Self {
        Self::Decode {
            item: item.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for every failure of a single remote call.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Auth { .. }
        )
    }

    /// True when the remote service rejected the credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Only configuration errors abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// The item (or joined batch) a remote error refers to.
    pub fn item(&self) -> Option<&str> {
        match self {
            Self::Network { item, .. }
            | Self::Timeout { item, .. }
            | Self::Status { item, .. }
            | Self::Decode { item, .. }
            | Self::Auth { item, .. }
            | Self::InvalidItem { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Attach an item to an error produced without one (e.g. via `?` on a
    /// reqwest or serde error).
    pub fn for_item<I: Into<String>>(self, item: I) -> Self {
        let item = item.into();
        match self {
            Self::Network { message, .. } => Self::Network { item, message },
            Self::Timeout { duration, .. } => Self::Timeout { item, duration },
            Self::Status {
                status, message, ..
            } => Self::Status {
                item,
                status,
                message,
            },
            Self::Decode { message, .. } => Self::Decode { item, message },
            Self::Auth { status, .. } => Self::Auth { item, status },
            other => other,
        }
    }
}

impl From<reqwest::Error> for TrailsError {
    fn from(err: reqwest::Error) -> Self {
        let item = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        if err.is_timeout() {
            Self::timeout(item, Duration::ZERO)
        } else if err.is_decode() {
            Self::decode(item, err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(item, status.as_u16(), err.to_string())
        } else {
            Self::network(item, err.to_string())
        }
    }
}

impl From<serde_json::Error> for TrailsError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode("", format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for TrailsError {
    fn from(err: std::io::Error) -> Self {
        Self::input(format!("I/O error: {}", err))
    }
}
