use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when a failure response does not carry its own `message` field.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCause {
    /// No response was obtained (DNS, connect, timeout, truncated body).
    Network,
    /// A response arrived but its status signals rejection.
    HttpStatus,
    /// The response body was not valid JSON or did not match the expected shape.
    Decode,
}

/// The single error shape every request failure collapses into.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub cause: ErrorCause,
    /// HTTP status code when a response was received.
    pub status: Option<u16>,
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: ErrorCause::Network,
            status: None,
        }
    }

    pub fn decode(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            cause: ErrorCause::Decode,
            status,
        }
    }

    /// Build an `HttpStatus` error from a decoded failure body, preferring its `message` field.
    pub fn from_status(status: u16, body: &serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or(GENERIC_FAILURE_MESSAGE);
        Self {
            message: message.to_string(),
            cause: ErrorCause::HttpStatus,
            status: Some(status),
        }
    }

    /// `true` when the server rejected the credential (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.cause == ErrorCause::HttpStatus && self.status == Some(401)
    }
}
