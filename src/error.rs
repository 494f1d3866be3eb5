use std::fmt;

use serde::Serialize;

/// Structured error type for the crate. Every failure that crosses the
/// resolver or scheduler boundary is one of these, so callers can turn it
/// into a status line instead of unwinding.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum AgentError {
    NotFound { what: String },
    ValidationError { message: String },
    IoError { message: String },
    NoApiKey,
    Transport { message: String },
    HttpStatus { status: u16, text: String },
    InvalidResponse { message: String },
    HandlerFailed { message: String },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::NotFound { what } => write!(f, "{what} not found"),
            AgentError::ValidationError { message } => write!(f, "{message}"),
            AgentError::IoError { message } => write!(f, "I/O error: {message}"),
            AgentError::NoApiKey => {
                write!(f, "No API key configured. Run `actionmap-cli config set-key`.")
            }
            AgentError::Transport { message } => write!(f, "Request failed: {message}"),
            AgentError::HttpStatus { status, text } => write!(f, "HTTP {status}: {text}"),
            AgentError::InvalidResponse { message } => {
                write!(f, "Invalid completion response: {message}")
            }
            AgentError::HandlerFailed { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::IoError {
            message: e.to_string(),
        }
    }
}

impl From<crate::store::StoreError> for AgentError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::Io(io_err) => AgentError::IoError {
                message: io_err.to_string(),
            },
            crate::store::StoreError::Json(json_err) => AgentError::ValidationError {
                message: json_err.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::Transport {
            message: e.to_string(),
        }
    }
}

/// Handlers written as closures usually fail with a plain message.
impl From<String> for AgentError {
    fn from(s: String) -> Self {
        AgentError::HandlerFailed { message: s }
    }
}

impl From<&str> for AgentError {
    fn from(s: &str) -> Self {
        AgentError::HandlerFailed {
            message: s.to_string(),
        }
    }
}
