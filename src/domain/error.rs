use serde::{Deserialize, Serialize};
use std::fmt;

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    ConfigError(String),
    IoError(String),
    /// The request never produced a response (connection, DNS, abort).
    Transport(String),
    /// A response arrived with a non-success status.
    ServerStatus { status: u16, message: Option<String> },
    /// The response body was absent or could not be parsed into envelopes.
    InvalidServerResponse(String),
    /// The body stream failed after the response started.
    StreamRead(String),
    /// A parsed highlight record failed validation.
    Transform(String),
}

impl AppError {
    /// Message shown to the user, normalized so it is never blank.
    pub fn user_message(&self) -> String {
        let message = match self {
            AppError::ServerStatus {
                message: Some(message),
                ..
            } => message.trim().to_string(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::ServerStatus {
                status,
                message: Some(msg),
            } => write!(f, "Server responded with status {}: {}", status, msg),
            AppError::ServerStatus {
                status,
                message: None,
            } => write!(f, "Server responded with status {}", status),
            AppError::InvalidServerResponse(msg) => {
                write!(f, "Invalid server response: {}", msg)
            }
            AppError::StreamRead(msg) => write!(f, "Stream read error: {}", msg),
            AppError::Transform(msg) => write!(f, "Invalid highlight: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_status_display() {
        let err = AppError::ServerStatus {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "Server responded with status 500");
    }

    #[test]
    fn test_user_message_prefers_server_detail() {
        let err = AppError::ServerStatus {
            status: 400,
            message: Some("Test error".to_string()),
        };
        assert_eq!(err.user_message(), "Test error");
    }

    #[test]
    fn test_user_message_falls_back_for_blank_detail() {
        let err = AppError::ServerStatus {
            status: 400,
            message: Some("   ".to_string()),
        };
        assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
    }
}
