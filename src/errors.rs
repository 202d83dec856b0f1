use serde_json::Value;
use thiserror::Error;

use crate::mcp::rpc::json_rpc_error_with_data;

pub const PARSE_ERROR: i64 = -32700;
pub const INTERNAL_ERROR: i64 = -32603;
pub const REQUEST_TIMEOUT: i64 = -32001;

/// Upper bound on the remote body echoed back in `error.data`.
pub const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("request timed out")]
    Timeout,
    #[error("cannot reach {target}")]
    ConnectionFailed { target: String },
    #[error("server error: {status}")]
    HttpStatus { status: u16, body: String },
    #[error("internal error: {0}")]
    Internal(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl RelayError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        Self::HttpStatus {
            status,
            body: truncate_chars(body, ERROR_BODY_LIMIT),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Timeout => REQUEST_TIMEOUT,
            Self::Parse(_) => PARSE_ERROR,
            Self::ConnectionFailed { .. } | Self::HttpStatus { .. } | Self::Internal(_) => {
                INTERNAL_ERROR
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Timeout => "Request timed out".to_string(),
            Self::ConnectionFailed { .. } => "Connection failed".to_string(),
            Self::HttpStatus { status, .. } => format!("Server error: {status}"),
            Self::Internal(_) => "Internal error".to_string(),
            Self::Parse(_) => "Parse error".to_string(),
        }
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            Self::Timeout => None,
            Self::ConnectionFailed { target } => {
                Some(Value::String(format!("Cannot reach {target}")))
            }
            Self::HttpStatus { body, .. } => Some(Value::String(body.clone())),
            Self::Internal(detail) | Self::Parse(detail) => Some(Value::String(detail.clone())),
        }
    }

    pub fn into_json_rpc(self, id: Option<Value>) -> Value {
        json_rpc_error_with_data(id, self.code(), &self.message(), self.data())
    }
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
