//! Handler error type
//!
//! Everything a handler can fail with collapses into one `error` frame for
//! the triggering socket: a stable code where one exists, a free-form
//! message otherwise. Stack traces never leave the process.

use signal_core::DomainError;
use signal_service::ServiceError;

use crate::protocol::ServerEvent;

/// Errors from ingress event handlers
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Admission or gating refusal with a stable code
    #[error("{message}")]
    Refused {
        code: &'static str,
        message: String,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl HandlerError {
    /// Refusal with a stable code
    pub fn refused(code: &'static str, message: impl Into<String>) -> Self {
        Self::Refused {
            code,
            message: message.into(),
        }
    }

    /// Translate into the single-frame error event for the client
    pub fn to_server_event(&self) -> ServerEvent {
        match self {
            Self::Service(e) => ServerEvent::Error {
                code: Some(e.error_code().to_string()),
                message: e.to_string(),
            },
            Self::Domain(e) => ServerEvent::Error {
                code: Some(e.code().to_string()),
                message: e.to_string(),
            },
            Self::Refused { code, message } => ServerEvent::Error {
                code: Some((*code).to_string()),
                message: message.clone(),
            },
            Self::InvalidPayload(message) => ServerEvent::Error {
                code: None,
                message: message.clone(),
            },
        }
    }
}

/// Result type for handlers
pub type HandlerResult<T> = Result<T, HandlerError>;
