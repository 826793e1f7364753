use std::collections::BTreeMap;

use serde_json::{json, Value};
use thiserror::Error;

/// Field name to human readable message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication header must be provided")]
    MissingAuthHeader,
    #[error("Authentication token must be 'Bearer [token]'")]
    MalformedAuthHeader,
    #[error("Invalid/Expired token")]
    InvalidToken,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    ValidationFailed { message: String, errors: FieldErrors },
    #[error(transparent)]
    Unauthenticated(#[from] AuthError),
    #[error("Action not allowed")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    Conflict { message: String, errors: FieldErrors },
    #[error("Wrong credentials")]
    WrongCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, errors: FieldErrors) -> Self {
        ApiError::ValidationFailed {
            message: message.into(),
            errors,
        }
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.clone());
        ApiError::validation(message, errors)
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::ValidationFailed { .. } | ApiError::WrongCredentials => 400,
            ApiError::Unauthenticated(_) => 401,
            ApiError::Forbidden => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationFailed { .. } | ApiError::WrongCredentials => "BAD_USER_INPUT",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// GraphQL-style error entry. Internal details never leave the process.
    pub fn to_payload(&self) -> Value {
        let (message, errors) = match self {
            ApiError::ValidationFailed { message, errors }
            | ApiError::Conflict { message, errors } => (message.clone(), json!(errors)),
            ApiError::NotFound(_) | ApiError::WrongCredentials => {
                let message = self.to_string();
                (message.clone(), json!({ "general": message }))
            }
            ApiError::Internal(_) => ("Internal server error".to_string(), json!({})),
            other => (other.to_string(), json!({})),
        };

        json!({
            "message": message,
            "extensions": {
                "code": self.code(),
                "errors": errors,
            }
        })
    }
}
