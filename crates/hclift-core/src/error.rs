//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse JSON template: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid template: {message}")]
    InvalidTemplate { message: String },
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
