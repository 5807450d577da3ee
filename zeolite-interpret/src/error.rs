use std::time::Duration;

use thiserror::Error;
use zeolite_core::ValidationError;

#[derive(Debug, Error)]
pub enum InterpretationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("API key is empty")]
    MissingCredential,
}
