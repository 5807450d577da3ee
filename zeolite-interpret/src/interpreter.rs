use async_trait::async_trait;
use chrono::NaiveDate;
use zeolite_core::{Query, ValidationError};

use crate::error::InterpretationError;

/// Longest accepted free-text request, in characters.
pub const MAX_REQUEST_CHARS: usize = 500;

/// Turns a free-text request into a validated [`Query`].
///
/// `today` anchors relative phrases such as "tomorrow" or "next week".
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn interpret(&self, text: &str, today: NaiveDate) -> Result<Query, InterpretationError>;
}

/// Trims `text` and rejects empty or overlong requests.
pub fn check_request(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::new("text", "request is empty"));
    }
    let chars = text.chars().count();
    if chars > MAX_REQUEST_CHARS {
        return Err(ValidationError::new(
            "text",
            format!("request is {chars} characters, maximum is {MAX_REQUEST_CHARS}"),
        ));
    }
    Ok(text)
}
