use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, instrument};
use zeolite_core::Query;

use crate::convert::{build_request_body, parse_response};
use crate::error::InterpretationError;
use crate::interpreter::Interpreter;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Interprets requests through an OpenRouter-compatible chat-completions API.
pub struct RemoteInterpreter {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl RemoteInterpreter {
    /// Creates an interpreter with the given API key.
    ///
    /// An empty key is refused rather than sent.
    pub fn new(api_key: impl Into<String>) -> Result<Self, InterpretationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(InterpretationError::MissingCredential);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Interpreter for RemoteInterpreter {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn interpret(&self, text: &str, today: NaiveDate) -> Result<Query, InterpretationError> {
        let body = build_request_body(&self.model, text, today);

        debug!("Sending request to OpenRouter");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = response_body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            return Err(InterpretationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Received successful response");

        parse_response(&response_body)
    }
}
