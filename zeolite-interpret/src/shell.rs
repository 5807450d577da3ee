use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};
use zeolite_core::{Query, ValidationError};

use crate::error::InterpretationError;
use crate::fallback::FallbackInterpreter;
use crate::interpreter::{Interpreter, check_request};

/// Upper bound on one primary interpretation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which interpreter produced a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub query: Query,
    pub source: Source,
}

/// Tries the primary interpreter under a timeout and falls back to the
/// local parser on any failure.
pub struct QueryInterpreter {
    primary: Option<Box<dyn Interpreter>>,
    fallback: FallbackInterpreter,
    timeout: Duration,
}

impl QueryInterpreter {
    pub fn new(primary: impl Interpreter + 'static) -> Self {
        Self {
            primary: Some(Box::new(primary)),
            fallback: FallbackInterpreter::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Uses only the local parser.
    pub fn fallback_only() -> Self {
        Self {
            primary: None,
            fallback: FallbackInterpreter::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Interprets `text` relative to the local date.
    pub async fn interpret_query(&self, text: &str) -> Result<Query, ValidationError> {
        let today = Local::now().date_naive();
        Ok(self.interpret(text, today).await?.query)
    }

    /// Interprets `text` relative to `today`, reporting which path answered.
    ///
    /// Input bounds are checked once, before either path runs. Only a
    /// fallback failure is returned to the caller.
    pub async fn interpret(&self, text: &str, today: NaiveDate) -> Result<Interpretation, ValidationError> {
        let text = check_request(text)?;

        if let Some(primary) = &self.primary {
            match self.try_primary(primary.as_ref(), text, today).await {
                Ok(query) => {
                    debug!(interpreter = primary.name(), "interpreted request");
                    return Ok(Interpretation {
                        query,
                        source: Source::Primary,
                    });
                }
                Err(err) => {
                    warn!(interpreter = primary.name(), error = %err, "falling back to local parser");
                }
            }
        }

        let query = self.fallback.parse(text, today)?;
        Ok(Interpretation {
            query,
            source: Source::Fallback,
        })
    }

    async fn try_primary(
        &self,
        primary: &dyn Interpreter,
        text: &str,
        today: NaiveDate,
    ) -> Result<Query, InterpretationError> {
        let query = tokio::time::timeout(self.timeout, primary.interpret(text, today))
            .await
            .map_err(|_| InterpretationError::Timeout(self.timeout))??;
        query.validate()?;
        Ok(query)
    }
}
