//! Free-text interpretation for zeolite queries.
//!
//! Two [`Interpreter`]s produce the same validated [`Query`](zeolite_core::Query):
//! [`RemoteInterpreter`] asks an OpenRouter-compatible model, and
//! [`FallbackInterpreter`] matches keywords locally. [`QueryInterpreter`]
//! tries the remote one under a timeout and falls back to the local one.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use zeolite_core::{Intent, TimePreference};
//! use zeolite_interpret::FallbackInterpreter;
//!
//! let today = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
//! let query = FallbackInterpreter::new().parse("free mornings next week", today).unwrap();
//!
//! assert_eq!(query.intent, Intent::FindDays);
//! assert_eq!(query.time_preference, Some(TimePreference::Morning));
//! ```

mod convert;
mod error;
mod fallback;
mod interpreter;
mod remote;
mod shell;

pub use convert::{build_request_body, parse_response};
pub use error::InterpretationError;
pub use fallback::{DEFAULT_RANGE_DAYS, FallbackInterpreter};
pub use interpreter::{Interpreter, MAX_REQUEST_CHARS, check_request};
pub use remote::{DEFAULT_BASE_URL, DEFAULT_MODEL, RemoteInterpreter};
pub use shell::{DEFAULT_TIMEOUT, Interpretation, QueryInterpreter, Source};
