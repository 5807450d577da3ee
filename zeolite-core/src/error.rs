use chrono::NaiveDate;
use thiserror::Error;

use crate::slot::SlotKey;

/// A value failed structural or range validation.
///
/// `field` is a dotted path into the offending input (e.g. `dateRange.start`,
/// `days.2026-01-15.slots`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// The slot pattern does not line up with a whole AM or PM half, so no
    /// version 1 status can represent it.
    #[error("cannot downgrade {date}: occupied slots {occupied:?} do not form a half-day block")]
    UnsupportedDowngrade {
        date: NaiveDate,
        occupied: Vec<SlotKey>,
    },

    #[error("malformed day record {key}: {reason}")]
    MalformedDay { key: String, reason: String },
}

impl MigrationError {
    pub(crate) fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::MalformedDay {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
