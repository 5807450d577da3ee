//! Zeolite is an availability engine for a single calendar owner.
//!
//! Core concepts:
//! - **Slot**: one hourly unit of the fixed 06:00–22:00 daily window
//! - **DayRecord**: a blocked day, either coarse AM/PM/full (schema v1) or
//!   per-slot with a full-day flag (schema v2)
//! - **AvailabilityData**: an owner's day map, changed only by block/unblock
//! - **Query**: a validated "find days / find slots / suggest times" request
//! - **QueryEngine**: answers queries over a bounded date range
//!
//! # Example
//!
//! ```
//! use zeolite_core::{AvailabilityData, DateRange, DayState, Half, Intent, Query, execute_query};
//! use chrono::NaiveDate;
//!
//! let mut data = AvailabilityData::new("owner-1");
//! let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
//!
//! assert_eq!(data.block(day, Half::Am, None), DayState::AmBlocked);
//! assert_eq!(data.block(day, Half::Pm, None), DayState::FullBlocked);
//!
//! let query = Query::new(Intent::FindDays, DateRange::new(day, day));
//! assert!(execute_query(&data, &query).unwrap().is_empty());
//! ```

mod data;
mod day;
pub mod engine;
mod error;
pub mod migrate;
pub mod normalize;
mod query;
mod slot;

pub use data::{AvailabilityData, DATE_KEY_FORMAT, DateKey, SchemaVersion, parse_date_key};
pub use day::{DayRecord, DayState, LegacyDay, LegacyStatus, SlotDay};
pub use engine::{FreeDay, FreeRun, QueryEngine, QueryResults, Suggestion, execute_query};
pub use error::{MigrationError, ValidationError};
pub use query::{
    DateRange, Intent, MAX_RANGE_DAYS, MAX_RESULT_COUNT, MIN_RESULT_COUNT, Query, RawQuery,
    SlotDuration, TimePreference,
};
pub use slot::{HALF_LEN, Half, SLOT_COUNT, SlotKey, WINDOW_START_HOUR};
