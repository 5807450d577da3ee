//! Structured availability queries and their validation.
//!
//! A [`Query`] may come from the remote interpreter, the fallback parser, or a
//! caller building one by hand. All three go through [`Query::validate`] before
//! the engine scans anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::data::{DATE_KEY_FORMAT, DateKey, parse_date_key};
use crate::error::ValidationError;
use crate::slot::{HALF_LEN, Half, SLOT_COUNT};

/// Longest date range a query may cover, counted inclusively.
pub const MAX_RANGE_DAYS: i64 = 90;

/// Bounds for `resultCount`.
pub const MIN_RESULT_COUNT: u32 = 1;
pub const MAX_RESULT_COUNT: u32 = 1000;

/// Lowercases and strips separators so `find_days`, `findDays` and
/// `Find Days` compare equal.
fn canonical(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FindDays,
    FindSlots,
    SuggestTimes,
}

impl FromStr for Intent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "finddays" => Ok(Intent::FindDays),
            "findslots" => Ok(Intent::FindSlots),
            "suggesttimes" => Ok(Intent::SuggestTimes),
            _ => Err(ValidationError::new("intent", format!("unknown intent {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePreference {
    Morning,
    Afternoon,
    Evening,
    Any,
}

impl TimePreference {
    /// Slot indices covered by this part of the day.
    pub fn window(self) -> Range<usize> {
        match self {
            TimePreference::Morning => 0..6,
            TimePreference::Afternoon => 6..11,
            TimePreference::Evening => 11..SLOT_COUNT,
            TimePreference::Any => 0..SLOT_COUNT,
        }
    }

    /// Preferred time of day in hours, used to rank suggestions.
    pub fn centre(self) -> Option<f64> {
        match self {
            TimePreference::Morning => Some(9.0),
            TimePreference::Afternoon => Some(14.5),
            TimePreference::Evening => Some(19.5),
            TimePreference::Any => None,
        }
    }

    /// The half a day must have free for whole-day matches.
    ///
    /// Afternoon starts at 12:00 but maps to the PM half, which starts at
    /// 14:00, so the 12:00 and 13:00 slots are not consulted here.
    pub fn half(self) -> Option<Half> {
        match self {
            TimePreference::Morning => Some(Half::Am),
            TimePreference::Afternoon | TimePreference::Evening => Some(Half::Pm),
            TimePreference::Any => None,
        }
    }
}

impl FromStr for TimePreference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "morning" | "am" => Ok(TimePreference::Morning),
            "afternoon" | "pm" => Ok(TimePreference::Afternoon),
            "evening" | "night" => Ok(TimePreference::Evening),
            "any" | "anytime" => Ok(TimePreference::Any),
            _ => Err(ValidationError::new(
                "timePreference",
                format!("unknown time preference {s:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDuration {
    #[default]
    OneHour,
    HalfDay,
    FullDay,
}

impl SlotDuration {
    /// Number of consecutive free slots required.
    pub fn slots(self) -> usize {
        match self {
            SlotDuration::OneHour => 1,
            SlotDuration::HalfDay => HALF_LEN,
            SlotDuration::FullDay => SLOT_COUNT,
        }
    }
}

impl FromStr for SlotDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "onehour" | "hour" | "1h" => Ok(SlotDuration::OneHour),
            "halfday" => Ok(SlotDuration::HalfDay),
            "fullday" | "allday" => Ok(SlotDuration::FullDay),
            _ => Err(ValidationError::new(
                "slotDuration",
                format!("unknown slot duration {s:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateKey,
    pub end: DateKey,
}

impl DateRange {
    pub fn new(start: DateKey, end: DateKey) -> Self {
        Self { start, end }
    }

    /// Number of dates covered, counting both ends. Zero or negative when
    /// `start > end`.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterates every date from `start` through `end`.
    ///
    /// Each step derives the following date as a fresh value; the cursor is
    /// never advanced in place.
    pub fn dates(&self) -> impl Iterator<Item = DateKey> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |date| {
            if *date < end { date.succ_opt() } else { None }
        })
        .take_while(move |date| *date <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_KEY_FORMAT),
            self.end.format(DATE_KEY_FORMAT)
        )
    }
}

/// A structured availability question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawQuery")]
pub struct Query {
    pub intent: Intent,
    pub date_range: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_preference: Option<TimePreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_duration: Option<SlotDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u32>,
}

impl Query {
    pub fn new(intent: Intent, date_range: DateRange) -> Self {
        Self {
            intent,
            date_range,
            time_preference: None,
            slot_duration: None,
            result_count: None,
        }
    }

    pub fn with_time_preference(mut self, preference: TimePreference) -> Self {
        self.time_preference = Some(preference);
        self
    }

    pub fn with_slot_duration(mut self, duration: SlotDuration) -> Self {
        self.slot_duration = Some(duration);
        self
    }

    pub fn with_result_count(mut self, count: u32) -> Self {
        self.result_count = Some(count);
        self
    }

    /// Checks range order, range span and result count.
    ///
    /// The span counts both ends, so `start..=end` may cover at most
    /// [`MAX_RANGE_DAYS`] dates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let range = &self.date_range;
        if range.start > range.end {
            return Err(ValidationError::new(
                "dateRange",
                format!("start {} is after end {}", range.start, range.end),
            ));
        }
        if range.len_days() > MAX_RANGE_DAYS {
            return Err(ValidationError::new(
                "dateRange",
                format!("spans {} days, maximum is {MAX_RANGE_DAYS}", range.len_days()),
            ));
        }
        if let Some(count) = self.result_count {
            if !(MIN_RESULT_COUNT..=MAX_RESULT_COUNT).contains(&count) {
                return Err(ValidationError::new(
                    "resultCount",
                    format!("{count} is outside {MIN_RESULT_COUNT}..={MAX_RESULT_COUNT}"),
                ));
            }
        }
        Ok(())
    }

    pub fn time_preference_or_any(&self) -> TimePreference {
        self.time_preference.unwrap_or(TimePreference::Any)
    }

    pub fn slot_duration_or_default(&self) -> SlotDuration {
        self.slot_duration.unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDateRange {
    start: Option<String>,
    end: Option<String>,
}

/// Loosely typed query as it arrives from JSON, converted with field-level
/// errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuery {
    intent: Option<String>,
    date_range: Option<RawDateRange>,
    time_preference: Option<String>,
    slot_duration: Option<String>,
    result_count: Option<serde_json::Number>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .ok_or_else(|| ValidationError::new(field, "missing"))
}

fn parse_range_date(value: &Option<String>, field: &str) -> Result<NaiveDate, ValidationError> {
    parse_date_key(required(value, field)?).map_err(|err| ValidationError::new(field, err.reason))
}

impl TryFrom<RawQuery> for Query {
    type Error = ValidationError;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        let intent = required(&raw.intent, "intent")?.parse::<Intent>()?;
        let range = raw
            .date_range
            .ok_or_else(|| ValidationError::new("dateRange", "missing"))?;
        let date_range = DateRange::new(
            parse_range_date(&range.start, "dateRange.start")?,
            parse_range_date(&range.end, "dateRange.end")?,
        );
        let time_preference = raw
            .time_preference
            .as_deref()
            .map(str::parse::<TimePreference>)
            .transpose()?;
        let slot_duration = raw
            .slot_duration
            .as_deref()
            .map(str::parse::<SlotDuration>)
            .transpose()?;
        let result_count = raw
            .result_count
            .map(|number| {
                number
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        ValidationError::new("resultCount", format!("{number} is not a valid count"))
                    })
            })
            .transpose()?;

        let query = Query {
            intent,
            date_range,
            time_preference,
            slot_duration,
            result_count,
        };
        query.validate()?;
        Ok(query)
    }
}

impl Query {
    /// Parses and validates a query from a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        let raw: RawQuery = serde_json::from_value(value)
            .map_err(|err| ValidationError::new("query", err.to_string()))?;
        raw.try_into()
    }
}
