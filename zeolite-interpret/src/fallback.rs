//! Deterministic keyword interpreter.
//!
//! Recognises intent words, time-of-day words, durations, result counts and
//! relative date phrases. Whatever is not mentioned is left unset, except the
//! date range, which defaults to the next 14 days.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use regex::Regex;
use tracing::debug;
use zeolite_core::{
    DateRange, Intent, MAX_RANGE_DAYS, MAX_RESULT_COUNT, MIN_RESULT_COUNT, Query, SlotDuration,
    TimePreference, ValidationError, parse_date_key,
};

use crate::error::InterpretationError;
use crate::interpreter::{Interpreter, check_request};

/// Days covered when the request names no dates.
pub const DEFAULT_RANGE_DAYS: u64 = 14;

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackInterpreter;

impl FallbackInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Parses `text` relative to `today`.
    pub fn parse(&self, text: &str, today: NaiveDate) -> Result<Query, ValidationError> {
        let text = check_request(text)?.to_lowercase();

        let mut query = Query::new(classify_intent(&text), extract_range(&text, today)?);
        if let Some(preference) = extract_time_preference(&text) {
            query = query.with_time_preference(preference);
        }
        if let Some(duration) = extract_duration(&text) {
            query = query.with_slot_duration(duration);
        }
        if let Some(count) = extract_count(&text) {
            query = query.with_result_count(count);
        }
        query.validate()?;

        debug!(intent = ?query.intent, range = %query.date_range, "parsed request locally");
        Ok(query)
    }
}

#[async_trait]
impl Interpreter for FallbackInterpreter {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn interpret(&self, text: &str, today: NaiveDate) -> Result<Query, InterpretationError> {
        Ok(self.parse(text, today)?)
    }
}

fn classify_intent(text: &str) -> Intent {
    if SUGGEST_PATTERN.is_match(text) {
        Intent::SuggestTimes
    } else if SLOTS_PATTERN.is_match(text) {
        Intent::FindSlots
    } else {
        Intent::FindDays
    }
}

fn extract_time_preference(text: &str) -> Option<TimePreference> {
    if MORNING_PATTERN.is_match(text) {
        Some(TimePreference::Morning)
    } else if AFTERNOON_PATTERN.is_match(text) {
        Some(TimePreference::Afternoon)
    } else if EVENING_PATTERN.is_match(text) {
        Some(TimePreference::Evening)
    } else {
        None
    }
}

fn extract_duration(text: &str) -> Option<SlotDuration> {
    if FULL_DAY_PATTERN.is_match(text) {
        return Some(SlotDuration::FullDay);
    }
    if HALF_DAY_PATTERN.is_match(text) {
        return Some(SlotDuration::HalfDay);
    }
    let hours = match HOURS_PATTERN.captures(text)?.get(1)?.as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        digits => digits.parse::<u32>().ok()?,
    };
    Some(match hours {
        0..=1 => SlotDuration::OneHour,
        2..=8 => SlotDuration::HalfDay,
        _ => SlotDuration::FullDay,
    })
}

fn extract_count(text: &str) -> Option<u32> {
    let caps = COUNT_PATTERN.captures(text)?;
    let count = caps.get(1).or_else(|| caps.get(2))?.as_str().parse::<u32>().ok()?;
    Some(count.clamp(MIN_RESULT_COUNT, MAX_RESULT_COUNT))
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, ValidationError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| ValidationError::new("dateRange", "date is out of range"))
}

fn days_span(today: NaiveDate, days: u64) -> Result<DateRange, ValidationError> {
    let days = days.clamp(1, MAX_RANGE_DAYS as u64);
    Ok(DateRange::new(today, add_days(today, days - 1)?))
}

fn days_until(today: NaiveDate, target: Weekday) -> u64 {
    let from = today.weekday().num_days_from_monday();
    u64::from((7 + target.num_days_from_monday() - from) % 7)
}

fn month_of(first: NaiveDate) -> Result<DateRange, ValidationError> {
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| ValidationError::new("dateRange", "date is out of range"))?;
    Ok(DateRange::new(first, last))
}

fn weekday_named(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn extract_range(text: &str, today: NaiveDate) -> Result<DateRange, ValidationError> {
    let explicit: Vec<&str> = DATE_PATTERN.find_iter(text).map(|m| m.as_str()).collect();
    match explicit.as_slice() {
        [] => {}
        [single] => {
            let date = parse_date_key(single)?;
            return Ok(DateRange::new(date, date));
        }
        [start, end, ..] => {
            return Ok(DateRange::new(parse_date_key(start)?, parse_date_key(end)?));
        }
    }

    if let Some(caps) = SPAN_PATTERN.captures(text) {
        let count = caps[1].parse::<u64>().unwrap_or(u64::MAX);
        let days = if caps[2].starts_with("week") {
            count.saturating_mul(7)
        } else {
            count
        };
        return days_span(today, days);
    }

    if TODAY_PATTERN.is_match(text) {
        return Ok(DateRange::new(today, today));
    }
    if text.contains("tomorrow") {
        let date = add_days(today, 1)?;
        return Ok(DateRange::new(date, date));
    }
    if text.contains("weekend") {
        if today.weekday() == Weekday::Sun {
            return Ok(DateRange::new(today, today));
        }
        let saturday = add_days(today, days_until(today, Weekday::Sat))?;
        return Ok(DateRange::new(saturday, add_days(saturday, 1)?));
    }
    if text.contains("next week") {
        let monday = add_days(today, 7 - u64::from(today.weekday().num_days_from_monday()))?;
        return Ok(DateRange::new(monday, add_days(monday, 6)?));
    }
    if text.contains("this week") {
        let left = 6 - u64::from(today.weekday().num_days_from_monday());
        return Ok(DateRange::new(today, add_days(today, left)?));
    }
    if text.contains("next month") {
        let first = today
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .ok_or_else(|| ValidationError::new("dateRange", "date is out of range"))?;
        return month_of(first);
    }
    if text.contains("this month") {
        let month = today
            .with_day(1)
            .ok_or_else(|| ValidationError::new("dateRange", "date is out of range"))
            .and_then(month_of)?;
        return Ok(DateRange::new(today, month.end));
    }
    if let Some(caps) = WEEKDAY_PATTERN.captures(text) {
        if let Some(target) = weekday_named(&caps[2]) {
            let mut offset = days_until(today, target);
            if caps.get(1).is_some() && offset == 0 {
                offset = 7;
            }
            let date = add_days(today, offset)?;
            return Ok(DateRange::new(date, date));
        }
    }

    days_span(today, DEFAULT_RANGE_DAYS)
}

// Patterns run against lowercased text.

static SUGGEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(suggest\w*|best|recommend\w*|propose|ideal|options?)\b").expect("Invalid regex")
});
static SLOTS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(slots?|hours?|hrs?|hourly|block|window|meeting|appointment|call|session)\b|\b\d+h\b")
        .expect("Invalid regex")
});
static MORNING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmornings?\b|\bbefore\s+(noon|lunch)\b").expect("Invalid regex"));
static AFTERNOON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bafternoons?\b|\bafter\s+lunch\b").expect("Invalid regex"));
static EVENING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(evenings?|tonight|nights?)\b|\bafter\s+work\b").expect("Invalid regex")
});
static FULL_DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(full|whole|entire|all)[\s-]+days?\b").expect("Invalid regex"));
static HALF_DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhalf[\s-]+(a\s+)?days?\b").expect("Invalid regex"));
static HOURS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+|an?|one|two|three|four|five|six|seven|eight)[\s-]*(hours?|hrs?|h)\b")
        .expect("Invalid regex")
});
static COUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:top|best)\s+(\d{1,4})\b|\b(\d{1,4})\s+(?:options|suggestions|choices|results|alternatives)\b")
        .expect("Invalid regex")
});
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("Invalid regex"));
static SPAN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:next|coming|within)\s+(\d{1,4})\s+(days?|weeks?)\b").expect("Invalid regex")
});
static TODAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(today|tonight)\b").expect("Invalid regex"));
static WEEKDAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b")
        .expect("Invalid regex")
});
