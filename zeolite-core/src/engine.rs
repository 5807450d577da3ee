//! Executes validated queries against loaded availability data.

use serde::Serialize;
use std::cell::Cell;
use std::cmp::Ordering;
use tracing::debug;

use crate::data::{AvailabilityData, DateKey};
use crate::day::{DayRecord, DayState};
use crate::error::ValidationError;
use crate::query::{DateRange, Intent, Query, SlotDuration, TimePreference};
use crate::slot::{SLOT_COUNT, SlotKey};

/// Suggestions returned when a query does not set `resultCount`.
pub const DEFAULT_SUGGESTION_COUNT: usize = 5;

const PROXIMITY_WEIGHT: f64 = 0.5;
const FIT_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;

/// A date that is not fully blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeDay {
    pub date: DateKey,
    pub state: DayState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_label: Option<String>,
}

/// A maximal run of consecutive free slots on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeRun {
    pub date: DateKey,
    pub start: SlotKey,
    pub slots: usize,
}

impl FreeRun {
    /// Hour at which the run ends (exclusive).
    pub fn end_hour(&self) -> u8 {
        self.start.hour() + self.slots as u8
    }
}

/// A ranked booking proposal inside a free run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub date: DateKey,
    pub start: SlotKey,
    pub slots: usize,
    /// Length of the free run the suggestion was taken from.
    pub run_slots: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum QueryResults {
    Days(Vec<FreeDay>),
    Slots(Vec<FreeRun>),
    Suggestions(Vec<Suggestion>),
}

impl QueryResults {
    pub fn len(&self) -> usize {
        match self {
            QueryResults::Days(items) => items.len(),
            QueryResults::Slots(items) => items.len(),
            QueryResults::Suggestions(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validates `query` and runs it against `data`.
pub fn execute_query(data: &AvailabilityData, query: &Query) -> Result<QueryResults, ValidationError> {
    QueryEngine::new(data).execute(query)
}

/// Read-only query executor over one [`AvailabilityData`].
///
/// Counts every individual slot lookup so callers can check that fully
/// blocked days are skipped without a slot scan.
pub struct QueryEngine<'a> {
    data: &'a AvailabilityData,
    slot_reads: Cell<usize>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(data: &'a AvailabilityData) -> Self {
        Self {
            data,
            slot_reads: Cell::new(0),
        }
    }

    /// Number of per-slot lookups performed so far.
    pub fn slot_reads(&self) -> usize {
        self.slot_reads.get()
    }

    pub fn execute(&self, query: &Query) -> Result<QueryResults, ValidationError> {
        query.validate()?;
        debug!(intent = ?query.intent, range = %query.date_range, "executing query");

        let limit = query.result_count.map(|count| count as usize);
        let results = match query.intent {
            Intent::FindDays => QueryResults::Days(truncate(self.find_days(query), limit)),
            Intent::FindSlots => QueryResults::Slots(truncate(self.find_slots(query), limit)),
            Intent::SuggestTimes => QueryResults::Suggestions(truncate(
                self.suggest_times(query),
                Some(limit.unwrap_or(DEFAULT_SUGGESTION_COUNT)),
            )),
        };
        Ok(results)
    }

    fn find_days(&self, query: &Query) -> Vec<FreeDay> {
        let half = query.time_preference.and_then(TimePreference::half);
        query
            .date_range
            .dates()
            .filter_map(|date| {
                let record = self.data.day(date);
                let state = record.map_or(DayState::Available, DayRecord::state);
                if state == DayState::FullBlocked {
                    return None;
                }
                if half.is_some_and(|half| state.is_blocked(half)) {
                    return None;
                }
                Some(FreeDay {
                    date,
                    state,
                    event_label: record.and_then(DayRecord::event_label).map(str::to_string),
                })
            })
            .collect()
    }

    fn find_slots(&self, query: &Query) -> Vec<FreeRun> {
        let preference = query.time_preference_or_any();
        let min_len = query.slot_duration_or_default().slots();
        query
            .date_range
            .dates()
            .flat_map(|date| self.free_runs(date, preference))
            .filter(|run| run.slots >= min_len)
            .collect()
    }

    /// Maximal free runs on `date` within the preference window.
    fn free_runs(&self, date: DateKey, preference: TimePreference) -> Vec<FreeRun> {
        let record = self.data.day(date);
        if record.is_some_and(DayRecord::is_full) {
            return Vec::new();
        }

        let mut runs = Vec::new();
        let mut current: Option<FreeRun> = None;
        for index in preference.window() {
            let Some(slot) = SlotKey::from_index(index) else {
                break;
            };
            let free = !record.is_some_and(|record| self.read_slot(record, slot));
            current = match (free, current) {
                (true, Some(run)) => Some(FreeRun {
                    slots: run.slots + 1,
                    ..run
                }),
                (true, None) => Some(FreeRun {
                    date,
                    start: slot,
                    slots: 1,
                }),
                (false, run) => {
                    runs.extend(run);
                    None
                }
            };
        }
        runs.extend(current);
        runs
    }

    fn read_slot(&self, record: &DayRecord, slot: SlotKey) -> bool {
        self.slot_reads.set(self.slot_reads.get() + 1);
        record.is_occupied(slot)
    }

    fn suggest_times(&self, query: &Query) -> Vec<Suggestion> {
        let preference = query.time_preference_or_any();
        let duration = query.slot_duration_or_default();

        let mut suggestions: Vec<Suggestion> = self
            .find_slots(query)
            .into_iter()
            .map(|run| score_run(&run, preference, duration, &query.date_range))
            .collect();

        suggestions.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.date.cmp(&b.date))
                .then_with(|| a.start.cmp(&b.start))
        });
        suggestions
    }
}

fn truncate<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

/// Picks the best window of `duration` inside `run` and scores it.
fn score_run(
    run: &FreeRun,
    preference: TimePreference,
    duration: SlotDuration,
    range: &DateRange,
) -> Suggestion {
    let len = duration.slots();
    let start_index = best_window_start(run, len, preference.centre());
    let start = SlotKey::from_index(start_index).unwrap_or(run.start);

    let proximity = match preference.centre() {
        Some(centre) => {
            let distance = (window_midpoint(start_index, len) - centre).abs();
            1.0 - (distance / SLOT_COUNT as f64).min(1.0)
        }
        None => 1.0,
    };
    let waste = run.slots.saturating_sub(len);
    let fit = 1.0 - waste as f64 / SLOT_COUNT as f64;
    let offset = (run.date - range.start).num_days() as f64;
    let recency = 1.0 - offset / range.len_days().max(1) as f64;

    Suggestion {
        date: run.date,
        start,
        slots: len,
        run_slots: run.slots,
        score: PROXIMITY_WEIGHT * proximity + FIT_WEIGHT * fit + RECENCY_WEIGHT * recency,
    }
}

fn window_midpoint(start_index: usize, len: usize) -> f64 {
    let start_hour = SlotKey::from_index(start_index).map_or(0.0, |slot| slot.hour() as f64);
    start_hour + len as f64 / 2.0
}

/// Slot index of the `len`-slot window inside `run` closest to `centre`.
/// Earliest window wins ties and is used when there is no centre.
fn best_window_start(run: &FreeRun, len: usize, centre: Option<f64>) -> usize {
    let first = run.start.index();
    let last = first + run.slots.saturating_sub(len);
    let Some(centre) = centre else {
        return first;
    };
    (first..=last)
        .min_by(|a, b| {
            let da = (window_midpoint(*a, len) - centre).abs();
            let db = (window_midpoint(*b, len) - centre).abs();
            da.partial_cmp(&db).unwrap_or(Ordering::Equal).then(a.cmp(b))
        })
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SchemaVersion, parse_date_key};
    use crate::day::{LegacyDay, LegacyStatus, SlotDay};
    use crate::slot::Half;
    use std::collections::BTreeMap;

    fn date(s: &str) -> DateKey {
        parse_date_key(s).unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(date(start), date(end))
    }

    fn slot(hour: u8) -> SlotKey {
        SlotKey::from_hour(hour).unwrap()
    }

    fn data_with(days: Vec<(&str, DayRecord)>) -> AvailabilityData {
        let days: BTreeMap<_, _> = days.into_iter().map(|(d, r)| (date(d), r)).collect();
        AvailabilityData::from_parts(SchemaVersion::V2, "owner", chrono::Utc::now(), days)
    }

    fn full_day() -> DayRecord {
        DayRecord::Slotted(SlotDay {
            slots: BTreeMap::new(),
            full_day_block: true,
            event_label: None,
        })
    }

    fn occupied(hours: impl IntoIterator<Item = u8>) -> DayRecord {
        DayRecord::Slotted(SlotDay {
            slots: hours.into_iter().map(|h| (slot(h), true)).collect(),
            full_day_block: false,
            event_label: None,
        })
    }

    #[test]
    fn find_days_skips_full_and_preference_half() {
        let mut data = data_with(vec![("2026-01-02", full_day())]);
        data.block(date("2026-01-03"), Half::Am, None);

        let query = Query::new(Intent::FindDays, range("2026-01-01", "2026-01-04"));
        let QueryResults::Days(days) = execute_query(&data, &query).unwrap() else {
            panic!("expected days");
        };
        let dates: Vec<_> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date("2026-01-01"), date("2026-01-03"), date("2026-01-04")]);

        let morning = query.with_time_preference(TimePreference::Morning);
        let QueryResults::Days(days) = execute_query(&data, &morning).unwrap() else {
            panic!("expected days");
        };
        assert_eq!(days.len(), 2);
        assert!(days.iter().all(|d| d.date != date("2026-01-03")));
    }

    #[test]
    fn afternoon_days_follow_the_pm_half() {
        let mut data = data_with(vec![]);
        data.block(date("2026-01-15"), Half::Am, None);
        let query = Query::new(Intent::FindDays, range("2026-01-15", "2026-01-15"))
            .with_time_preference(TimePreference::Afternoon);

        // 12:00 and 13:00 sit in the blocked AM half but the day still counts.
        let QueryResults::Days(days) = execute_query(&data, &query).unwrap() else {
            panic!("expected days");
        };
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].state, DayState::AmBlocked);

        let slots = Query {
            intent: Intent::FindSlots,
            ..query
        };
        let QueryResults::Slots(runs) = execute_query(&data, &slots).unwrap() else {
            panic!("expected slots");
        };
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, slot(14));
        assert_eq!(runs[0].slots, 3);
    }

    #[test]
    fn full_day_block_is_not_scanned() {
        let data = data_with(vec![("2026-01-02", full_day())]);
        let engine = QueryEngine::new(&data);
        let query = Query::new(Intent::FindSlots, range("2026-01-02", "2026-01-02"));

        let results = engine.execute(&query).unwrap();
        assert!(results.is_empty());
        assert_eq!(engine.slot_reads(), 0);
    }

    #[test]
    fn runs_are_maximal_and_filtered_by_duration() {
        // Free: 06-08, 10-11, 13-21
        let data = data_with(vec![("2026-01-05", occupied([9, 12]))]);
        let query = Query::new(Intent::FindSlots, range("2026-01-05", "2026-01-05"));

        let QueryResults::Slots(runs) = execute_query(&data, &query).unwrap() else {
            panic!("expected slots");
        };
        let shape: Vec<_> = runs.iter().map(|r| (r.start.hour(), r.slots)).collect();
        assert_eq!(shape, vec![(6, 3), (10, 2), (13, 9)]);
        assert_eq!(runs[2].end_hour(), 22);

        let half_day = query.with_slot_duration(SlotDuration::HalfDay);
        let QueryResults::Slots(runs) = execute_query(&data, &half_day).unwrap() else {
            panic!("expected slots");
        };
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, slot(13));
    }

    #[test]
    fn half_blocked_day_never_fits_full_day() {
        let mut data = data_with(vec![]);
        data.block(date("2026-01-15"), Half::Pm, None);
        let query = Query::new(Intent::FindSlots, range("2026-01-15", "2026-01-15"));

        let full = query.clone().with_slot_duration(SlotDuration::FullDay);
        assert!(execute_query(&data, &full).unwrap().is_empty());
        let suggest = Query {
            intent: Intent::SuggestTimes,
            ..full
        };
        assert!(execute_query(&data, &suggest).unwrap().is_empty());

        let half = query.with_slot_duration(SlotDuration::HalfDay);
        let QueryResults::Slots(runs) = execute_query(&data, &half).unwrap() else {
            panic!("expected slots");
        };
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, slot(6));
        assert_eq!(runs[0].slots, SlotDuration::HalfDay.slots());
    }

    #[test]
    fn preference_restricts_window() {
        let data = data_with(vec![]);
        let query = Query::new(Intent::FindSlots, range("2026-01-05", "2026-01-05"))
            .with_time_preference(TimePreference::Evening);
        let QueryResults::Slots(runs) = execute_query(&data, &query).unwrap() else {
            panic!("expected slots");
        };
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, slot(17));
        assert_eq!(runs[0].slots, 5);
    }

    #[test]
    fn legacy_days_are_approximated() {
        let legacy = DayRecord::Legacy(LegacyDay {
            status: LegacyStatus::AmOnly,
            event_label: None,
        });
        let data = data_with(vec![("2026-01-05", legacy)]);
        let query = Query::new(Intent::SuggestTimes, range("2026-01-05", "2026-01-05"))
            .with_time_preference(TimePreference::Afternoon);

        let QueryResults::Suggestions(suggestions) = execute_query(&data, &query).unwrap() else {
            panic!("expected suggestions");
        };
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].start, slot(14));
    }

    #[test]
    fn suggestions_prefer_centre_then_sooner() {
        let data = data_with(vec![]);
        let query = Query::new(Intent::SuggestTimes, range("2026-01-05", "2026-01-07"))
            .with_time_preference(TimePreference::Morning)
            .with_result_count(3);

        let QueryResults::Suggestions(suggestions) = execute_query(&data, &query).unwrap() else {
            panic!("expected suggestions");
        };
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.start == slot(8)));
        let dates: Vec<_> = suggestions.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date("2026-01-05"), date("2026-01-06"), date("2026-01-07")]);
        assert!(suggestions[0].score > suggestions[1].score);
    }

    #[test]
    fn suggestions_prefer_tight_fit() {
        // Day one has a long free morning, day two an exact one-hour gap.
        let data = data_with(vec![("2026-01-06", occupied([6, 7, 9, 10, 11]))]);
        let query = Query::new(Intent::SuggestTimes, range("2026-01-05", "2026-01-24"))
            .with_time_preference(TimePreference::Morning);

        let QueryResults::Suggestions(suggestions) = execute_query(&data, &query).unwrap() else {
            panic!("expected suggestions");
        };
        let tight = suggestions.iter().find(|s| s.date == date("2026-01-06")).unwrap();
        let loose = suggestions.iter().find(|s| s.date == date("2026-01-05")).unwrap();
        assert_eq!(tight.run_slots, 1);
        assert!(tight.score > loose.score);
    }

    #[test]
    fn default_suggestion_count_applies() {
        let data = data_with(vec![]);
        let query = Query::new(Intent::SuggestTimes, range("2026-01-01", "2026-01-31"));
        assert_eq!(execute_query(&data, &query).unwrap().len(), DEFAULT_SUGGESTION_COUNT);
    }

    #[test]
    fn invalid_queries_are_rejected_before_scanning() {
        let data = data_with(vec![("2026-01-02", occupied([9]))]);
        let engine = QueryEngine::new(&data);

        let reversed = Query::new(Intent::FindSlots, range("2026-01-03", "2026-01-01"));
        assert!(engine.execute(&reversed).is_err());

        let too_long = Query::new(Intent::FindSlots, range("2026-01-01", "2026-06-01"));
        assert!(engine.execute(&too_long).is_err());

        let zero = Query::new(Intent::FindSlots, range("2026-01-01", "2026-01-03")).with_result_count(0);
        assert!(engine.execute(&zero).is_err());

        assert_eq!(engine.slot_reads(), 0);
    }
}
