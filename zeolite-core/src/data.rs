use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::day::{DayRecord, DayState, LegacyDay, SlotDay};
use crate::error::ValidationError;
use crate::slot::Half;

/// Calendar date used as a day-map key.
pub type DateKey = NaiveDate;

/// Format of a [`DateKey`] in persisted documents.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Parses an ISO `YYYY-MM-DD` key, rejecting impossible calendar dates.
pub fn parse_date_key(key: &str) -> Result<DateKey, ValidationError> {
    if key.len() != 10 {
        return Err(ValidationError::new("date", format!("expected YYYY-MM-DD, got {key:?}")));
    }
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|err| ValidationError::new("date", format!("{key:?}: {err}")))
}

/// On-disk schema version of a day record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    pub const LATEST: SchemaVersion = SchemaVersion::V2;
}

impl TryFrom<u8> for SchemaVersion {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SchemaVersion::V1),
            2 => Ok(SchemaVersion::V2),
            other => Err(ValidationError::new(
                "schemaVersion",
                format!("unsupported version {other}"),
            )),
        }
    }
}

impl From<SchemaVersion> for u8 {
    fn from(version: SchemaVersion) -> Self {
        match version {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", u8::from(*self))
    }
}

/// One owner's blocked days.
///
/// Days are only changed through [`block`](Self::block) and
/// [`unblock`](Self::unblock); a date without a record is fully available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityData {
    pub schema_version: SchemaVersion,
    pub owner_id: String,
    pub last_modified: DateTime<Utc>,
    days: BTreeMap<DateKey, DayRecord>,
}

impl AvailabilityData {
    /// Creates an empty calendar at the latest schema version.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            schema_version: SchemaVersion::LATEST,
            owner_id: owner_id.into(),
            last_modified: Utc::now(),
            days: BTreeMap::new(),
        }
    }

    /// Assembles data decoded from storage or an import.
    pub fn from_parts(
        schema_version: SchemaVersion,
        owner_id: impl Into<String>,
        last_modified: DateTime<Utc>,
        days: BTreeMap<DateKey, DayRecord>,
    ) -> Self {
        Self {
            schema_version,
            owner_id: owner_id.into(),
            last_modified,
            days,
        }
    }

    pub fn days(&self) -> &BTreeMap<DateKey, DayRecord> {
        &self.days
    }

    pub fn into_days(self) -> BTreeMap<DateKey, DayRecord> {
        self.days
    }

    pub fn day(&self, date: DateKey) -> Option<&DayRecord> {
        self.days.get(&date)
    }

    pub fn state_on(&self, date: DateKey) -> DayState {
        self.day(date).map_or(DayState::Available, DayRecord::state)
    }

    /// Blocks one half of `date` and returns the resulting state.
    ///
    /// A new record takes the data's schema version. `label`, when given,
    /// replaces the day's event label.
    pub fn block(&mut self, date: DateKey, half: Half, label: Option<String>) -> DayState {
        let next = match self.days.remove(&date) {
            Some(record) => record.transition(half, true),
            None => self.fresh_record(half),
        };
        self.store_transition(date, next.map(|record| relabel(record, label)))
    }

    /// Unblocks one half of `date` and returns the resulting state.
    pub fn unblock(&mut self, date: DateKey, half: Half) -> DayState {
        let current = self.state_on(date);
        if !current.is_blocked(half) {
            return current;
        }
        let next = self
            .days
            .remove(&date)
            .and_then(|record| record.transition(half, false));
        self.store_transition(date, next)
    }

    /// Replaces the record for `date` wholesale. Used by import merges.
    ///
    /// A record that blocks nothing clears the date instead of being stored.
    pub fn merge_day(&mut self, date: DateKey, record: DayRecord) {
        if record.is_vacant() {
            self.days.remove(&date);
        } else {
            self.days.insert(date, record);
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    fn store_transition(&mut self, date: DateKey, next: Option<DayRecord>) -> DayState {
        self.touch();
        match next {
            Some(record) => {
                let state = record.state();
                self.days.insert(date, record);
                state
            }
            None => DayState::Available,
        }
    }

    fn fresh_record(&self, half: Half) -> Option<DayRecord> {
        match self.schema_version {
            SchemaVersion::V1 => DayState::Available.block(half).legacy_status().map(|status| {
                DayRecord::Legacy(LegacyDay {
                    status,
                    event_label: None,
                })
            }),
            SchemaVersion::V2 => DayRecord::Slotted(SlotDay::default()).transition(half, true),
        }
    }
}

fn relabel(record: DayRecord, label: Option<String>) -> DayRecord {
    let Some(label) = label else {
        return record;
    };
    match record {
        DayRecord::Legacy(mut day) => {
            day.event_label = Some(label);
            DayRecord::Legacy(day)
        }
        DayRecord::Slotted(mut day) => {
            day.event_label = Some(label);
            DayRecord::Slotted(day)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateKey {
        parse_date_key(s).unwrap()
    }

    #[test]
    fn date_keys_must_be_real_dates() {
        assert!(parse_date_key("2026-02-29").is_err());
        assert!(parse_date_key("2026-1-5").is_err());
        assert!(parse_date_key("__proto__").is_err());
        assert_eq!(date("2028-02-29").to_string(), "2028-02-29");
    }

    #[test]
    fn schema_version_serializes_as_number() {
        assert_eq!(serde_json::to_string(&SchemaVersion::V2).unwrap(), "2");
        assert_eq!(serde_json::from_str::<SchemaVersion>("1").unwrap(), SchemaVersion::V1);
        assert!(serde_json::from_str::<SchemaVersion>("3").is_err());
    }

    #[test]
    fn block_am_then_pm_then_unblock_am() {
        let mut data = AvailabilityData::new("owner");
        let day = date("2026-01-15");

        assert_eq!(data.block(day, Half::Am, None), DayState::AmBlocked);
        assert_eq!(data.block(day, Half::Pm, None), DayState::FullBlocked);
        assert_eq!(data.unblock(day, Half::Am), DayState::PmBlocked);
        assert_eq!(data.state_on(day), DayState::PmBlocked);
    }

    #[test]
    fn unblocking_last_half_removes_record() {
        let mut data = AvailabilityData::new("owner");
        let day = date("2026-01-15");

        data.block(day, Half::Pm, Some("Dentist".into()));
        assert_eq!(data.day(day).and_then(DayRecord::event_label), Some("Dentist"));
        assert_eq!(data.unblock(day, Half::Pm), DayState::Available);
        assert!(data.day(day).is_none());
    }

    #[test]
    fn unblocking_free_half_changes_nothing() {
        let mut data = AvailabilityData::new("owner");
        let day = date("2026-01-15");
        data.block(day, Half::Am, None);
        let before = data.clone();

        assert_eq!(data.unblock(day, Half::Pm), DayState::AmBlocked);
        assert_eq!(data, before);
    }

    #[test]
    fn v1_data_creates_legacy_records() {
        let mut data = AvailabilityData::new("owner");
        data.schema_version = SchemaVersion::V1;
        let day = date("2026-03-02");

        data.block(day, Half::Am, None);
        assert!(data.day(day).unwrap().is_legacy());
        assert_eq!(data.block(day, Half::Pm, None), DayState::FullBlocked);
    }
}
