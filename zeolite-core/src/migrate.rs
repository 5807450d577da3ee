//! Conversion between schema versions.
//!
//! Upgrading is lossless. Downgrading is only defined for slot patterns that
//! line up with a whole half of the window; anything else is refused with
//! [`MigrationError::UnsupportedDowngrade`].

use std::collections::BTreeMap;
use tracing::debug;

use crate::data::{AvailabilityData, DateKey, SchemaVersion};
use crate::day::{DayRecord, LegacyDay, LegacyStatus, SlotDay};
use crate::error::MigrationError;
use crate::slot::{Half, SLOT_COUNT};

/// Converts a version 1 day into its version 2 equivalent.
pub fn upgrade_day(day: &LegacyDay) -> SlotDay {
    let (full_day_block, slots) = match day.status {
        LegacyStatus::Full => (true, BTreeMap::new()),
        LegacyStatus::AmOnly => (false, Half::Am.slots().map(|slot| (slot, true)).collect()),
        LegacyStatus::PmOnly => (false, Half::Pm.slots().map(|slot| (slot, true)).collect()),
    };
    SlotDay {
        slots,
        full_day_block,
        event_label: day.event_label.clone(),
    }
}

/// Converts a version 2 day into version 1.
///
/// Returns `Ok(None)` for a day with nothing occupied, since version 1 has no
/// record for an available day.
pub fn downgrade_day(date: DateKey, day: &SlotDay) -> Result<Option<LegacyDay>, MigrationError> {
    let occupied = day.occupied_slots();
    let status = if day.full_day_block || occupied.len() == SLOT_COUNT {
        Some(LegacyStatus::Full)
    } else if occupied.is_empty() {
        None
    } else if occupied.iter().copied().eq(Half::Am.slots()) {
        Some(LegacyStatus::AmOnly)
    } else if occupied.iter().copied().eq(Half::Pm.slots()) {
        Some(LegacyStatus::PmOnly)
    } else {
        return Err(MigrationError::UnsupportedDowngrade { date, occupied });
    };

    Ok(status.map(|status| LegacyDay {
        status,
        event_label: day.event_label.clone(),
    }))
}

/// Brings every record up to version 2. Records already at version 2 are
/// left untouched, so upgrading twice equals upgrading once.
pub fn upgrade(data: AvailabilityData) -> AvailabilityData {
    let owner_id = data.owner_id.clone();
    let last_modified = data.last_modified;

    let mut upgraded = 0usize;
    let days = data
        .into_days()
        .into_iter()
        .map(|(date, record)| match record {
            DayRecord::Legacy(day) => {
                upgraded += 1;
                (date, DayRecord::Slotted(upgrade_day(&day)))
            }
            slotted => (date, slotted),
        })
        .collect();

    if upgraded > 0 {
        debug!(upgraded, "upgraded legacy day records");
    }

    AvailabilityData::from_parts(SchemaVersion::V2, owner_id, last_modified, days)
}

/// Rewrites every record to version 1, failing on the first day whose slot
/// pattern has no version 1 form.
pub fn downgrade(data: AvailabilityData) -> Result<AvailabilityData, MigrationError> {
    let owner_id = data.owner_id.clone();
    let last_modified = data.last_modified;

    let mut days = BTreeMap::new();
    for (date, record) in data.into_days() {
        let legacy = match record {
            DayRecord::Legacy(day) => Some(day),
            DayRecord::Slotted(day) => downgrade_day(date, &day)?,
        };
        if let Some(day) = legacy {
            days.insert(date, DayRecord::Legacy(day));
        }
    }

    Ok(AvailabilityData::from_parts(SchemaVersion::V1, owner_id, last_modified, days))
}

/// Migrates `data` to `target`.
pub fn migrate(data: AvailabilityData, target: SchemaVersion) -> Result<AvailabilityData, MigrationError> {
    match target {
        SchemaVersion::V2 => Ok(upgrade(data)),
        SchemaVersion::V1 => downgrade(data),
    }
}
