use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::slot::{Half, SLOT_COUNT, SlotKey};

/// Coarse per-day status of schema version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyStatus {
    #[serde(rename = "full", alias = "Full")]
    Full,
    #[serde(rename = "am", alias = "AMOnly")]
    AmOnly,
    #[serde(rename = "pm", alias = "PMOnly")]
    PmOnly,
}

impl LegacyStatus {
    pub fn state(self) -> DayState {
        match self {
            LegacyStatus::Full => DayState::FullBlocked,
            LegacyStatus::AmOnly => DayState::AmBlocked,
            LegacyStatus::PmOnly => DayState::PmBlocked,
        }
    }
}

/// A blocked day in schema version 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDay {
    pub status: LegacyStatus,
    pub event_label: Option<String>,
}

/// A blocked day in schema version 2.
///
/// `full_day_block` wins over `slots`: when set, every slot counts as occupied
/// regardless of the map's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotDay {
    pub slots: BTreeMap<SlotKey, bool>,
    pub full_day_block: bool,
    pub event_label: Option<String>,
}

impl SlotDay {
    pub fn is_occupied(&self, slot: SlotKey) -> bool {
        self.full_day_block || self.slots.get(&slot).copied().unwrap_or(false)
    }

    pub fn half_blocked(&self, half: Half) -> bool {
        self.full_day_block || half.slots().all(|slot| self.is_occupied(slot))
    }

    /// Occupied slots in window order, ignoring `full_day_block`.
    pub fn occupied_slots(&self) -> Vec<SlotKey> {
        self.slots
            .iter()
            .filter(|(_, occupied)| **occupied)
            .map(|(slot, _)| *slot)
            .collect()
    }

    fn is_empty(&self) -> bool {
        !self.full_day_block && self.slots.values().all(|occupied| !occupied)
    }
}

/// A stored day record in either schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayRecord {
    Legacy(LegacyDay),
    Slotted(SlotDay),
}

impl DayRecord {
    /// True when the whole day is blocked. Never looks at individual slots.
    pub fn is_full(&self) -> bool {
        match self {
            DayRecord::Legacy(day) => day.status == LegacyStatus::Full,
            DayRecord::Slotted(day) => day.full_day_block,
        }
    }

    /// Whether `slot` is occupied. Legacy records are approximated from their
    /// AM/PM status.
    pub fn is_occupied(&self, slot: SlotKey) -> bool {
        match self {
            DayRecord::Legacy(day) => match day.status {
                LegacyStatus::Full => true,
                LegacyStatus::AmOnly => slot.half() == Half::Am,
                LegacyStatus::PmOnly => slot.half() == Half::Pm,
            },
            DayRecord::Slotted(day) => day.is_occupied(slot),
        }
    }

    pub fn state(&self) -> DayState {
        match self {
            DayRecord::Legacy(day) => day.status.state(),
            DayRecord::Slotted(day) => {
                if day.full_day_block {
                    DayState::FullBlocked
                } else {
                    DayState::from_halves(day.half_blocked(Half::Am), day.half_blocked(Half::Pm))
                }
            }
        }
    }

    pub fn event_label(&self) -> Option<&str> {
        match self {
            DayRecord::Legacy(day) => day.event_label.as_deref(),
            DayRecord::Slotted(day) => day.event_label.as_deref(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, DayRecord::Legacy(_))
    }

    /// True when the record blocks nothing at all.
    pub(crate) fn is_vacant(&self) -> bool {
        match self {
            DayRecord::Legacy(_) => false,
            DayRecord::Slotted(day) => day.is_empty(),
        }
    }

    /// Applies a block or unblock of `half`, keeping the record's schema.
    ///
    /// Returns `None` when the day becomes fully available.
    pub(crate) fn transition(self, half: Half, block: bool) -> Option<DayRecord> {
        if !block && !self.state().is_blocked(half) {
            return Some(self);
        }
        match self {
            DayRecord::Legacy(day) => {
                let current = day.status.state();
                let next = if block {
                    current.block(half)
                } else {
                    current.unblock(half)
                };
                next.legacy_status().map(|status| {
                    DayRecord::Legacy(LegacyDay {
                        status,
                        event_label: day.event_label,
                    })
                })
            }
            DayRecord::Slotted(mut day) => {
                if block {
                    block_half(&mut day, half);
                } else {
                    unblock_half(&mut day, half);
                }
                (!day.is_empty()).then_some(DayRecord::Slotted(day))
            }
        }
    }
}

fn block_half(day: &mut SlotDay, half: Half) {
    if day.full_day_block {
        return;
    }
    for slot in half.slots() {
        day.slots.insert(slot, true);
    }
    if day.slots.values().filter(|occupied| **occupied).count() == SLOT_COUNT {
        day.full_day_block = true;
        day.slots.clear();
    }
}

fn unblock_half(day: &mut SlotDay, half: Half) {
    if day.full_day_block {
        day.full_day_block = false;
        day.slots = half.other().slots().map(|slot| (slot, true)).collect();
        return;
    }
    for slot in half.slots() {
        day.slots.remove(&slot);
    }
}

/// Day-level availability state.
///
/// The machine is cyclic: any state can be reached again by blocking or
/// unblocking halves. Unblocking a half that is not blocked leaves the state
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    Available,
    AmBlocked,
    PmBlocked,
    FullBlocked,
}

impl DayState {
    pub fn from_halves(am: bool, pm: bool) -> Self {
        match (am, pm) {
            (false, false) => DayState::Available,
            (true, false) => DayState::AmBlocked,
            (false, true) => DayState::PmBlocked,
            (true, true) => DayState::FullBlocked,
        }
    }

    pub fn is_blocked(self, half: Half) -> bool {
        match half {
            Half::Am => matches!(self, DayState::AmBlocked | DayState::FullBlocked),
            Half::Pm => matches!(self, DayState::PmBlocked | DayState::FullBlocked),
        }
    }

    pub fn block(self, half: Half) -> Self {
        let (am, pm) = self.halves();
        match half {
            Half::Am => Self::from_halves(true, pm),
            Half::Pm => Self::from_halves(am, true),
        }
    }

    pub fn unblock(self, half: Half) -> Self {
        let (am, pm) = self.halves();
        match half {
            Half::Am => Self::from_halves(false, pm),
            Half::Pm => Self::from_halves(am, false),
        }
    }

    fn halves(self) -> (bool, bool) {
        (self.is_blocked(Half::Am), self.is_blocked(Half::Pm))
    }

    pub(crate) fn legacy_status(self) -> Option<LegacyStatus> {
        match self {
            DayState::Available => None,
            DayState::AmBlocked => Some(LegacyStatus::AmOnly),
            DayState::PmBlocked => Some(LegacyStatus::PmOnly),
            DayState::FullBlocked => Some(LegacyStatus::Full),
        }
    }
}

impl fmt::Display for DayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayState::Available => "available",
            DayState::AmBlocked => "am blocked",
            DayState::PmBlocked => "pm blocked",
            DayState::FullBlocked => "full blocked",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_transitions() {
        use DayState::*;

        assert_eq!(Available.block(Half::Am), AmBlocked);
        assert_eq!(Available.block(Half::Pm), PmBlocked);
        assert_eq!(AmBlocked.block(Half::Pm), FullBlocked);
        assert_eq!(PmBlocked.block(Half::Am), FullBlocked);
        assert_eq!(FullBlocked.unblock(Half::Am), PmBlocked);
        assert_eq!(FullBlocked.unblock(Half::Pm), AmBlocked);
        assert_eq!(AmBlocked.unblock(Half::Am), Available);
        assert_eq!(PmBlocked.unblock(Half::Pm), Available);
    }

    #[test]
    fn unblocking_free_half_is_noop() {
        assert_eq!(DayState::AmBlocked.unblock(Half::Pm), DayState::AmBlocked);
        assert_eq!(DayState::Available.unblock(Half::Am), DayState::Available);
    }

    #[test]
    fn full_day_block_overrides_slots() {
        let day = SlotDay {
            slots: BTreeMap::new(),
            full_day_block: true,
            event_label: None,
        };
        assert!(SlotKey::all().all(|slot| day.is_occupied(slot)));
        assert_eq!(DayRecord::Slotted(day).state(), DayState::FullBlocked);
    }

    #[test]
    fn partial_pattern_is_available_at_day_level() {
        let mut day = SlotDay::default();
        day.slots.insert(SlotKey::from_hour(10).unwrap(), true);
        let record = DayRecord::Slotted(day);
        assert_eq!(record.state(), DayState::Available);
        assert!(record.is_occupied(SlotKey::from_hour(10).unwrap()));
        assert!(!record.is_occupied(SlotKey::from_hour(11).unwrap()));
    }

    #[test]
    fn slotted_transitions_collapse_to_full_and_back() {
        let record = DayRecord::Slotted(SlotDay::default());
        let record = record.transition(Half::Am, true).unwrap();
        let record = record.transition(Half::Pm, true).unwrap();
        match &record {
            DayRecord::Slotted(day) => {
                assert!(day.full_day_block);
                assert!(day.slots.is_empty());
            }
            _ => panic!("expected slotted record"),
        }

        let record = record.transition(Half::Am, false).unwrap();
        assert_eq!(record.state(), DayState::PmBlocked);
        assert!(record.transition(Half::Pm, false).is_none());
    }

    #[test]
    fn unblocking_partial_half_leaves_slots() {
        let mut day = SlotDay::default();
        day.slots.insert(SlotKey::from_hour(10).unwrap(), true);
        let record = DayRecord::Slotted(day.clone());
        assert_eq!(record.transition(Half::Am, false), Some(DayRecord::Slotted(day)));
    }

    #[test]
    fn legacy_transitions_keep_label() {
        let record = DayRecord::Legacy(LegacyDay {
            status: LegacyStatus::AmOnly,
            event_label: Some("Offsite".into()),
        });
        let record = record.transition(Half::Pm, true).unwrap();
        assert_eq!(record.state(), DayState::FullBlocked);
        assert_eq!(record.event_label(), Some("Offsite"));
        assert!(record.is_legacy());
    }
}
