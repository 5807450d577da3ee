use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::ValidationError;

/// First hour covered by the daily window.
pub const WINDOW_START_HOUR: u8 = 6;

/// Number of hourly slots in the daily window (06:00 to 22:00).
pub const SLOT_COUNT: usize = 16;

/// Number of slots in each half of the window.
pub const HALF_LEN: usize = SLOT_COUNT / 2;

/// One hourly slot of the daily window, labelled by its start time (`"06:00"`).
///
/// The set of keys is closed: only the [`SLOT_COUNT`] hours starting at
/// [`WINDOW_START_HOUR`] exist. Keys are serialized as their label string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey(u8);

impl SlotKey {
    /// Returns the slot at `index` within the window, if any.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < SLOT_COUNT).then(|| SlotKey(index as u8))
    }

    /// Returns the slot starting at `hour`, if it lies inside the window.
    pub fn from_hour(hour: u8) -> Option<Self> {
        hour.checked_sub(WINDOW_START_HOUR)
            .and_then(|index| Self::from_index(index as usize))
    }

    /// Iterates over every slot of the window in order.
    pub fn all() -> impl Iterator<Item = SlotKey> {
        (0..SLOT_COUNT as u8).map(SlotKey)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn hour(self) -> u8 {
        WINDOW_START_HOUR + self.0
    }

    pub fn half(self) -> Half {
        if self.index() < HALF_LEN {
            Half::Am
        } else {
            Half::Pm
        }
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotKey({})", self)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.hour())
    }
}

impl FromStr for SlotKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::new("slot", format!("unknown slot key {s:?}"));

        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        if hour.len() != 2 || minute != "00" {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        SlotKey::from_hour(hour).ok_or_else(invalid)
    }
}

impl Serialize for SlotKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SlotKeyVisitor;

        impl serde::de::Visitor<'_> for SlotKeyVisitor {
            type Value = SlotKey;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an hourly slot label such as \"09:00\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(|err: ValidationError| E::custom(err.reason))
            }
        }

        deserializer.deserialize_str(SlotKeyVisitor)
    }
}

/// One half of the daily window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Half {
    Am,
    Pm,
}

impl Half {
    /// Slot indices covered by this half.
    pub fn range(self) -> Range<usize> {
        match self {
            Half::Am => 0..HALF_LEN,
            Half::Pm => HALF_LEN..SLOT_COUNT,
        }
    }

    pub fn slots(self) -> impl Iterator<Item = SlotKey> {
        self.range().filter_map(SlotKey::from_index)
    }

    pub fn other(self) -> Half {
        match self {
            Half::Am => Half::Pm,
            Half::Pm => Half::Am,
        }
    }
}

impl FromStr for Half {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "am" | "morning" => Ok(Half::Am),
            "pm" | "afternoon" => Ok(Half::Pm),
            _ => Err(ValidationError::new("half", format!("expected am or pm, got {s:?}"))),
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::Am => write!(f, "am"),
            Half::Pm => write!(f, "pm"),
        }
    }
}
