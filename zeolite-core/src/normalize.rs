//! Shape normalization for day records arriving from untrusted JSON.
//!
//! Slot maps cross a string boundary on every save, where they are written as
//! arrays of `[slotKey, occupied]` pairs. Older writers and hand-edited exports
//! may instead carry a plain object. Every load and import path funnels through
//! [`ensure_maps_deserialized`] so the rest of the crate only ever sees one shape.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::data::{DateKey, parse_date_key};
use crate::day::{DayRecord, LegacyDay, LegacyStatus, SlotDay};
use crate::error::{MigrationError, ValidationError};
use crate::slot::SlotKey;

/// Property names that JavaScript writers expose through the prototype chain.
/// They are never data and are dropped wherever keys are iterated.
pub const PROTOTYPE_KEYS: &[&str] = &[
    "__proto__",
    "constructor",
    "prototype",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toString",
    "toLocaleString",
    "valueOf",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

pub fn is_prototype_key(key: &str) -> bool {
    PROTOTYPE_KEYS.contains(&key)
}

/// Rebuilds every day's `slots` field into an object map in place.
///
/// Object maps are kept, arrays of pairs are folded into an object, and any
/// other shape is removed with a warning. Prototype keys are dropped at both
/// the day and the slot level.
pub fn ensure_maps_deserialized(days: &mut Map<String, Value>) {
    drop_prototype_days(days);
    for (key, day) in days.iter_mut() {
        if !rebuild_record_slots(day) {
            warn!(date = %key, "dropping slots with unrecognised shape");
        }
    }
}

/// Like [`ensure_maps_deserialized`], but an unrecognised `slots` shape is a
/// [`ValidationError`] on `days.<date>.slots` instead of being dropped.
pub fn ensure_maps_deserialized_strict(days: &mut Map<String, Value>) -> Result<(), ValidationError> {
    drop_prototype_days(days);
    for (key, day) in days.iter_mut() {
        if !rebuild_record_slots(day) {
            return Err(ValidationError::new(
                format!("days.{key}.slots"),
                "expected an object or an array of [slot, occupied] pairs",
            ));
        }
    }
    Ok(())
}

fn drop_prototype_days(days: &mut Map<String, Value>) {
    days.retain(|key, _| {
        let keep = !is_prototype_key(key);
        if !keep {
            debug!(key = %key, "skipping prototype key in day map");
        }
        keep
    });
}

/// Rewrites one record's `slots` as an object map. Returns false when the
/// field had an unknown shape and was removed.
fn rebuild_record_slots(day: &mut Value) -> bool {
    let Some(record) = day.as_object_mut() else {
        return true;
    };
    let Some(slots) = record.remove("slots") else {
        return true;
    };
    match rebuild_slot_map(slots) {
        Some(map) => {
            record.insert("slots".to_string(), Value::Object(map));
            true
        }
        None => false,
    }
}

/// Returns the slot map for either physical representation, or `None` for
/// anything else.
fn rebuild_slot_map(slots: Value) -> Option<Map<String, Value>> {
    match slots {
        Value::Object(map) => Some(
            map.into_iter()
                .filter(|(key, _)| !is_prototype_key(key))
                .collect(),
        ),
        Value::Array(pairs) => {
            let mut map = Map::new();
            for pair in pairs {
                let Value::Array(mut entry) = pair else {
                    return None;
                };
                if entry.len() != 2 {
                    return None;
                }
                let value = entry.pop()?;
                let Value::String(key) = entry.pop()? else {
                    return None;
                };
                if !is_prototype_key(&key) {
                    map.insert(key, value);
                }
            }
            Some(map)
        }
        _ => None,
    }
}

fn is_pair_array(value: &Value) -> bool {
    value.as_array().is_some_and(|pairs| {
        pairs.iter().all(|pair| {
            pair.as_array()
                .is_some_and(|entry| entry.len() == 2 && entry[0].is_string())
        })
    })
}

/// Whether a raw day record has the version 2 shape.
///
/// Recognises `slots` as either a live object map or an array of pairs, and
/// records that carry only `fullDayBlock`.
pub fn is_slotted(record: &Map<String, Value>) -> bool {
    match record.get("slots") {
        Some(Value::Object(_)) => true,
        Some(slots) if is_pair_array(slots) => true,
        _ => record.get("fullDayBlock").is_some_and(Value::is_boolean),
    }
}

/// Decodes a single raw day record.
pub fn decode_day(key: &str, value: &Value) -> Result<DayRecord, MigrationError> {
    let Some(record) = value.as_object() else {
        return Err(MigrationError::malformed(key, "record is not an object"));
    };

    let event_label = match record.get("eventLabel") {
        None | Some(Value::Null) => None,
        Some(Value::String(label)) => Some(label.clone()),
        Some(_) => return Err(MigrationError::malformed(key, "eventLabel is not a string")),
    };

    if is_slotted(record) {
        let full_day_block = match record.get("fullDayBlock") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(MigrationError::malformed(key, "fullDayBlock is not a boolean")),
        };
        let slots = match record.get("slots").cloned() {
            None => BTreeMap::new(),
            Some(raw) => {
                let map = rebuild_slot_map(raw)
                    .ok_or_else(|| MigrationError::malformed(key, "slots has an unknown shape"))?;
                decode_slots(key, &map)?
            }
        };
        return Ok(DayRecord::Slotted(SlotDay {
            slots,
            full_day_block,
            event_label,
        }));
    }

    match record.get("status") {
        Some(status) => {
            let status: LegacyStatus = serde_json::from_value(status.clone())
                .map_err(|err| MigrationError::malformed(key, format!("status: {err}")))?;
            Ok(DayRecord::Legacy(LegacyDay {
                status,
                event_label,
            }))
        }
        None => Err(MigrationError::malformed(key, "neither slots nor status present")),
    }
}

fn decode_slots(key: &str, map: &Map<String, Value>) -> Result<BTreeMap<SlotKey, bool>, MigrationError> {
    let mut slots = BTreeMap::new();
    for (label, occupied) in map {
        if is_prototype_key(label) {
            continue;
        }
        let slot: SlotKey = label
            .parse()
            .map_err(|err: ValidationError| MigrationError::malformed(key, err.reason))?;
        let occupied = occupied
            .as_bool()
            .ok_or_else(|| MigrationError::malformed(key, format!("slot {label} is not a boolean")))?;
        slots.insert(slot, occupied);
    }
    Ok(slots)
}

/// Decodes a raw day map, dropping entries that cannot be decoded.
///
/// Each dropped entry is logged; one bad record never affects the others.
pub fn decode_days_lenient(days: &Map<String, Value>) -> BTreeMap<DateKey, DayRecord> {
    let mut decoded = BTreeMap::new();
    for (key, value) in days {
        if is_prototype_key(key) {
            continue;
        }
        let date = match parse_date_key(key) {
            Ok(date) => date,
            Err(err) => {
                warn!(key = %key, error = %err, "dropping day with invalid date key");
                continue;
            }
        };
        match decode_day(key, value) {
            Ok(record) => {
                decoded.insert(date, record);
            }
            Err(err) => warn!(error = %err, "dropping malformed day record"),
        }
    }
    decoded
}

/// Decodes a raw day map, failing on the first entry that cannot be decoded.
///
/// Prototype keys are still skipped silently.
pub fn decode_days_strict(days: &Map<String, Value>) -> Result<BTreeMap<DateKey, DayRecord>, ValidationError> {
    let mut decoded = BTreeMap::new();
    for (key, value) in days {
        if is_prototype_key(key) {
            continue;
        }
        let field = format!("days.{key}");
        let date = parse_date_key(key).map_err(|err| ValidationError::new(&field, err.reason))?;
        let record = decode_day(key, value).map_err(|err| match err {
            MigrationError::MalformedDay { reason, .. } => ValidationError::new(&field, reason),
            other => ValidationError::new(&field, other.to_string()),
        })?;
        decoded.insert(date, record);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn days(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn pair_arrays_become_maps() {
        let mut raw = days(json!({
            "2026-01-15": { "slots": [["09:00", true], ["10:00", false]], "fullDayBlock": false }
        }));
        ensure_maps_deserialized(&mut raw);
        assert_eq!(raw["2026-01-15"]["slots"], json!({ "09:00": true, "10:00": false }));
    }

    #[test]
    fn object_maps_are_kept() {
        let mut raw = days(json!({
            "2026-01-15": { "slots": { "09:00": true }, "fullDayBlock": false }
        }));
        ensure_maps_deserialized(&mut raw);
        assert_eq!(raw["2026-01-15"]["slots"], json!({ "09:00": true }));
    }

    #[test]
    fn unknown_slot_shape_is_dropped_not_fatal() {
        let mut raw = days(json!({
            "2026-01-15": { "slots": "09:00", "fullDayBlock": true },
            "2026-01-16": { "slots": [["09:00", true]], "fullDayBlock": false }
        }));
        ensure_maps_deserialized(&mut raw);
        assert!(raw["2026-01-15"].get("slots").is_none());

        let decoded = decode_days_lenient(&raw);
        assert_eq!(decoded.len(), 2);
        assert!(decoded.values().all(|record| !record.is_legacy()));
    }

    #[test]
    fn strict_normalization_rejects_unknown_slot_shapes() {
        for slots in [json!([["09:00", true], ["10:00"]]), json!(42), json!("09:00")] {
            let mut raw = days(json!({
                "2026-01-15": { "slots": slots, "fullDayBlock": false }
            }));
            let err = ensure_maps_deserialized_strict(&mut raw).unwrap_err();
            assert_eq!(err.field, "days.2026-01-15.slots");
        }

        let mut raw = days(json!({
            "__proto__": { "slots": 42 },
            "2026-01-15": { "slots": [["09:00", true]], "fullDayBlock": false }
        }));
        ensure_maps_deserialized_strict(&mut raw).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw["2026-01-15"]["slots"], json!({ "09:00": true }));
    }

    #[test]
    fn slotted_detection_accepts_both_representations() {
        let live = days(json!({ "slots": { "09:00": true }, "fullDayBlock": false }));
        let pairs = days(json!({ "slots": [["09:00", true]], "fullDayBlock": false }));
        let flag_only = days(json!({ "fullDayBlock": true }));
        let legacy = days(json!({ "status": "am" }));

        assert!(is_slotted(&live));
        assert!(is_slotted(&pairs));
        assert!(is_slotted(&flag_only));
        assert!(!is_slotted(&legacy));
    }

    #[test]
    fn prototype_keys_are_filtered() {
        let mut raw = days(json!({
            "__proto__": { "status": "full" },
            "constructor": { "status": "full" },
            "2026-01-15": { "slots": [["__proto__", true], ["09:00", true]], "fullDayBlock": false }
        }));
        ensure_maps_deserialized(&mut raw);
        let decoded = decode_days_lenient(&raw);

        assert_eq!(decoded.len(), 1);
        let record = decoded.values().next().unwrap();
        match record {
            DayRecord::Slotted(day) => assert_eq!(day.slots.len(), 1),
            _ => panic!("expected slotted record"),
        }
    }

    #[test]
    fn unknown_slot_key_is_malformed() {
        let err = decode_day("2026-01-15", &json!({ "slots": { "23:00": true } })).unwrap_err();
        assert!(matches!(err, MigrationError::MalformedDay { .. }));
    }

    #[test]
    fn lenient_decode_skips_only_bad_entries() {
        let raw = days(json!({
            "2026-01-15": { "status": "full" },
            "2026-01-16": { "status": "sometimes" },
            "2026-02-30": { "status": "am" },
            "2026-01-17": 42
        }));
        let decoded = decode_days_lenient(&raw);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn strict_decode_reports_field() {
        let raw = days(json!({ "2026-01-16": { "status": "sometimes" } }));
        let err = decode_days_strict(&raw).unwrap_err();
        assert_eq!(err.field, "days.2026-01-16");
    }

    #[test]
    fn legacy_aliases_are_accepted() {
        let record = decode_day("2026-01-15", &json!({ "status": "AMOnly", "eventLabel": "Trip" })).unwrap();
        assert_eq!(
            record,
            DayRecord::Legacy(LegacyDay {
                status: LegacyStatus::AmOnly,
                event_label: Some("Trip".into()),
            })
        );
    }
}
