//! JSON form of [`AvailabilityData`] as held in the key-value store and in
//! import/export files.
//!
//! ```json
//! {
//!   "schemaVersion": 2,
//!   "ownerId": "owner-1",
//!   "lastModified": "2026-01-15T09:30:00Z",
//!   "days": {
//!     "2026-01-15": { "slots": [["09:00", true]], "fullDayBlock": false, "eventLabel": "Offsite" },
//!     "2026-01-16": { "slots": [], "fullDayBlock": true }
//!   }
//! }
//! ```
//!
//! Version 1 records carry `{ "status": "full" | "am" | "pm" }` instead.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::debug;
use zeolite_core::normalize::{
    decode_days_lenient, decode_days_strict, ensure_maps_deserialized, ensure_maps_deserialized_strict,
};
use zeolite_core::{
    AvailabilityData, DATE_KEY_FORMAT, DayRecord, SchemaVersion, ValidationError,
};

/// Encodes `data`, writing every slot map as an array of `[slot, occupied]`
/// pairs.
pub fn encode_document(data: &AvailabilityData) -> Value {
    let days: Map<String, Value> = data
        .days()
        .iter()
        .map(|(date, record)| (date.format(DATE_KEY_FORMAT).to_string(), encode_day(record)))
        .collect();

    json!({
        "schemaVersion": data.schema_version,
        "ownerId": data.owner_id,
        "lastModified": data.last_modified.to_rfc3339(),
        "days": days,
    })
}

fn encode_day(record: &DayRecord) -> Value {
    let mut out = match record {
        DayRecord::Legacy(day) => json!({ "status": day.status }),
        DayRecord::Slotted(day) => {
            let pairs: Vec<Value> = day
                .slots
                .iter()
                .map(|(slot, occupied)| json!([slot, occupied]))
                .collect();
            json!({ "slots": pairs, "fullDayBlock": day.full_day_block })
        }
    };
    if let (Some(label), Some(map)) = (record.event_label(), out.as_object_mut()) {
        map.insert("eventLabel".to_string(), Value::String(label.to_string()));
    }
    out
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_version(value: Option<&Value>) -> Result<SchemaVersion, ValidationError> {
    match value {
        // Documents written before versioning was introduced carry no tag.
        None => Ok(SchemaVersion::V1),
        Some(value) => value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| ValidationError::new("schemaVersion", "not a small integer"))
            .and_then(SchemaVersion::try_from),
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::new("document", "expected a JSON object")),
        Err(err) => Err(ValidationError::new("document", err.to_string())),
    }
}

/// Decodes a stored document.
///
/// Document-level damage (invalid JSON, unknown schema version) is an error.
/// Individual day records that cannot be decoded are dropped and logged.
pub fn decode_document(raw: &str, fallback_owner: &str) -> Result<AvailabilityData, ValidationError> {
    let mut doc = parse_object(raw)?;

    let version = parse_version(doc.get("schemaVersion"))?;
    let owner_id = doc
        .get("ownerId")
        .and_then(Value::as_str)
        .unwrap_or(fallback_owner)
        .to_string();
    let last_modified = doc
        .get("lastModified")
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);

    let days = match doc.remove("days") {
        Some(Value::Object(mut days)) => {
            ensure_maps_deserialized(&mut days);
            decode_days_lenient(&days)
        }
        None | Some(Value::Null) => Default::default(),
        Some(_) => return Err(ValidationError::new("days", "expected an object")),
    };

    debug!(%version, days = days.len(), "decoded availability document");
    Ok(AvailabilityData::from_parts(version, owner_id, last_modified, days))
}

/// Validates an externally supplied document before it is merged.
///
/// Unlike [`decode_document`], any malformed day rejects the whole payload,
/// and every record must match the declared schema version.
pub fn validate_document(raw: &str) -> Result<AvailabilityData, ValidationError> {
    let mut doc = parse_object(raw)?;

    let version = match doc.get("schemaVersion") {
        None => return Err(ValidationError::new("schemaVersion", "missing")),
        some => parse_version(some)?,
    };
    let owner_id = match doc.get("ownerId") {
        Some(Value::String(owner)) if !owner.trim().is_empty() => owner.clone(),
        Some(_) => return Err(ValidationError::new("ownerId", "expected a non-empty string")),
        None => return Err(ValidationError::new("ownerId", "missing")),
    };
    let last_modified = match doc.get("lastModified") {
        None => Utc::now(),
        Some(value) => parse_timestamp(value).ok_or_else(|| {
            ValidationError::new("lastModified", "expected an RFC 3339 string or epoch milliseconds")
        })?,
    };
    let mut days = match doc.remove("days") {
        Some(Value::Object(days)) => days,
        Some(_) => return Err(ValidationError::new("days", "expected an object")),
        None => return Err(ValidationError::new("days", "missing")),
    };

    ensure_maps_deserialized_strict(&mut days)?;
    let days = decode_days_strict(&days)?;

    for (date, record) in &days {
        let expected_legacy = version == SchemaVersion::V1;
        if record.is_legacy() != expected_legacy {
            return Err(ValidationError::new(
                format!("days.{}", date.format(DATE_KEY_FORMAT)),
                format!("record does not match schema {version}"),
            ));
        }
    }

    Ok(AvailabilityData::from_parts(version, owner_id, last_modified, days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeolite_core::{Half, SlotDay, SlotKey, parse_date_key};

    fn sample() -> AvailabilityData {
        let mut data = AvailabilityData::new("owner-1");
        data.block(parse_date_key("2026-01-15").unwrap(), Half::Am, Some("Offsite".into()));
        data.block(parse_date_key("2026-01-16").unwrap(), Half::Am, None);
        data.block(parse_date_key("2026-01-16").unwrap(), Half::Pm, None);
        data
    }

    #[test]
    fn slots_are_written_as_pairs() {
        let doc = encode_document(&sample());
        let day = &doc["days"]["2026-01-15"];
        assert!(day["slots"].is_array());
        assert_eq!(day["slots"][0], json!(["06:00", true]));
        assert_eq!(day["eventLabel"], "Offsite");
        assert_eq!(doc["days"]["2026-01-16"]["fullDayBlock"], true);
        assert_eq!(doc["schemaVersion"], 2);
    }

    #[test]
    fn encode_decode_preserves_days() {
        let data = sample();
        let raw = encode_document(&data).to_string();
        let back = decode_document(&raw, "someone-else").unwrap();
        assert_eq!(back.days(), data.days());
        assert_eq!(back.owner_id, "owner-1");
    }

    #[test]
    fn untagged_documents_are_v1() {
        let data = decode_document(r#"{"days":{"2026-01-15":{"status":"pm"}}}"#, "owner").unwrap();
        assert_eq!(data.schema_version, SchemaVersion::V1);
        assert_eq!(data.owner_id, "owner");
    }

    #[test]
    fn epoch_millis_timestamp_is_accepted() {
        let data = decode_document(r#"{"schemaVersion":2,"lastModified":1768469400000,"days":{}}"#, "o").unwrap();
        assert_eq!(data.last_modified.timestamp(), 1768469400);
    }

    #[test]
    fn broken_json_is_a_document_error() {
        assert_eq!(decode_document("{not json", "o").unwrap_err().field, "document");
        assert_eq!(decode_document("[1,2]", "o").unwrap_err().field, "document");
    }

    #[test]
    fn validation_rejects_mismatched_records() {
        let raw = r#"{"schemaVersion":1,"ownerId":"o","days":{"2026-01-15":{"slots":[],"fullDayBlock":true}}}"#;
        assert_eq!(validate_document(raw).unwrap_err().field, "days.2026-01-15");
    }

    #[test]
    fn validation_requires_owner_and_version() {
        assert_eq!(validate_document(r#"{"ownerId":"o","days":{}}"#).unwrap_err().field, "schemaVersion");
        assert_eq!(validate_document(r#"{"schemaVersion":2,"days":{}}"#).unwrap_err().field, "ownerId");
        assert_eq!(validate_document(r#"{"schemaVersion":7,"ownerId":"o","days":{}}"#).unwrap_err().field, "schemaVersion");
        assert_eq!(validate_document(r#"{"schemaVersion":2,"ownerId":"o"}"#).unwrap_err().field, "days");
    }

    #[test]
    fn validation_rejects_unknown_slot_shapes() {
        let raw = r#"{"schemaVersion":2,"ownerId":"o","days":{"2026-01-15":{"slots":42,"fullDayBlock":false}}}"#;
        assert_eq!(validate_document(raw).unwrap_err().field, "days.2026-01-15.slots");
    }

    #[test]
    fn validation_accepts_live_maps() {
        let raw = r#"{"schemaVersion":2,"ownerId":"o","days":{"2026-01-15":{"slots":{"09:00":true},"fullDayBlock":false}}}"#;
        let data = validate_document(raw).unwrap();
        let expected = DayRecord::Slotted(SlotDay {
            slots: [(SlotKey::from_hour(9).unwrap(), true)].into_iter().collect(),
            full_day_block: false,
            event_label: None,
        });
        assert_eq!(data.day(parse_date_key("2026-01-15").unwrap()), Some(&expected));
    }
}
