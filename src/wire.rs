//! JSON decoding helpers for payloads exchanged between the services.
//!
//! Field names are matched case-insensitively on read: every object key is
//! folded (lowercased, `_` and `-` removed) before deserialization, and the
//! model types declare their deserialize names in folded form. Timestamps are
//! accepted with any UTC offset, as naive date-times, or as bare dates, and are
//! always normalized to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Naive formats tried after RFC 3339, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Folds a JSON key to its case- and separator-insensitive form.
///
/// `observedOn`, `ObservedOn`, `observed_on` and `OBSERVEDON` all fold to
/// `observedon`.
pub fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Recursively folds every object key in `value`.
pub fn fold_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (fold_key(&key), fold_keys(inner)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
        other => other,
    }
}

/// Deserializes `value` into `T` with case-insensitive field names.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(fold_keys(value))
}

/// Parses a timestamp leniently and converts it to UTC.
///
/// Returns `None` if no supported format matches.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` adapter for [`parse_utc`].
pub fn utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw).ok_or_else(|| D::Error::custom(format!("unrecognized timestamp: {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PrecipitationKind, PrecipitationObservation, TemperatureObservation};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_fold_key_ignores_case_and_separators() {
        assert_eq!(fold_key("observedOn"), "observedon");
        assert_eq!(fold_key("ObservedOn"), "observedon");
        assert_eq!(fold_key("observed_on"), "observedon");
        assert_eq!(fold_key("AVERAGE-HIGH-F"), "averagehighf");
    }

    #[test]
    fn test_offset_timestamp_is_converted_to_utc() {
        // 08:00 at -05:00 is 13:00 UTC.
        let parsed = parse_utc("2024-05-01T08:00:00.000-05:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_timestamps_are_treated_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap();
        assert_eq!(parse_utc("2024-05-01T06:30:00"), Some(expected));
        assert_eq!(parse_utc("2024-05-01 06:30:00"), Some(expected));
        assert_eq!(
            parse_utc("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparseable_timestamp_is_rejected() {
        assert_eq!(parse_utc("yesterday"), None);
        assert_eq!(parse_utc(""), None);
    }

    #[test]
    fn test_decode_temperature_with_mixed_case_keys() {
        let value = json!({
            "Zone": "11111",
            "LOW": 30,
            "high": 50.5,
            "ObservedOn": "2024-05-01T00:00:00Z"
        });
        let obs: TemperatureObservation = decode(value).unwrap();
        assert_eq!(obs.zone, "11111");
        assert_eq!(obs.low, "30".parse().unwrap());
        assert_eq!(obs.high, "50.5".parse().unwrap());
    }

    #[test]
    fn test_decode_precipitation_array() {
        let value = json!([
            {"zone": "11111", "amount": 2, "kind": "rain", "observedOn": "2024-05-01"},
            {"zone": "11111", "amount": 0, "kind": "None", "observed_on": "2024-05-02"}
        ]);
        let records: Vec<PrecipitationObservation> = decode(value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, PrecipitationKind::Rain);
        assert_eq!(records[1].kind, PrecipitationKind::None);
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let value = json!({"zone": "1", "amount": 1, "kind": "hail", "observedOn": "2024-05-01"});
        assert!(decode::<PrecipitationObservation>(value).is_err());
    }
}
