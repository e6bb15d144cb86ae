/// Observation normalizer: raw broker readings to typed `Observation`s.
///
/// Pure and total. Bad timestamps become the Unix epoch and are left for
/// the staleness check to discard; unknown sources become `Sensor`.

use chrono::{DateTime, Utc};

use crate::model::{Observation, RawObservation, SourceMarkers};

/// Parses an RFC 3339 timestamp, falling back to the Unix epoch.
pub fn parse_observed_at(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Normalizes one raw reading.
pub fn normalize_one(raw: &RawObservation, markers: &SourceMarkers) -> Observation {
    Observation {
        value: raw.value,
        observed_at: parse_observed_at(&raw.timestamp),
        source_tag: raw.source.clone(),
        category: markers.classify(&raw.source),
    }
}

/// Normalizes a beach's raw readings, preserving input order and length.
pub fn normalize(raw: &[RawObservation], markers: &SourceMarkers) -> Vec<Observation> {
    raw.iter().map(|r| normalize_one(r, markers)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceCategory;
    use chrono::TimeZone;

    fn raw(timestamp: &str, source: &str, value: f64) -> RawObservation {
        RawObservation {
            timestamp: timestamp.to_string(),
            source: source.to_string(),
            value,
        }
    }

    #[test]
    fn test_parse_offset_timestamp_converts_to_utc() {
        let dt = parse_observed_at("2022-06-27T17:00:00+02:00");
        assert_eq!(dt, Utc.with_ymd_and_hms(2022, 6, 27, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_malformed_timestamp_becomes_epoch() {
        for bad in ["", "yesterday", "2022-06-27", "2022-06-27T17:00:00"] {
            assert_eq!(
                parse_observed_at(bad),
                DateTime::<Utc>::default(),
                "'{}' should degrade to epoch",
                bad
            );
        }
    }

    #[test]
    fn test_normalize_keeps_every_record() {
        let input = vec![
            raw("2022-06-27T17:00:00+02:00", "https://www.smhi.se/", 18.8),
            raw("not a date", "https://badplatsen.havochvatten.se/badplatsen/api", 17.0),
            raw("2022-06-27T16:00:00Z", "urn:ngsi-ld:Device:se:servanet:lora:sk-elt-temp-02", 19.1),
        ];
        let out = normalize(&input, &SourceMarkers::default());

        assert_eq!(out.len(), 3, "normalizer must not filter");
        assert_eq!(out[0].category, SourceCategory::SatelliteModel);
        assert_eq!(out[1].category, SourceCategory::ManualSample);
        assert_eq!(out[1].observed_at, DateTime::<Utc>::default());
        assert_eq!(out[2].category, SourceCategory::Sensor);
        assert_eq!(out[2].value, 19.1);
        assert_eq!(out[2].source_tag, "urn:ngsi-ld:Device:se:servanet:lora:sk-elt-temp-02");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert!(normalize(&[], &SourceMarkers::default()).is_empty());
    }
}
