/// Selection cascade: the single current temperature for a beach.
///
/// Tiers are tried in `SourceCategory::PRIORITY` order. Within a tier the
/// latest observation is the candidate; the first non-stale candidate wins
/// and lower tiers are never consulted, however fresh they are.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::ingest::normalize::normalize;
use crate::model::{
    Observation, RawObservation, SelectedTemperature, SourceCategory, SourceMarkers, TemperatureUpdate,
};
use crate::selection::staleness::StalenessPolicy;

/// Latest observation of `category`. On equal timestamps the first one
/// encountered is kept.
pub fn latest_in_category(observations: &[Observation], category: SourceCategory) -> Option<&Observation> {
    observations
        .iter()
        .filter(|o| o.category == category)
        .reduce(|best, o| if o.observed_at > best.observed_at { o } else { best })
}

/// Picks the authoritative current temperature, or `None` when every tier is
/// empty or stale.
pub fn select_current(
    observations: &[Observation],
    now: DateTime<Utc>,
    policy: &StalenessPolicy,
) -> Option<SelectedTemperature> {
    SourceCategory::PRIORITY.iter().find_map(|&category| {
        latest_in_category(observations, category)
            .filter(|o| !policy.is_stale(category, o.observed_at, now))
            .map(SelectedTemperature::from)
    })
}

/// Normalizes and selects for a single beach's raw readings.
pub fn resolve(
    raw: &[RawObservation],
    now: DateTime<Utc>,
    policy: &StalenessPolicy,
    markers: &SourceMarkers,
) -> TemperatureUpdate {
    select_current(&normalize(raw, markers), now, policy).into()
}

/// Resolves every beach in a fetch result. Output is ordered by beach id.
pub fn resolve_all(
    raw_by_beach: &HashMap<String, Vec<RawObservation>>,
    now: DateTime<Utc>,
    policy: &StalenessPolicy,
    markers: &SourceMarkers,
) -> BTreeMap<String, TemperatureUpdate> {
    raw_by_beach
        .iter()
        .map(|(id, raw)| (id.clone(), resolve(raw, now, policy, markers)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const SENSOR: &str = "urn:ngsi-ld:Device:se:servanet:lora:sk-elt-temp-16";
    const SMHI: &str = "https://www.smhi.se/";
    const HAV: &str = "https://badplatsen.havochvatten.se/badplatsen/api";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 3, 12, 0, 0).unwrap()
    }

    fn obs(value: f64, hours_ago: i64, source: &str) -> Observation {
        Observation {
            value,
            observed_at: now() - Duration::hours(hours_ago),
            source_tag: source.to_string(),
            category: SourceCategory::classify(source),
        }
    }

    fn select(observations: &[Observation]) -> Option<SelectedTemperature> {
        select_current(observations, now(), &StalenessPolicy::default())
    }

    #[test]
    fn test_fresh_sensor_is_selected() {
        let selected = select(&[obs(18.2, 1, SENSOR)]).expect("fresh sensor should win");
        assert_eq!(selected.value, 18.2);
        assert_eq!(selected.category, SourceCategory::Sensor);
        assert_eq!(selected.source_tag, SENSOR);
    }

    #[test]
    fn test_stale_sensor_falls_back_to_satellite() {
        let selected = select(&[obs(16.0, 5, SENSOR), obs(17.5, 10, SMHI)]).expect("satellite should win");
        assert_eq!(selected.value, 17.5);
        assert_eq!(selected.category, SourceCategory::SatelliteModel);
    }

    #[test]
    fn test_everything_stale_yields_none() {
        let observations = [obs(16.0, 5, SENSOR), obs(17.5, 13, SMHI), obs(15.0, 25, HAV)];
        assert!(select(&observations).is_none());
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(select(&[]).is_none());
    }

    #[test]
    fn test_equal_timestamps_first_encountered_wins() {
        let observations = [obs(18.0, 1, SENSOR), obs(19.0, 1, "urn:ngsi-ld:Device:other")];
        let selected = select(&observations).expect("one sensor should win");
        assert_eq!(selected.value, 18.0, "tie must resolve to the first input");
    }

    #[test]
    fn test_fresh_sensor_beats_fresher_lower_tiers() {
        let observations = [obs(15.0, 0, SMHI), obs(14.0, 0, HAV), obs(18.0, 3, SENSOR)];
        let selected = select(&observations).unwrap();
        assert_eq!(selected.category, SourceCategory::Sensor);
        assert_eq!(selected.value, 18.0);
    }

    #[test]
    fn test_satellite_beats_manual_when_sensors_absent() {
        let observations = [obs(14.0, 1, HAV), obs(15.0, 11, SMHI)];
        let selected = select(&observations).unwrap();
        assert_eq!(selected.category, SourceCategory::SatelliteModel);
    }

    #[test]
    fn test_manual_sample_is_last_resort() {
        let observations = [obs(16.0, 6, SENSOR), obs(17.5, 20, SMHI), obs(14.5, 20, HAV)];
        let selected = select(&observations).unwrap();
        assert_eq!(selected.category, SourceCategory::ManualSample);
        assert_eq!(selected.value, 14.5);
    }

    #[test]
    fn test_only_latest_in_tier_is_considered() {
        // The latest sensor reading is the candidate even if an older one
        // has a different value; ordering of input is irrelevant.
        let observations = [obs(10.0, 3, SENSOR), obs(12.0, 1, SENSOR), obs(11.0, 2, SENSOR)];
        assert_eq!(select(&observations).unwrap().value, 12.0);
    }

    #[test]
    fn test_unparsed_timestamps_never_win() {
        let mut bad = obs(30.0, 0, SENSOR);
        bad.observed_at = DateTime::<Utc>::default();
        let observations = [bad, obs(17.0, 2, SMHI)];
        let selected = select(&observations).unwrap();
        assert_eq!(selected.value, 17.0);
    }

    #[test]
    fn test_result_is_always_an_input() {
        let observations = [
            obs(18.0, 6, SENSOR),
            obs(18.5, 2, SMHI),
            obs(17.0, 2, SMHI),
            obs(19.0, 30, HAV),
        ];
        for n in 0..=observations.len() {
            if let Some(selected) = select(&observations[..n]) {
                assert!(
                    observations[..n].iter().any(|o| SelectedTemperature::from(o) == selected),
                    "selection {:?} was not one of the inputs",
                    selected
                );
            }
        }
    }

    #[test]
    fn test_resolve_all_sets_and_clears() {
        let fresh = (now() - Duration::hours(1)).to_rfc3339();
        let old = (now() - Duration::hours(48)).to_rfc3339();

        let mut input = HashMap::new();
        input.insert(
            "beach-a".to_string(),
            vec![RawObservation { timestamp: fresh, source: SENSOR.to_string(), value: 18.2 }],
        );
        input.insert(
            "beach-b".to_string(),
            vec![RawObservation { timestamp: old, source: HAV.to_string(), value: 12.0 }],
        );
        input.insert("beach-c".to_string(), vec![]);

        let out = resolve_all(&input, now(), &StalenessPolicy::default(), &SourceMarkers::default());

        assert_eq!(out.len(), 3);
        assert!(matches!(&out["beach-a"], TemperatureUpdate::Set(t) if t.value == 18.2));
        assert_eq!(out["beach-b"], TemperatureUpdate::Clear);
        assert_eq!(out["beach-c"], TemperatureUpdate::Clear);
    }
}
