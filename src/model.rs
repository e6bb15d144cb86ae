/// Shared data types for the beach temperature sync service.
///
/// Raw records come off the context broker as `RawObservation`s, get
/// normalized into `Observation`s carrying a closed `SourceCategory`, and
/// the selector reduces each beach's set to at most one `SelectedTemperature`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// A temperature reading as delivered by the fetch layer, before any
/// interpretation of its timestamp or source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// ISO 8601 date-time with offset, e.g. `2022-06-27T17:00:00+02:00`.
    pub timestamp: String,
    /// Free-text provenance (URL or name).
    pub source: String,
    /// Water temperature in °C.
    pub value: f64,
}

/// Trust tier of an observation, derived once from its source tag.
///
/// Declaration order is priority order: sensors first, manual sampling last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    /// In-situ sensor. Fallback for any unrecognized source.
    Sensor,
    /// Satellite or oceanographic model data.
    SatelliteModel,
    /// Manual spot sampling.
    ManualSample,
}

impl SourceCategory {
    /// All categories in selection priority order.
    pub const PRIORITY: [SourceCategory; 3] = [
        SourceCategory::Sensor,
        SourceCategory::SatelliteModel,
        SourceCategory::ManualSample,
    ];

    /// Classifies a source tag against the built-in provider markers.
    pub fn classify(source_tag: &str) -> Self {
        SourceMarkers::default().classify(source_tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Sensor => "sensor",
            SourceCategory::SatelliteModel => "satellite_model",
            SourceCategory::ManualSample => "manual_sample",
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known provider identifiers used to classify source tags.
///
/// Matching is case-insensitive substring search. Satellite/model markers
/// are checked before manual-sampling markers.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMarkers {
    pub satellite_model: Vec<String>,
    pub manual_sample: Vec<String>,
}

impl Default for SourceMarkers {
    fn default() -> Self {
        Self {
            satellite_model: vec!["smhi".to_string()],
            manual_sample: vec!["havochvatten".to_string()],
        }
    }
}

impl SourceMarkers {
    pub fn classify(&self, source_tag: &str) -> SourceCategory {
        let tag = source_tag.to_lowercase();
        let hit = |markers: &[String]| {
            markers
                .iter()
                .filter(|m| !m.is_empty())
                .any(|m| tag.contains(&m.to_lowercase()))
        };

        if hit(&self.satellite_model) {
            SourceCategory::SatelliteModel
        } else if hit(&self.manual_sample) {
            SourceCategory::ManualSample
        } else {
            SourceCategory::Sensor
        }
    }
}

/// Lowest and highest water temperatures (°C) we expect to ever see.
pub const PLAUSIBLE_TEMPERATURE_C: (f64, f64) = (-5.0, 40.0);

pub fn is_plausible_temperature(value: f64) -> bool {
    let (lo, hi) = PLAUSIBLE_TEMPERATURE_C;
    value >= lo && value <= hi
}

/// A normalized temperature reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub value: f64,
    /// Unix epoch when the raw timestamp could not be parsed.
    pub observed_at: DateTime<Utc>,
    pub source_tag: String,
    pub category: SourceCategory,
}

impl Observation {
    /// True when the value falls inside the expected water temperature range.
    pub fn is_plausible(&self) -> bool {
        is_plausible_temperature(self.value)
    }
}

/// The winning observation for one beach, copied verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedTemperature {
    pub value: f64,
    pub observed_at: DateTime<Utc>,
    pub source_tag: String,
    pub category: SourceCategory,
}

impl From<&Observation> for SelectedTemperature {
    fn from(o: &Observation) -> Self {
        SelectedTemperature {
            value: o.value,
            observed_at: o.observed_at,
            source_tag: o.source_tag.clone(),
            category: o.category,
        }
    }
}

/// What the store should do with a beach's temperature columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TemperatureUpdate {
    Set(SelectedTemperature),
    /// No usable observation: null out any previously stored value.
    Clear,
}

impl From<Option<SelectedTemperature>> for TemperatureUpdate {
    fn from(selected: Option<SelectedTemperature>) -> Self {
        match selected {
            Some(t) => TemperatureUpdate::Set(t),
            None => TemperatureUpdate::Clear,
        }
    }
}

// ---------------------------------------------------------------------------
// Beaches
// ---------------------------------------------------------------------------

/// GeoJSON-style geometry as returned by the broker in keyValues mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

impl Geometry {
    /// First coordinate pair of the geometry as `(longitude, latitude)`.
    ///
    /// Used as the reference point for "near" observation queries.
    pub fn anchor_point(&self) -> Option<(f64, f64)> {
        let pair = match self {
            Geometry::Point { coordinates } => Some(coordinates.as_slice()),
            Geometry::Polygon { coordinates } => coordinates
                .first()
                .and_then(|ring| ring.first())
                .map(|p| p.as_slice()),
            Geometry::MultiPolygon { coordinates } => coordinates
                .first()
                .and_then(|poly| poly.first())
                .and_then(|ring| ring.first())
                .map(|p| p.as_slice()),
        }?;

        match pair {
            [lon, lat, ..] => Some((*lon, *lat)),
            _ => None,
        }
    }
}

/// A bathing site with the raw observations found near it.
#[derive(Debug, Clone)]
pub struct Beach {
    /// NGSI-LD entity id, e.g. `urn:ngsi-ld:Beach:SE0A21480000004452`.
    pub id: String,
    pub name: String,
    /// External service guide identifier; the store's row key.
    pub source: String,
    pub beach_types: Vec<String>,
    pub see_also: Vec<String>,
    pub location: Option<Geometry>,
    /// Fetch order, not significant for selection.
    pub observations: Vec<RawObservation>,
}

impl Beach {
    /// Beach types as stored in the `serviceTypes` column.
    pub fn service_types(&self) -> String {
        self.beach_types.join(", ")
    }

    /// First `seeAlso` link that starts with `prefix`, or an empty string.
    pub fn web_page(&self, prefix: &str) -> String {
        self.see_also
            .iter()
            .find(|s| s.starts_with(prefix))
            .cloned()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
