/// NGSI-LD context broker client.
///
/// Handles URL construction and keyValues response parsing for the broker's
/// entities endpoint:
///   {broker}/ngsi-ld/v1/entities?type=...&options=keyValues
///
/// Two queries are used: all `Beach` entities (paged), and the
/// `WaterQualityObserved` entities within a radius of one beach. See
/// `fixtures.rs` for annotated example payloads.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::config::BrokerConfig;
use crate::model::{Beach, Geometry, RawObservation};

const ENTITIES_PATH: &str = "ngsi-ld/v1/entities";

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("failed to retrieve data from context broker: {0}")]
    Http(#[from] reqwest::Error),

    #[error("expected status code 200, but got {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to parse broker response: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Serde structures for keyValues entities
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BeachEntity {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    source: String,
    #[serde(rename = "beachType", default)]
    beach_type: Value,
    #[serde(rename = "seeAlso", default)]
    see_also: Value,
    #[serde(default)]
    location: Option<Value>,
}

#[derive(Deserialize)]
struct WaterQualityEntity {
    id: String,
    #[serde(rename = "dateObserved", default)]
    date_observed: Value,
    #[serde(default)]
    source: String,
    temperature: Option<f64>,
}

/// Accepts either a JSON array of strings or a single string.
/// Anything else yields an empty list.
fn strings_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// `dateObserved` arrives as `{"@type": "DateTime", "@value": "..."}` or,
/// from some producers, as a bare string.
fn date_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("@value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds an entities query URL. `options=keyValues` is always appended.
pub fn build_entities_url(base_url: &str, params: &[(&str, String)]) -> String {
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| (*k, v.as_str()))
        .chain(std::iter::once(("options", "keyValues")))
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();

    format!("{}/{}?{}", base_url.trim_end_matches('/'), ENTITIES_PATH, query.join("&"))
}

/// Query parameters for one page of beaches.
pub fn beach_query(limit: u32, offset: u32) -> Vec<(&'static str, String)> {
    vec![
        ("type", "Beach".to_string()),
        ("limit", limit.to_string()),
        ("offset", offset.to_string()),
    ]
}

/// Query parameters for observations within `max_distance_m` of a point.
pub fn observations_near_query(
    longitude: f64,
    latitude: f64,
    max_distance_m: u32,
    limit: u32,
) -> Vec<(&'static str, String)> {
    vec![
        ("type", "WaterQualityObserved".to_string()),
        ("geoproperty", "location".to_string()),
        ("georel", format!("near;maxDistance=={}", max_distance_m)),
        ("geometry", "Point".to_string()),
        ("coordinates", format!("[{},{}]", longitude, latitude)),
        ("limit", limit.to_string()),
    ]
}

/// The JSON-LD `Link` header value for a context URL.
pub fn link_header(context_url: &str) -> String {
    format!(
        "<{}>; rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"application/ld+json\"",
        context_url
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a keyValues array of `Beach` entities.
///
/// Unrecognized geometry types leave `location` empty instead of failing
/// the whole page.
pub fn parse_beaches(json: &str) -> Result<Vec<Beach>, BrokerError> {
    let entities: Vec<BeachEntity> = serde_json::from_str(json)?;

    Ok(entities
        .into_iter()
        .map(|e| Beach {
            location: e
                .location
                .and_then(|v| serde_json::from_value::<Geometry>(v).ok()),
            beach_types: strings_of(&e.beach_type),
            see_also: strings_of(&e.see_also),
            id: e.id,
            name: e.name,
            source: e.source,
            observations: Vec::new(),
        })
        .collect())
}

/// Parses a keyValues array of `WaterQualityObserved` entities into raw
/// temperature readings. Entities without a temperature are skipped.
pub fn parse_observations(json: &str) -> Result<Vec<RawObservation>, BrokerError> {
    let entities: Vec<WaterQualityEntity> = serde_json::from_str(json)?;

    Ok(entities
        .into_iter()
        .filter_map(|e| match e.temperature {
            Some(value) => Some(RawObservation {
                timestamp: date_of(&e.date_observed),
                source: e.source,
                value,
            }),
            None => {
                tracing::trace!(id = %e.id, "skipping observation without temperature");
                None
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking client for the context broker. Cheap to clone; clones share
/// the underlying connection pool.
#[derive(Clone)]
pub struct BrokerClient {
    http: reqwest::blocking::Client,
    base_url: String,
    link: String,
    max_distance_m: u32,
    page_size: u32,
    observation_limit: u32,
}

impl BrokerClient {
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            link: link_header(&config.context_url),
            max_distance_m: config.max_distance_m,
            page_size: config.beach_page_size,
            observation_limit: config.observation_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> Result<String, BrokerError> {
        tracing::debug!("calling {}", url);

        let response = self
            .http
            .get(url)
            .header("Accept", "application/ld+json")
            .header("Link", &self.link)
            .send()?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(BrokerError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text()?)
    }

    /// Fetches every beach, following `offset` until a short page.
    pub fn fetch_beaches(&self) -> Result<Vec<Beach>, BrokerError> {
        let mut beaches = Vec::new();
        let mut offset = 0;

        loop {
            let url = build_entities_url(&self.base_url, &beach_query(self.page_size, offset));
            let page = parse_beaches(&self.get(&url)?)?;
            let count = page.len() as u32;
            beaches.extend(page);

            if count < self.page_size {
                break;
            }
            offset += count;
        }

        tracing::info!("fetched {} beaches from {}", beaches.len(), self.base_url);
        Ok(beaches)
    }

    /// Fetches temperature readings near a point given as (lon, lat).
    pub fn fetch_observations_near(&self, longitude: f64, latitude: f64) -> Result<Vec<RawObservation>, BrokerError> {
        let params = observations_near_query(longitude, latitude, self.max_distance_m, self.observation_limit);
        let url = build_entities_url(&self.base_url, &params);
        parse_observations(&self.get(&url)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
