/// beachtemp_service: bathing-water temperature sync for the city map.
///
/// Periodically pulls beaches and nearby water-quality observations from an
/// NGSI-LD context broker, picks one current temperature per beach, and
/// writes it to the PostGIS table the map UI renders from.
///
/// # Module structure
///
/// ```text
/// beachtemp_service
/// ├── model       — shared data types (RawObservation, Observation, SourceCategory, Beach, …)
/// ├── config      — sync.toml loader with environment overrides
/// ├── db          — Postgres connection, PostGIS check, table bootstrap
/// ├── store       — per-beach transactional insert + set/clear temperature
/// ├── daemon      — sync coordinator (one run, or a periodic loop)
/// ├── endpoint    — optional HTTP status API
/// ├── ingest
/// │   ├── broker    — NGSI-LD URL construction, parsing, blocking client
/// │   ├── normalize — raw readings to categorized observations
/// │   └── fixtures (test only) — representative broker payloads
/// └── selection
///     ├── staleness — per-category maximum observation age
///     └── selector  — priority cascade: sensor > satellite/model > manual sample
/// ```

/// Public modules
pub mod config;
pub mod daemon;
pub mod db;
pub mod endpoint;
pub mod ingest;
pub mod model;
pub mod selection;
pub mod store;
