/// Data ingestion from the NGSI-LD context broker.
///
/// - `broker`    — URL construction, response parsing, blocking fetch client
/// - `normalize` — raw readings to typed, categorized observations
/// - `fixtures`  — (test only) representative broker payloads

pub mod broker;
pub mod normalize;

#[cfg(test)]
pub(crate) mod fixtures;
