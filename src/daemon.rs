/// Sync coordinator for the beach temperature service
///
/// One run:
/// 1. Fetches all beaches from the context broker
/// 2. Fetches observations near each beach in parallel
/// 3. Normalizes and selects one current temperature per beach
/// 4. Writes each beach's row (set or clear) in its own transaction
///
/// `run` repeats this on a fixed interval.

use crate::config::{SourcesConfig, SyncConfig};
use crate::db;
use crate::ingest::broker::{BrokerClient, BrokerError};
use crate::ingest::normalize::normalize;
use crate::model::{Beach, RawObservation, SourceMarkers, TemperatureUpdate, is_plausible_temperature};
use crate::selection::{StalenessPolicy, select_current};
use crate::store::{self, BeachRecord};
use chrono::{DateTime, Utc};
use postgres::Client;
use std::error::Error;
use std::sync::mpsc;
use threadpool::ThreadPool;

// ---------------------------------------------------------------------------
// Run results
// ---------------------------------------------------------------------------

/// A beach that could not be synchronized in this run.
#[derive(Debug, Clone, PartialEq)]
pub struct BeachFailure {
    pub service_guide_id: String,
    pub name: String,
    pub reason: String,
}

impl BeachFailure {
    fn new(beach: &Beach, reason: impl Into<String>) -> Self {
        Self {
            service_guide_id: beach.source.clone(),
            name: beach.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Summary of one synchronization run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    pub beaches: usize,
    pub inserted: usize,
    pub updated: usize,
    pub cleared: usize,
    pub failures: Vec<BeachFailure>,
}

// ---------------------------------------------------------------------------
// Fetch and plan
// ---------------------------------------------------------------------------

/// Fetches observations for every beach on a thread pool.
///
/// Beaches without a service guide id or a usable location, or whose fetch
/// failed, are returned as failures and left out of the result: a failed
/// fetch must not be mistaken for "no observations" and clear a stored
/// temperature.
pub fn collect_observations(
    broker: &BrokerClient,
    beaches: Vec<Beach>,
    workers: usize,
) -> (Vec<Beach>, Vec<BeachFailure>) {
    let pool = ThreadPool::new(workers.max(1));
    let (tx, rx) = mpsc::channel();
    let mut failures = Vec::new();
    // Beaches handed to the pool, by job index, until their result arrives.
    let mut pending: Vec<Option<BeachFailure>> = Vec::new();

    for beach in beaches {
        if beach.source.trim().is_empty() {
            tracing::warn!(id = %beach.id, name = %beach.name, "beach has no service guide id");
            failures.push(BeachFailure::new(&beach, "no service guide id"));
            continue;
        }

        let Some((lon, lat)) = beach.location.as_ref().and_then(|g| g.anchor_point()) else {
            tracing::warn!(source = %beach.source, name = %beach.name, "beach has no usable location");
            failures.push(BeachFailure::new(&beach, "no usable location"));
            continue;
        };

        let job = pending.len();
        pending.push(Some(BeachFailure::new(&beach, "observation fetch did not complete")));

        let broker = broker.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let result = broker.fetch_observations_near(lon, lat);
            // Receiver outlives every job; a send error means the run was abandoned.
            let _ = tx.send((job, beach, result));
        });
    }
    drop(tx);

    let mut ready = gather_fetches(rx, pending, &mut failures);
    // Completion order is arbitrary; keep writes deterministic.
    ready.sort_by(|a, b| a.source.cmp(&b.source));
    (ready, failures)
}

type FetchResult = (usize, Beach, Result<Vec<RawObservation>, BrokerError>);

/// Drains fetch results. Any job that never reported back (its worker
/// panicked and dropped the sender) becomes a failure from `pending`.
fn gather_fetches(
    rx: mpsc::Receiver<FetchResult>,
    mut pending: Vec<Option<BeachFailure>>,
    failures: &mut Vec<BeachFailure>,
) -> Vec<Beach> {
    let mut ready = Vec::with_capacity(pending.len());

    for (job, mut beach, result) in rx.iter().take(pending.len()) {
        if let Some(slot) = pending.get_mut(job) {
            *slot = None;
        }
        match result {
            Ok(observations) => {
                tracing::debug!("found {} observations near beach {}", observations.len(), beach.name);
                beach.observations = observations;
                ready.push(beach);
            }
            Err(e) => {
                tracing::error!(source = %beach.source, name = %beach.name, "observation fetch failed: {}", e);
                failures.push(BeachFailure::new(&beach, e.to_string()));
            }
        }
    }

    for lost in pending.into_iter().flatten() {
        tracing::error!(source = %lost.service_guide_id, name = %lost.name, "observation fetch did not complete");
        failures.push(lost);
    }

    ready
}

/// Resolves one beach to the record that should be written for it.
pub fn plan_beach(
    beach: &Beach,
    now: DateTime<Utc>,
    policy: &StalenessPolicy,
    markers: &SourceMarkers,
    sources: &SourcesConfig,
) -> BeachRecord {
    let observations = normalize(&beach.observations, markers);
    let selected = select_current(&observations, now, policy);

    if let Some(t) = &selected {
        if !is_plausible_temperature(t.value) {
            tracing::warn!(source = %beach.source, "selected temperature {} °C is outside the expected range", t.value);
        }
    }

    BeachRecord::new(beach, TemperatureUpdate::from(selected), sources)
}

/// Resolves every beach. Pure; no I/O.
pub fn plan_writes(beaches: &[Beach], now: DateTime<Utc>, config: &SyncConfig) -> Vec<BeachRecord> {
    let policy = config.staleness_policy();
    let markers = config.sources.markers();

    beaches
        .iter()
        .map(|b| plan_beach(b, now, &policy, &markers, &config.sources))
        .collect()
}

// ---------------------------------------------------------------------------
// Daemon State
// ---------------------------------------------------------------------------

/// Main daemon state
pub struct Daemon {
    config: SyncConfig,
    broker: BrokerClient,
    client: Option<Client>,
}

impl Daemon {
    pub fn new(config: SyncConfig) -> Result<Self, BrokerError> {
        let broker = BrokerClient::new(&config.broker)?;
        Ok(Self {
            config,
            broker,
            client: None,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Connects to the database and ensures the beach table exists.
    pub fn initialize(&mut self) -> Result<(), Box<dyn Error>> {
        let client = db::connect_and_prepare()?;
        self.client = Some(client);
        Ok(())
    }

    /// Fetches and resolves without touching the database.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<(Vec<BeachRecord>, Vec<BeachFailure>), BrokerError> {
        let beaches = self.broker.fetch_beaches()?;
        let (ready, failures) = collect_observations(&self.broker, beaches, self.config.broker.workers);
        Ok((plan_writes(&ready, now, &self.config), failures))
    }

    /// Runs one full synchronization. Per-beach problems are reported in
    /// the returned `SyncReport`; only a failed beach listing aborts the run.
    pub fn run_once(&mut self, now: DateTime<Utc>) -> Result<SyncReport, Box<dyn Error>> {
        if self.client.is_none() {
            return Err("Daemon not initialized".into());
        }

        let beaches = self.broker.fetch_beaches()?;
        let total = beaches.len();
        let (ready, failures) = collect_observations(&self.broker, beaches, self.config.broker.workers);
        let records = plan_writes(&ready, now, &self.config);

        let mut report = SyncReport {
            beaches: total,
            failures,
            ..SyncReport::default()
        };

        let client = self.client.as_mut().ok_or("Daemon not initialized")?;
        for record in &records {
            let span = tracing::info_span!("beach", source = %record.service_guide_id, name = %record.name);
            let _enter = span.enter();

            match store::write_beach(client, record) {
                Ok(outcome) => {
                    if outcome.inserted {
                        tracing::debug!("new beach inserted");
                        report.inserted += 1;
                    }
                    if outcome.cleared {
                        tracing::debug!("cleared temperatures since no valid temperature was found");
                        report.cleared += 1;
                    } else {
                        tracing::debug!("temperature updated");
                        report.updated += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("could not write beach: {}", e);
                    report.failures.push(BeachFailure {
                        service_guide_id: record.service_guide_id.clone(),
                        name: record.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Main daemon loop (runs indefinitely)
    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        let interval = std::time::Duration::from_secs(self.config.schedule.interval_minutes.saturating_mul(60));
        tracing::info!(
            "starting sync loop against {} every {} minutes",
            self.broker.base_url(),
            self.config.schedule.interval_minutes
        );

        loop {
            let started = std::time::Instant::now();

            match self.run_once(Utc::now()) {
                Ok(report) => log_report(&report),
                Err(e) => tracing::error!("sync run failed: {}", e),
            }

            if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }
}

/// Logs a run summary plus one line per failed beach.
pub fn log_report(report: &SyncReport) {
    tracing::info!(
        "sync complete: {} beaches, {} new, {} updated, {} cleared, {} failed",
        report.beaches,
        report.inserted,
        report.updated,
        report.cleared,
        report.failures.len()
    );
    for failure in &report.failures {
        tracing::warn!(source = %failure.service_guide_id, name = %failure.name, "{}", failure.reason);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Geometry, SourceCategory};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 3, 12, 0, 0).unwrap()
    }

    fn raw(hours_ago: i64, source: &str, value: f64) -> RawObservation {
        RawObservation {
            timestamp: (now() - Duration::hours(hours_ago)).to_rfc3339(),
            source: source.to_string(),
            value,
        }
    }

    fn beach(source: &str, observations: Vec<RawObservation>) -> Beach {
        Beach {
            id: format!("urn:ngsi-ld:Beach:{}", source),
            name: format!("Beach {}", source),
            source: source.to_string(),
            beach_types: vec![],
            see_also: vec![],
            location: Some(Geometry::Point { coordinates: vec![11.9, 57.7] }),
            observations,
        }
    }

    #[test]
    fn test_plan_sets_fresh_and_clears_stale() {
        let beaches = vec![
            beach("a", vec![raw(1, "", 18.2)]),
            beach("b", vec![raw(30, "https://www.smhi.se/", 17.0)]),
        ];
        let records = plan_writes(&beaches, now(), &SyncConfig::default());

        assert_eq!(records.len(), 2, "one record per beach");
        match &records[0].temperature {
            TemperatureUpdate::Set(t) => {
                assert_eq!(t.value, 18.2);
                assert_eq!(t.category, SourceCategory::Sensor);
            }
            other => panic!("expected Set, got {:?}", other),
        }
        assert_eq!(records[0].source_label, "Göteborgs Stad");
        assert_eq!(records[1].temperature, TemperatureUpdate::Clear);
    }

    #[test]
    fn test_plan_respects_configured_manual_threshold() {
        let beaches = vec![beach("c", vec![raw(18, "https://badplatsen.havochvatten.se/badplatsen/api", 15.5)])];

        let lenient = plan_writes(&beaches, now(), &SyncConfig::default());
        assert!(matches!(lenient[0].temperature, TemperatureUpdate::Set(_)), "18h manual sample is fresh under 24h");

        let strict = SyncConfig::from_toml_str("[staleness]\nmanual_sample_hours = 12").unwrap();
        let strict = plan_writes(&beaches, now(), &strict);
        assert_eq!(strict[0].temperature, TemperatureUpdate::Clear);
    }

    #[test]
    fn test_implausible_value_is_still_written() {
        let records = plan_writes(&[beach("d", vec![raw(1, "", 55.0)])], now(), &SyncConfig::default());
        assert!(matches!(&records[0].temperature, TemperatureUpdate::Set(t) if t.value == 55.0));
    }

    #[test]
    fn test_daemon_requires_initialization() {
        let mut daemon = Daemon::new(SyncConfig::default()).expect("client should build");
        let result = daemon.run_once(now());
        assert!(result.is_err(), "Should fail before initialization");
    }

    #[test]
    fn test_beach_without_location_is_reported_not_fetched() {
        let broker = BrokerClient::new(&SyncConfig::default().broker).unwrap();
        let mut nowhere = beach("e", vec![]);
        nowhere.location = None;

        let (ready, failures) = collect_observations(&broker, vec![nowhere], 2);
        assert!(ready.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason, "no usable location");
    }

    #[test]
    fn test_beaches_without_service_guide_id_are_reported_not_fetched() {
        let broker = BrokerClient::new(&SyncConfig::default().broker).unwrap();
        let mut first = beach("", vec![]);
        first.id = "urn:ngsi-ld:Beach:one".to_string();
        let mut second = beach("  ", vec![]);
        second.id = "urn:ngsi-ld:Beach:two".to_string();

        let (ready, failures) = collect_observations(&broker, vec![first, second], 2);
        assert!(ready.is_empty(), "beaches without a row key must never reach the store");
        assert_eq!(failures.len(), 2, "each keyless beach is reported on its own");
        assert!(failures.iter().all(|f| f.reason == "no service guide id"));
    }

    #[test]
    fn test_lost_fetch_job_is_reported_as_failure() {
        let (tx, rx) = mpsc::channel();
        let pending = vec![
            Some(BeachFailure::new(&beach("a", vec![]), "observation fetch did not complete")),
            Some(BeachFailure::new(&beach("b", vec![]), "observation fetch did not complete")),
        ];

        // Job 0 reports back; job 1's worker dies before sending.
        tx.send((0, beach("a", vec![]), Ok(vec![raw(1, "", 18.0)]))).unwrap();
        let lost = tx.clone();
        let worker = std::thread::spawn(move || {
            let _sender = lost;
            panic!("worker died");
        });
        assert!(worker.join().is_err());
        drop(tx);

        let mut failures = Vec::new();
        let ready = gather_fetches(rx, pending, &mut failures);

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].observations.len(), 1);
        assert_eq!(failures.len(), 1, "the lost beach must appear in the report");
        assert_eq!(failures[0].service_guide_id, "b");
        assert_eq!(failures[0].reason, "observation fetch did not complete");
    }
}
