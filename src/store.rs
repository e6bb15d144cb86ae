/// Per-beach persistence into `geodata_cip.beaches`.
///
/// Each beach is written in a single transaction: the row is inserted if
/// its service guide id is new (`ON CONFLICT DO NOTHING` against the unique
/// index), then the temperature columns are either set or nulled. Two runs
/// touching the same beach therefore cannot interleave a check-then-insert.

use chrono::{DateTime, NaiveDateTime, Utc};
use postgres::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;

use crate::config::SourcesConfig;
use crate::model::{Beach, SourceCategory, TemperatureUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("temperature {0} cannot be stored as NUMERIC")]
    InvalidTemperature(f64),
}

// ---------------------------------------------------------------------------
// Row model
// ---------------------------------------------------------------------------

/// Everything written for one beach in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeachRecord {
    pub service_guide_id: String,
    pub name: String,
    pub service_types: String,
    pub web_page: String,
    /// (longitude, latitude) in WGS84, when the beach has a usable geometry.
    pub anchor: Option<(f64, f64)>,
    pub temperature: TemperatureUpdate,
    /// Source label written to `temperatureSource`.
    pub source_label: String,
}

impl BeachRecord {
    pub fn new(beach: &Beach, temperature: TemperatureUpdate, sources: &SourcesConfig) -> Self {
        let source_label = match &temperature {
            TemperatureUpdate::Set(t) if t.category == SourceCategory::Sensor && t.source_tag.trim().is_empty() => {
                sources.default_sensor_source.clone()
            }
            TemperatureUpdate::Set(t) => t.source_tag.clone(),
            TemperatureUpdate::Clear => String::new(),
        };

        BeachRecord {
            service_guide_id: beach.source.clone(),
            name: beach.name.clone(),
            service_types: beach.service_types(),
            web_page: beach.web_page(&sources.web_page_prefix),
            anchor: beach.location.as_ref().and_then(|g| g.anchor_point()),
            temperature,
            source_label,
        }
    }
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// A new row was created for this beach.
    pub inserted: bool,
    /// Temperature columns were cleared rather than set.
    pub cleared: bool,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts the beach if missing and applies its temperature update.
pub fn write_beach(client: &mut Client, record: &BeachRecord) -> Result<WriteOutcome, StoreError> {
    let mut tx = client.transaction()?;

    let rows = match record.anchor {
        Some((lon, lat)) => tx.execute(
            r#"INSERT INTO geodata_cip.beaches ("serviceGuideId", "name", "serviceTypes", "webPage", "geom")
               VALUES ($1, $2, $3, $4, ST_Transform(ST_SetSRID(ST_MakePoint($5, $6), 4326), 3007))
               ON CONFLICT ("serviceGuideId") DO NOTHING"#,
            &[&record.service_guide_id, &record.name, &record.service_types, &record.web_page, &lon, &lat],
        )?,
        None => tx.execute(
            r#"INSERT INTO geodata_cip.beaches ("serviceGuideId", "name", "serviceTypes", "webPage")
               VALUES ($1, $2, $3, $4)
               ON CONFLICT ("serviceGuideId") DO NOTHING"#,
            &[&record.service_guide_id, &record.name, &record.service_types, &record.web_page],
        )?,
    };
    let inserted = rows > 0;

    let cleared = match &record.temperature {
        TemperatureUpdate::Set(t) => {
            let value = Decimal::from_f64(t.value).ok_or(StoreError::InvalidTemperature(t.value))?;
            let observed_at: NaiveDateTime = t.observed_at.naive_utc();

            tx.execute(
                r#"UPDATE geodata_cip.beaches
                   SET "temperature" = $1, "timestampObservered" = $2, "temperatureSource" = $3,
                       "name" = $5, "serviceTypes" = $6, "webPage" = $7
                   WHERE "serviceGuideId" = $4"#,
                &[
                    &value,
                    &observed_at,
                    &record.source_label,
                    &record.service_guide_id,
                    &record.name,
                    &record.service_types,
                    &record.web_page,
                ],
            )?;
            false
        }
        TemperatureUpdate::Clear => {
            tx.execute(
                r#"UPDATE geodata_cip.beaches
                   SET "temperature" = NULL, "timestampObservered" = NULL, "temperatureSource" = NULL
                   WHERE "serviceGuideId" = $1"#,
                &[&record.service_guide_id],
            )?;
            true
        }
    };

    tx.commit()?;
    Ok(WriteOutcome { inserted, cleared })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Stored state of one beach, as served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBeach {
    pub service_guide_id: String,
    pub name: Option<String>,
    pub temperature: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
    pub temperature_source: Option<String>,
}

/// Reads one beach row by service guide id.
pub fn fetch_beach(client: &mut Client, service_guide_id: &str) -> Result<Option<StoredBeach>, StoreError> {
    let rows = client.query(
        r#"SELECT "name", "temperature", "timestampObservered", "temperatureSource"
           FROM geodata_cip.beaches
           WHERE "serviceGuideId" = $1"#,
        &[&service_guide_id],
    )?;

    Ok(rows.first().map(|row| {
        let temperature: Option<Decimal> = row.get(1);
        let observed_at: Option<NaiveDateTime> = row.get(2);

        StoredBeach {
            service_guide_id: service_guide_id.to_string(),
            name: row.get(0),
            temperature: temperature.and_then(|d| d.to_f64()),
            observed_at: observed_at.map(|n| n.and_utc()),
            temperature_source: row.get(3),
        }
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
