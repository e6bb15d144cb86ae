/// HTTP endpoint for querying stored beach temperatures
///
/// Lets the map team and operators check what the last runs wrote without
/// opening a database session.
///
/// Endpoints:
/// - GET /beach/{serviceGuideId} - Stored temperature, source and age
/// - GET /health - Service health check

use crate::store::{self, StoredBeach};
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use postgres::Client;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Beach temperature response
#[derive(Debug, Serialize)]
pub struct BeachStatusResponse {
    #[serde(flatten)]
    pub beach: StoredBeach,
    /// Minutes since the stored observation, if any.
    pub age_minutes: Option<i64>,
    /// Observation date as shown on the map, e.g. "3 juli 2022".
    pub date_sv: Option<String>,
    /// Observation time as shown on the map, e.g. "14.14".
    pub time_sv: Option<String>,
}

impl BeachStatusResponse {
    pub fn new(beach: StoredBeach, now: DateTime<Utc>) -> Self {
        let age_minutes = beach.observed_at.map(|t| (now - t).num_minutes());
        let (date_sv, time_sv) = match beach.observed_at.and_then(swedish_date_and_time) {
            Some((date, time)) => (Some(date), Some(time)),
            None => (None, None),
        };
        Self {
            beach,
            age_minutes,
            date_sv,
            time_sv,
        }
    }
}

const SWEDISH_MONTHS: [&str; 12] = [
    "januari", "februari", "mars", "april", "maj", "juni",
    "juli", "augusti", "september", "oktober", "november", "december",
];

/// Formats a timestamp the way the map labels it: "3 juli 2022" and "14.14".
///
/// Always UTC+2 (CEST), including outside summer time.
pub fn swedish_date_and_time(t: DateTime<Utc>) -> Option<(String, String)> {
    let cest = FixedOffset::east_opt(2 * 3600)?;
    let local = t.with_timezone(&cest);
    let month = SWEDISH_MONTHS[local.month0() as usize];

    Some((
        format!("{} {} {}", local.day(), month, local.year()),
        local.format("%H.%M").to_string(),
    ))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port
pub fn start_endpoint_server(port: u16, mut client: Client) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    tracing::info!("HTTP endpoint listening on http://0.0.0.0:{}", port);

    for request in server.incoming_requests() {
        let url = request.url().to_string();

        let response = if url == "/health" {
            handle_health()
        } else if let Some(id) = url.strip_prefix("/beach/") {
            handle_beach_query(&mut client, id)
        } else {
            create_response(
                404,
                serde_json::json!({
                    "error": "Not found",
                    "available_endpoints": ["/health", "/beach/{serviceGuideId}"]
                }),
            )
        };

        if let Err(e) = request.respond(response) {
            tracing::warn!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Handle /health endpoint
fn handle_health() -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    create_response(
        200,
        serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }),
    )
}

/// Handle /beach/{serviceGuideId} endpoint
fn handle_beach_query(client: &mut Client, raw_id: &str) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let id = urlencoding::decode(raw_id)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw_id.to_string());

    match store::fetch_beach(client, &id) {
        Ok(Some(beach)) => match serde_json::to_value(BeachStatusResponse::new(beach, Utc::now())) {
            Ok(body) => create_response(200, body),
            Err(e) => create_response(500, serde_json::json!({ "error": e.to_string() })),
        },
        Ok(None) => create_response(
            404,
            serde_json::json!({
                "error": "Beach not found",
                "service_guide_id": id
            }),
        ),
        Err(e) => {
            tracing::error!("beach query failed: {}", e);
            create_response(500, serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: serde_json::Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());

    let response = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(status_code));

    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
