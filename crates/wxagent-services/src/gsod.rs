//! NOAA GSOD daily observations via the BigQuery REST API.
//!
//! API reference: https://cloud.google.com/bigquery/docs/reference/rest/v2/jobs/query
//! Dataset: `bigquery-public-data.noaa_gsod.gsodYYYY`

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use wxagent_core::SourceConfig;
use wxagent_stats::Observation;

use crate::source::{SourceError, WeatherSource};
use crate::token::TokenProvider;

const USER_AGENT: &str = concat!("wxagent/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// BigQuery response structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

/// BigQuery returns every scalar as a string, or null.
#[derive(Debug, Deserialize)]
struct Cell {
    v: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Query construction
// ============================================================================

/// GoogleSQL for the newest `days` readings of `@station`, newest first.
///
/// Temperatures are converted to Celsius, precipitation to millimetres and
/// wind speed to km/h. GSOD missing-value sentinels (9999.9 temperature,
/// 99.99 precipitation, 999.9 wind) are filtered or nulled. `table` must
/// already be validated as `project.dataset.table`.
pub fn build_query(table: &str, days: u32) -> String {
    format!(
        "SELECT
  FORMAT_DATE('%Y-%m-%d', DATE(CAST(year AS INT64), CAST(mo AS INT64), CAST(da AS INT64))) AS date,
  ROUND((CAST(temp AS FLOAT64) - 32) * 5 / 9, 1) AS temp_c,
  IF(CAST(prcp AS FLOAT64) >= 99.99, NULL, ROUND(CAST(prcp AS FLOAT64) * 25.4, 1)) AS precip_mm,
  IF(CAST(wdsp AS FLOAT64) >= 999.9, NULL, ROUND(CAST(wdsp AS FLOAT64) * 1.852, 1)) AS wind_speed_kmh
FROM `{table}`
WHERE stn = @station
  AND temp IS NOT NULL
  AND CAST(temp AS FLOAT64) < 9000
ORDER BY year DESC, mo DESC, da DESC
LIMIT {days}"
    )
}

/// Convert result rows (newest first) into ascending observations.
fn parse_rows(rows: Vec<Row>) -> Result<Vec<Observation>, SourceError> {
    let mut observations = Vec::with_capacity(rows.len());

    for (i, row) in rows.into_iter().enumerate() {
        let malformed = |message: String| SourceError::MalformedRow { row: i, message };

        if row.f.len() < 2 {
            return Err(malformed(format!("expected at least 2 columns, got {}", row.f.len())));
        }

        let mut cells = row.f.into_iter().map(|c| c.v);
        let date_str = cells
            .next()
            .flatten()
            .ok_or_else(|| malformed("missing date".to_string()))?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| malformed(format!("bad date {:?}: {}", date_str, e)))?;

        let temp_str = cells
            .next()
            .flatten()
            .ok_or_else(|| malformed("missing temperature".to_string()))?;
        let temperature_c: f64 = temp_str
            .parse()
            .map_err(|_| malformed(format!("bad temperature {:?}", temp_str)))?;

        // Optional columns that fail to parse are treated as missing
        let mut optional = || cells.next().flatten().and_then(|s| s.parse::<f64>().ok());
        let precip_mm = optional();
        let wind_speed_kmh = optional();

        observations.push(Observation {
            date,
            temperature_c,
            precip_mm,
            wind_speed_kmh,
        });
    }

    observations.reverse();
    Ok(observations)
}

// ============================================================================
// Client
// ============================================================================

/// BigQuery-backed [`WeatherSource`] for one GSOD station.
#[derive(Debug)]
pub struct GsodClient {
    client: Client,
    base_url: String,
    project_id: String,
    station_id: String,
    table: String,
    query_timeout_ms: u64,
    tokens: TokenProvider,
}

impl GsodClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let tokens = TokenProvider::from_config(config, client.clone());

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            station_id: config.station_id.clone(),
            table: config.dataset.clone(),
            query_timeout_ms: config.query_timeout_ms,
            tokens,
        })
    }

    /// Fully qualified GSOD table queried.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn request_body(&self, days: u32) -> serde_json::Value {
        serde_json::json!({
            "query": build_query(&self.table, days),
            "useLegacySql": false,
            "timeoutMs": self.query_timeout_ms,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "station",
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": self.station_id }
            }]
        })
    }

    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);

        tracing::warn!("BigQuery returned {}: {}", status, message);
        Err(SourceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl WeatherSource for GsodClient {
    fn station_id(&self) -> &str {
        &self.station_id
    }

    #[instrument(skip(self), fields(station = %self.station_id), level = "info")]
    async fn fetch_observations(&self, days: u32) -> Result<Vec<Observation>, SourceError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/projects/{}/queries", self.base_url, self.project_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&self.request_body(days))
            .send()
            .await?;
        let response = self.check_response(response).await?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if !body.job_complete {
            return Err(SourceError::Incomplete);
        }

        let observations = parse_rows(body.rows)?;
        if observations.is_empty() {
            return Err(SourceError::NoData(self.station_id.clone()));
        }

        tracing::info!("Fetched {} daily observations", observations.len());
        Ok(observations)
    }
}

// ============================================================================
// Tests
// ============================================================================
