//! Request handlers.
//!
//! Handlers never reject: every failure becomes a JSON error reply so warp's
//! rejection machinery only sees routing problems.

use std::convert::Infallible;

use chrono::Utc;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::Reply;
use wxagent_core::{AppError, ErrorKind, InputError, NarrativeError};
use wxagent_services::{NarrativeGenerator, NarrativeRequest, SourceError, WeatherSource};

use crate::error::{body_too_large, error_reply, from_stats};
use crate::models::{
    AnalysisRequest, AnalyzeResponse, HealthResponse, NarrativeStatus, RootResponse,
    StationInfoResponse, DATA_SOURCE, MAX_BODY_BYTES,
};
use crate::state::AppState;

pub async fn root() -> Result<Response, Infallible> {
    Ok(warp::reply::json(&RootResponse::online()).into_response())
}

pub async fn health<S, N>(state: AppState<S, N>) -> Result<Response, Infallible>
where
    S: WeatherSource,
    N: NarrativeGenerator,
{
    let bigquery_connection = match state.source.fetch_observations(1).await {
        Ok(_) => "connected".to_string(),
        Err(SourceError::NoData(_)) => "no data".to_string(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            format!("error: {}", AppError::from(e).user_message())
        }
    };

    let body = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        bigquery_connection,
        llm_model: state.narrator.model().to_string(),
        station_id: state.source.station_id().to_string(),
        project_id: state.config.source.project_id.clone(),
    };
    Ok(warp::reply::json(&body).into_response())
}

pub async fn station_info<S, N>(state: AppState<S, N>) -> Result<Response, Infallible>
where
    S: WeatherSource,
    N: NarrativeGenerator,
{
    let body = StationInfoResponse {
        station_id: state.source.station_id().to_string(),
        project_id: state.config.source.project_id.clone(),
        data_source: DATA_SOURCE.to_string(),
        dataset: state.config.source.dataset.clone(),
    };
    Ok(warp::reply::json(&body).into_response())
}

pub async fn analyze<S, N>(state: AppState<S, N>, body: Bytes) -> Result<Response, Infallible>
where
    S: WeatherSource,
    N: NarrativeGenerator,
{
    // Chunked bodies carry no Content-Length for the route filter to check.
    if body.len() as u64 > MAX_BODY_BYTES {
        return Ok(body_too_large());
    }

    match run_analysis(&state, &body).await {
        Ok(response) => Ok(warp::reply::json(&response).into_response()),
        Err(e) => {
            match e.kind() {
                ErrorKind::Input => tracing::info!("Rejected analysis: {}", e),
                _ => tracing::error!("Analysis failed: {}", e),
            }
            Ok(error_reply(&e))
        }
    }
}

async fn run_analysis<S, N>(state: &AppState<S, N>, body: &[u8]) -> Result<AnalyzeResponse, AppError>
where
    S: WeatherSource,
    N: NarrativeGenerator,
{
    let request = parse_body(body)?.validate()?;
    let station_id = state.source.station_id();

    tracing::info!(days = request.days, "Fetching weather data");
    let observations = state.source.fetch_observations(request.days).await?;

    let summary = wxagent_stats::analyze(&observations, &state.stats).map_err(from_stats)?;
    tracing::debug!(
        anomaly = summary.anomaly,
        spike = summary.significant_spike,
        "Computed statistics"
    );

    let narrative_request = NarrativeRequest {
        station_id,
        days: request.days,
        summary: &summary,
        observations: &observations,
        question: request.question.as_deref(),
    };

    let (narrative, narrative_status, narrative_error) =
        match state.narrator.generate(&narrative_request).await {
            Ok(text) => (Some(text), NarrativeStatus::Ok, None),
            Err(e) => {
                tracing::warn!("Narrative generation failed: {}", e);
                let err = NarrativeError::from(e);
                (None, NarrativeStatus::Unavailable, Some(err.user_message().to_string()))
            }
        };

    Ok(AnalyzeResponse {
        station_id: station_id.to_string(),
        days_analyzed: request.days,
        statistics: summary,
        narrative,
        narrative_status,
        narrative_error,
        timestamp: Utc::now(),
        model_used: state.narrator.model().to_string(),
    })
}

/// An empty body means "all defaults".
fn parse_body(body: &[u8]) -> Result<AnalysisRequest, InputError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalysisRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| InputError::MalformedBody(e.to_string()))
}
