//! Weather data source trait and error types.

use std::future::Future;

use thiserror::Error;
use wxagent_stats::Observation;

use crate::token::TokenError;

/// Errors that can occur while fetching observations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Query job did not complete before the server-side timeout")]
    Incomplete,

    #[error("Malformed row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No weather data found for station {0}")]
    NoData(String),

    #[error("Access token error: {0}")]
    Token(#[from] TokenError),
}

/// Supplier of daily observations for one fixed reference station.
///
/// Implementations return observations in ascending date order and must
/// never return an empty `Ok`; an empty window is [`SourceError::NoData`].
pub trait WeatherSource: Send + Sync {
    /// Station the observations come from.
    fn station_id(&self) -> &str;

    /// Fetch the most recent `days` daily observations, oldest first.
    fn fetch_observations(
        &self,
        days: u32,
    ) -> impl Future<Output = Result<Vec<Observation>, SourceError>> + Send;
}
