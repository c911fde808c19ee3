//! Centralized error types for the weather agent.
//!
//! Every crate in the workspace has its own error enum; they all converge on
//! [`AppError`] at the HTTP boundary. [`AppError::kind`] decides how an error
//! is reported to clients, [`AppError::user_message`] what they are told.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Weather data error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Narrative error: {0}")]
    Narrative(#[from] NarrativeError),
}

/// How an error is surfaced to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something we cannot work with (4xx).
    Input,
    /// The weather data source failed or returned nothing (5xx).
    UpstreamData,
    /// The language model failed. Normally absorbed into a degraded response.
    UpstreamNarrative,
    /// Failures outside the request pipeline, such as unhandled rejections (5xx).
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable label used in JSON error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Input => "input_error",
            ErrorKind::UpstreamData => "upstream_data_error",
            ErrorKind::UpstreamNarrative => "upstream_narrative_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Input(_) => ErrorKind::Input,
            AppError::DataSource(_) => ErrorKind::UpstreamData,
            AppError::Narrative(_) => ErrorKind::UpstreamNarrative,
        }
    }

    /// Returns a message suitable for an API client.
    ///
    /// Input errors echo the validation message since it tells the caller
    /// exactly what to fix. Upstream failures get a fixed message
    /// so backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Input(e) => e.to_string(),
            AppError::DataSource(e) => e.user_message().to_string(),
            AppError::Narrative(e) => e.user_message().to_string(),
        }
    }
}

/// Request validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("days must be between {min} and {max} (inclusive), got {days}")]
    DaysOutOfRange { days: i64, min: u32, max: u32 },

    #[error("custom_question is too long ({len} characters, maximum {max})")]
    QuestionTooLong { len: usize, max: usize },

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("At least one observation is required for analysis")]
    EmptyWindow,
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "Unable to reach an upstream service.",
            NetworkError::Timeout => "An upstream service timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "An upstream service is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "An upstream request was rejected.",
            NetworkError::InvalidResponse(_) => "Received an unexpected upstream response.",
        }
    }
}

/// Weather data source errors.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Data source API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Query did not complete in time")]
    Incomplete,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No weather data found for station {0}")]
    NoData(String),

    #[error("Credentials unavailable: {0}")]
    Credentials(String),
}

impl DataSourceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DataSourceError::Network(e) => e.user_message(),
            DataSourceError::Api { .. } => "The weather data service rejected the query.",
            DataSourceError::Incomplete => "The weather data query timed out. Please try again.",
            DataSourceError::InvalidData(_) => "The weather data service returned unreadable data.",
            DataSourceError::NoData(_) => "No weather data is available for this station.",
            DataSourceError::Credentials(_) => "The weather data service could not be authorized.",
        }
    }
}

/// Language model errors.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Language model API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Language model returned an empty response")]
    EmptyResponse,

    #[error("Invalid language model response: {0}")]
    InvalidResponse(String),

    #[error("Prompt could not be built: {0}")]
    Prompt(String),
}

impl NarrativeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NarrativeError::Network(e) => e.user_message(),
            NarrativeError::Api { status, .. } if *status == 429 => {
                "The language model quota is exhausted. Statistics are still available."
            }
            NarrativeError::Api { .. } => {
                "The language model is unavailable. Statistics are still available."
            }
            NarrativeError::EmptyResponse | NarrativeError::InvalidResponse(_) => {
                "The language model returned no usable text."
            }
            NarrativeError::Prompt(_) => "The analysis prompt could not be built.",
        }
    }
}

/// Configuration errors. Raised at startup only, never on a request path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(AppError::from(InputError::EmptyWindow).kind(), ErrorKind::Input);
        assert_eq!(
            AppError::from(DataSourceError::NoData("999999".into())).kind(),
            ErrorKind::UpstreamData
        );
        assert_eq!(
            AppError::from(NarrativeError::EmptyResponse).kind(),
            ErrorKind::UpstreamNarrative
        );
    }

    #[test]
    fn test_input_message_is_echoed() {
        let err = AppError::from(InputError::DaysOutOfRange {
            days: 6,
            min: 7,
            max: 90,
        });
        let msg = err.user_message();
        assert!(msg.contains("between 7 and 90"), "unexpected message: {}", msg);
        assert!(msg.contains('6'));
    }

    #[test]
    fn test_upstream_details_are_hidden() {
        let err = AppError::from(DataSourceError::Api {
            status: 403,
            message: "Access Denied: project secret-project".into(),
        });
        assert!(!err.user_message().contains("secret-project"));
        assert!(err.to_string().contains("secret-project"));
    }

    #[test]
    fn test_network_error_nests_into_data_source() {
        let err: DataSourceError = NetworkError::Timeout.into();
        assert!(matches!(err, DataSourceError::Network(NetworkError::Timeout)));
        assert_eq!(err.user_message(), NetworkError::Timeout.user_message());
    }

    #[test]
    fn test_quota_has_specific_message() {
        let quota = NarrativeError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert!(quota.user_message().contains("quota"));
    }

    #[test]
    fn test_kind_labels_are_distinct() {
        let labels = [
            ErrorKind::Input.as_str(),
            ErrorKind::UpstreamData.as_str(),
            ErrorKind::UpstreamNarrative.as_str(),
            ErrorKind::Internal.as_str(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
