//! Maps service errors to wxagent_core error types for consistent
//! user-facing messages.

use wxagent_core::{AppError, DataSourceError, NarrativeError, ReqwestErrorExt};

use crate::narrative::GenerationError;
use crate::source::SourceError;

impl From<SourceError> for DataSourceError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Network(e) => DataSourceError::Network(e.into_network_error()),
            SourceError::Api { status, message } => DataSourceError::Api { status, message },
            SourceError::Incomplete => DataSourceError::Incomplete,
            SourceError::MalformedRow { .. } | SourceError::InvalidResponse(_) => {
                DataSourceError::InvalidData(e.to_string())
            }
            SourceError::NoData(station) => DataSourceError::NoData(station),
            SourceError::Token(e) => DataSourceError::Credentials(e.to_string()),
        }
    }
}

impl From<SourceError> for AppError {
    fn from(e: SourceError) -> Self {
        AppError::DataSource(e.into())
    }
}

impl From<GenerationError> for NarrativeError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Network(e) => NarrativeError::Network(e.into_network_error()),
            GenerationError::Api { status, message } => NarrativeError::Api { status, message },
            GenerationError::EmptyResponse => NarrativeError::EmptyResponse,
            GenerationError::InvalidResponse(s) => NarrativeError::InvalidResponse(s),
            GenerationError::Prompt(s) => NarrativeError::Prompt(s),
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        AppError::Narrative(e.into())
    }
}
