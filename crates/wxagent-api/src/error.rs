//! Error replies and rejection handling.

use std::convert::Infallible;

use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};
use wxagent_core::{AppError, DataSourceError, ErrorKind, InputError};
use wxagent_stats::StatsError;

use crate::models::{ErrorResponse, MAX_BODY_BYTES};

/// Declared `Content-Length` exceeds [`MAX_BODY_BYTES`].
#[derive(Debug)]
pub struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamData | ErrorKind::UpstreamNarrative => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON `{error, message}` reply for an application error.
pub fn error_reply(err: &AppError) -> Response {
    let kind = err.kind();
    json_error(status_for(kind), kind.as_str(), err.user_message())
}

fn json_error(status: StatusCode, error: &str, message: String) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

pub fn body_too_large() -> Response {
    json_error(
        StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::Input.as_str(),
        format!("Request body exceeds {} bytes", MAX_BODY_BYTES),
    )
}

/// An empty window is the caller's problem; a non-finite reading is the
/// data source's.
pub fn from_stats(err: StatsError) -> AppError {
    match err {
        StatsError::EmptyWindow => InputError::EmptyWindow.into(),
        StatsError::NonFiniteValue { .. } => DataSourceError::InvalidData(err.to_string()).into(),
    }
}

/// Turn routing, header and CORS rejections into JSON error bodies.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.find::<BodyTooLarge>().is_some() {
        return Ok(body_too_large());
    }

    let (status, error, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "No such endpoint".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed for this endpoint".to_string(),
        )
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, ErrorKind::Input.as_str(), e.to_string())
    } else if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, "cors_forbidden", e.to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal.as_str(),
            "An unexpected error occurred. Please try again.".to_string(),
        )
    };

    Ok(json_error(status, error, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wxagent_core::NarrativeError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Input), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::UpstreamData), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_reply_status() {
        let reply = error_reply(&AppError::from(InputError::EmptyWindow));
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);

        let reply = error_reply(&AppError::from(NarrativeError::EmptyResponse));
        assert_eq!(reply.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_body_too_large_reply() {
        assert_eq!(body_too_large().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_custom_rejection_maps_to_413() {
        let reply = handle_rejection(warp::reject::custom(BodyTooLarge)).await.unwrap();
        assert_eq!(reply.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let reply = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_stats_errors() {
        assert_eq!(from_stats(StatsError::EmptyWindow).kind(), ErrorKind::Input);

        let err = from_stats(StatsError::NonFiniteValue {
            index: 2,
            date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
        });
        assert_eq!(err.kind(), ErrorKind::UpstreamData);
    }
}
