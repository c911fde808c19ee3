//! Request and response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wxagent_core::InputError;
use wxagent_stats::Summary;

pub const MIN_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 90;
pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Largest accepted `POST /analyze` body.
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

pub const SERVICE_NAME: &str = "Weather Agent API";
pub const DATA_SOURCE: &str = "NOAA GSOD (BigQuery public dataset)";

/// Body of `POST /analyze`. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub custom_question: Option<String>,
}

/// An [`AnalysisRequest`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub days: u32,
    pub question: Option<String>,
}

impl AnalysisRequest {
    pub fn validate(self) -> Result<ValidatedRequest, InputError> {
        let days = match self.days {
            None => DEFAULT_DAYS,
            Some(d) => u32::try_from(d)
                .ok()
                .filter(|d| (MIN_DAYS..=MAX_DAYS).contains(d))
                .ok_or(InputError::DaysOutOfRange {
                    days: d,
                    min: MIN_DAYS,
                    max: MAX_DAYS,
                })?,
        };

        let question = self
            .custom_question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        if let Some(q) = &question {
            let len = q.chars().count();
            if len > MAX_QUESTION_CHARS {
                return Err(InputError::QuestionTooLong {
                    len,
                    max: MAX_QUESTION_CHARS,
                });
            }
        }

        Ok(ValidatedRequest { days, question })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeStatus {
    Ok,
    Unavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub station_id: String,
    pub days_analyzed: u32,
    pub statistics: Summary,
    pub narrative: Option<String>,
    pub narrative_status: NarrativeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub model_used: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

impl RootResponse {
    pub fn online() -> Self {
        let endpoints = [
            ("analyze", "/analyze"),
            ("health", "/health"),
            ("station_info", "/station-info"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            status: "online".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// `connected`, `no data`, or `error: <message>`
    pub bigquery_connection: String,
    pub llm_model: String,
    pub station_id: String,
    pub project_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StationInfoResponse {
    pub station_id: String,
    pub project_id: String,
    pub data_source: String,
    pub dataset: String,
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(days: Option<i64>, question: Option<&str>) -> AnalysisRequest {
        AnalysisRequest {
            days,
            custom_question: question.map(String::from),
        }
    }

    #[test]
    fn test_days_default() {
        let v = request(None, None).validate().unwrap();
        assert_eq!(v.days, DEFAULT_DAYS);
        assert_eq!(v.question, None);
    }

    #[test]
    fn test_days_bounds_inclusive() {
        assert_eq!(request(Some(7), None).validate().unwrap().days, 7);
        assert_eq!(request(Some(90), None).validate().unwrap().days, 90);
    }

    #[test]
    fn test_days_out_of_range() {
        for days in [6, 91, 0, -5, i64::MAX] {
            let err = request(Some(days), None).validate().unwrap_err();
            assert_eq!(
                err,
                InputError::DaysOutOfRange {
                    days,
                    min: MIN_DAYS,
                    max: MAX_DAYS
                }
            );
        }
    }

    #[test]
    fn test_blank_question_is_absent() {
        let v = request(Some(30), Some("   \n")).validate().unwrap();
        assert_eq!(v.question, None);

        let v = request(Some(30), Some("  Any frost?  ")).validate().unwrap();
        assert_eq!(v.question.as_deref(), Some("Any frost?"));
    }

    #[test]
    fn test_question_too_long() {
        let long = "é".repeat(MAX_QUESTION_CHARS + 1);
        let err = request(None, Some(&long)).validate().unwrap_err();
        assert!(matches!(err, InputError::QuestionTooLong { len: 1001, .. }));

        let ok = "é".repeat(MAX_QUESTION_CHARS);
        assert!(request(None, Some(&ok)).validate().is_ok());
    }

    #[test]
    fn test_request_ignores_unknown_fields() {
        let req: AnalysisRequest =
            serde_json::from_str(r#"{"days": 14, "verbose": true}"#).unwrap();
        assert_eq!(req.days, Some(14));
    }

    #[test]
    fn test_narrative_status_lowercase() {
        assert_eq!(serde_json::to_value(NarrativeStatus::Unavailable).unwrap(), "unavailable");
        assert_eq!(serde_json::to_value(NarrativeStatus::Ok).unwrap(), "ok");
    }
}
