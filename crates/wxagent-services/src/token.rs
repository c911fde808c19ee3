//! Google OAuth access tokens for the BigQuery REST API.
//!
//! A static token (from `GCP_ACCESS_TOKEN`, e.g. `gcloud auth print-access-token`)
//! is used as-is. Otherwise tokens come from the GCE / Cloud Run metadata
//! server and are reused until shortly before they expire.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use wxagent_core::SourceConfig;

/// Refresh this long before the metadata server's expiry.
const REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Metadata server unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Metadata server returned {status}: {message}")]
    Metadata { status: u16, message: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

enum Mode {
    Static(String),
    Metadata { url: String },
}

/// Supplies bearer tokens for BigQuery requests.
pub struct TokenProvider {
    mode: Mode,
    client: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.mode {
            Mode::Static(_) => "static",
            Mode::Metadata { .. } => "metadata",
        };
        f.debug_struct("TokenProvider").field("mode", &mode).finish()
    }
}

impl TokenProvider {
    /// Static token if configured, metadata server otherwise.
    pub fn from_config(config: &SourceConfig, client: reqwest::Client) -> Self {
        match &config.access_token {
            Some(token) => Self::fixed(token.clone(), client),
            None => Self::metadata(config.metadata_token_url.clone(), client),
        }
    }

    pub fn fixed(token: String, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Static(token),
            client,
            cached: Mutex::new(None),
        }
    }

    pub fn metadata(url: String, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Metadata { url },
            client,
            cached: Mutex::new(None),
        }
    }

    /// Return a bearer token, fetching a fresh one from the metadata server
    /// when the held token is missing or about to expire.
    #[instrument(skip(self), level = "debug")]
    pub async fn access_token(&self) -> Result<String, TokenError> {
        let url = match &self.mode {
            Mode::Static(token) => return Ok(token.clone()),
            Mode::Metadata { url } => url,
        };

        let now = Utc::now();
        let cached = self.cached.lock().clone();
        if let Some(token) = cached.filter(|t| !t.needs_refresh(now)) {
            return Ok(token.secret);
        }

        let token = self.fetch_metadata_token(url).await?;
        let secret = token.secret.clone();
        *self.cached.lock() = Some(token);
        Ok(secret)
    }

    async fn fetch_metadata_token(&self, url: &str) -> Result<AccessToken, TokenError> {
        tracing::debug!("Requesting access token from metadata server");

        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TokenError::Metadata {
                status: status.as_u16(),
                message,
            });
        }

        let body: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(TokenError::InvalidResponse("empty access_token".to_string()));
        }

        let expires_at = Duration::try_seconds(body.expires_in)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::InvalidResponse(format!("expires_in out of range: {}", body.expires_in))
            })?;

        tracing::info!("Obtained access token valid for {}s", body.expires_in);
        Ok(AccessToken {
            secret: body.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_needs_refresh_margin() {
        let now = Utc::now();
        let fresh = AccessToken {
            secret: "a".into(),
            expires_at: now + Duration::seconds(3600),
        };
        let expiring = AccessToken {
            secret: "b".into(),
            expires_at: now + Duration::seconds(120),
        };
        assert!(!fresh.needs_refresh(now));
        assert!(expiring.needs_refresh(now));
    }

    #[test]
    fn test_debug_hides_secret() {
        let provider = TokenProvider::fixed("ya29.secret".into(), reqwest::Client::new());
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("ya29"));
        assert!(debug.contains("static"));
    }

    #[tokio::test]
    async fn test_static_token_returned_without_network() {
        let provider = TokenProvider::fixed("ya29.local".into(), reqwest::Client::new());
        assert_eq!(provider.access_token().await.unwrap(), "ya29.local");
    }

    #[tokio::test]
    async fn test_metadata_token_fetched_once_while_fresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.meta",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            TokenProvider::metadata(format!("{}/token", server.uri()), reqwest::Client::new());
        assert_eq!(provider.access_token().await.unwrap(), "ya29.meta");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.meta");
    }

    #[tokio::test]
    async fn test_metadata_token_refetched_when_expiring() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.short",
                "expires_in": 60
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider =
            TokenProvider::metadata(format!("{}/token", server.uri()), reqwest::Client::new());
        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata_expiry_out_of_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.forever",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let provider =
            TokenProvider::metadata(format!("{}/token", server.uri()), reqwest::Client::new());
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, TokenError::InvalidResponse(ref m) if m.contains("expires_in")));
    }

    #[tokio::test]
    async fn test_metadata_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not on GCE"))
            .mount(&server)
            .await;

        let provider =
            TokenProvider::metadata(format!("{}/token", server.uri()), reqwest::Client::new());
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Metadata { status: 404, .. }));
    }
}
