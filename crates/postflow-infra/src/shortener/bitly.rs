//! Bitly v3 `shorten` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use postflow_core::ports::{LinkShortener, ShortenError};

pub const DEFAULT_API_URL: &str = "https://api-ssl.bitly.com";

/// Bitly client configuration. Built once at startup and handed to the
/// client; credentials are never read from the environment afterwards.
#[derive(Debug, Clone)]
pub struct BitlyConfig {
    pub access_token: Option<String>,
    pub login: Option<String>,
    pub api_key: Option<String>,
    /// Base URL of the API, without the `/v3/...` path.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for BitlyConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            login: None,
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl BitlyConfig {
    /// Load configuration from environment variables. Empty values count as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            access_token: var("BITLY_ACCESS_TOKEN"),
            login: var("BITLY_LOGIN"),
            api_key: var("BITLY_API_KEY"),
            api_url: var("BITLY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(
                var("BITLY_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }

    /// All three credentials, or the name of the first one missing.
    fn credentials(&self) -> Result<Credentials<'_>, ShortenError> {
        fn require<'a>(
            value: &'a Option<String>,
            name: &'static str,
        ) -> Result<&'a str, ShortenError> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or(ShortenError::Configuration(name))
        }

        Ok(Credentials {
            access_token: require(&self.access_token, "BITLY_ACCESS_TOKEN")?,
            login: require(&self.login, "BITLY_LOGIN")?,
            api_key: require(&self.api_key, "BITLY_API_KEY")?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

struct Credentials<'a> {
    access_token: &'a str,
    login: &'a str,
    api_key: &'a str,
}

/// v3 response envelope. `data` is an object on success and `[]` on error.
#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: u16,
    status_txt: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Bitly-backed [`LinkShortener`].
pub struct BitlyShortener {
    client: Client,
    config: BitlyConfig,
}

impl BitlyShortener {
    pub fn new(config: BitlyConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/shorten", self.config.api_url.trim_end_matches('/'))
    }
}

/// Map a Bitly status onto the error taxonomy.
fn classify(status: u16, status_txt: &str) -> ShortenError {
    match status_txt {
        "INVALID_LOGIN"
        | "INVALID_APIKEY"
        | "INVALID_ACCESS_TOKEN"
        | "INVALID_ARG_ACCESS_TOKEN" => {
            ShortenError::Authentication(status_txt.to_string())
        }
        "RATE_LIMIT_EXCEEDED" => ShortenError::RateLimited,
        _ if status == 401 || status == 403 => ShortenError::Authentication(status_txt.to_string()),
        _ if status == 429 => ShortenError::RateLimited,
        _ => ShortenError::Api {
            status,
            message: status_txt.to_string(),
        },
    }
}

#[async_trait]
impl LinkShortener for BitlyShortener {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        let creds = self.config.credentials()?;

        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("access_token", creds.access_token),
                ("login", creds.login),
                ("apiKey", creds.api_key),
                ("longUrl", long_url),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| ShortenError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShortenError::Network(e.to_string()))?;

        if !status.is_success() {
            let status_txt = serde_json::from_str::<Envelope>(&body)
                .map(|env| env.status_txt)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            tracing::debug!(
                status = status.as_u16(),
                body = %body,
                "Bitly returned an error status"
            );
            return Err(classify(status.as_u16(), &status_txt));
        }

        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| ShortenError::InvalidResponse(e.to_string()))?;

        if envelope.status_code != StatusCode::OK.as_u16() {
            return Err(classify(envelope.status_code, &envelope.status_txt));
        }

        envelope
            .data
            .get("url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| ShortenError::InvalidResponse("missing data.url".to_string()))
    }
}
