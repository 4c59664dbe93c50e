//! Lichess opening explorer over blocking HTTP

use reqwest::blocking::Client;
use reqwest::header::{HeaderName, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::worker::{OpeningSource, ResponseBody, SourceError, SourceResponse};

pub struct LichessExplorer {
    client: Client,
    endpoint: String,
    speeds: String,
}

impl LichessExplorer {
    pub fn new(endpoint: impl Into<String>, speeds: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("toychess/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::InvalidRequest(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            speeds: speeds.into(),
        })
    }

    /// Explorer URL for `fen`
    pub fn request_url(&self, fen: &str) -> Result<Url, SourceError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("variant", "standard"),
                ("speeds", self.speeds.as_str()),
                ("fen", fen),
            ],
        )
        .map_err(|e| SourceError::InvalidRequest(e.to_string()))
    }
}

impl OpeningSource for LichessExplorer {
    fn fetch(&mut self, fen: &str) -> Result<SourceResponse, SourceError> {
        let url = self.request_url(fen)?;
        debug!("[OPENING] GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let retry_after = header(RETRY_AFTER);
        let is_json = header(CONTENT_TYPE)
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let text = response.text().unwrap_or_default();
        let body = if is_json {
            ResponseBody::Json(serde_json::from_str(&text).unwrap_or(Value::Null))
        } else {
            ResponseBody::Text(text)
        };

        Ok(SourceResponse {
            status,
            retry_after,
            body,
        })
    }
}
