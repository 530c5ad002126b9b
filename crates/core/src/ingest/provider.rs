use crate::config::Settings;
use crate::domain::contract::parse_payload;
use crate::domain::recommendation::{Mode, Payload};
use crate::error::DashboardError;
use anyhow::Context;

#[async_trait::async_trait]
pub trait PayloadSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_payload(&self, mode: Option<Mode>) -> Result<Payload, DashboardError>;
}

/// Single GET against the recommendations endpoint. No retries: a failure is reported once and
/// the caller decides whether to try again.
#[derive(Debug, Clone)]
pub struct HttpPayloadSource {
    http: reqwest::Client,
    url: String,
}

impl HttpPayloadSource {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let url = settings.require_endpoint_url()?.to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed to build recommendations http client")?;

        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl PayloadSource for HttpPayloadSource {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch_payload(&self, mode: Option<Mode>) -> Result<Payload, DashboardError> {
        let mut req = self.http.get(&self.url);
        if let Some(mode) = mode {
            req = req.query(&[("mode", mode.as_str())]);
        }

        let res = req
            .send()
            .await
            .map_err(|e| DashboardError::Fetch(format!("request failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(DashboardError::Fetch(format!("HTTP {status}")));
        }

        let text = res
            .text()
            .await
            .map_err(|e| DashboardError::Fetch(format!("failed to read response body: {e}")))?;

        let payload = parse_payload(&text)?;
        tracing::info!(
            url = %self.url,
            mode = mode.map(Mode::as_str).unwrap_or("default"),
            run_id = payload.run_id.as_deref().unwrap_or(""),
            records = payload.recommendations.len(),
            "fetched recommendations"
        );
        Ok(payload)
    }
}
