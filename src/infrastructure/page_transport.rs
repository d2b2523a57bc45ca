// HTTP transport for SensorThings observation pages
use crate::domain::observation::ObservationPage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Fetches and decodes one page at an absolute URL.
    async fn get_page(&self, url: &str) -> Result<ObservationPage>;
}

#[derive(Debug, Clone)]
pub struct HttpPageTransport {
    client: reqwest::Client,
}

impl HttpPageTransport {
    /// Every page request is bounded by `timeout`; expiry fails the fetch.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageTransport for HttpPageTransport {
    async fn get_page(&self, url: &str) -> Result<ObservationPage> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to SensorThings server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("SensorThings request failed with status {}: {}", status, body);
        }

        response
            .json::<ObservationPage>()
            .await
            .context("Failed to parse SensorThings observation page")
    }
}
