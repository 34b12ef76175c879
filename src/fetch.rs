use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::settings::Settings;

const BASE_BACKOFF_MS: u64 = 2000;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Page-number-indexed source of listing markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, page: u32) -> Result<String, FetchError>;
}

/// Fetches listing pages over HTTP, retrying rate limits and server errors.
pub struct HttpPageSource {
    client: reqwest::Client,
    settings: Settings,
}

impl HttpPageSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("pl,en-US;q=0.7,en;q=0.3"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    async fn fetch_once(&self, page: u32) -> Result<String, FetchError> {
        let url = self.settings.page_url(page);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { page, status });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, page: u32) -> Result<String, FetchError> {
        let max_retries = self.settings.max_retries;
        let mut attempt = 0;
        loop {
            match self.fetch_once(page).await {
                Ok(body) => {
                    info!(page, size = body.chars().count(), "Fetched page");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        page,
                        attempt = attempt + 1,
                        max_retries,
                        backoff_secs = backoff.as_secs_f64(),
                        "Fetch failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
