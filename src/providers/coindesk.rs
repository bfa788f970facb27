use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::core::index::PriceIndexSource;

const CURRENT_PRICE_PATH: &str = "/v1/bpi/currentprice.json";

/// Fetches the current Bitcoin Price Index document from the CoinDesk API.
pub struct CoindeskProvider {
    base_url: String,
}

impl CoindeskProvider {
    pub fn new(base_url: &str) -> Self {
        CoindeskProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceIndexSource for CoindeskProvider {
    #[instrument(name = "CoindeskIndexFetch", skip(self))]
    async fn fetch_index(&self) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, CURRENT_PRICE_PATH);
        debug!("Requesting price index from {}", url);

        let client = reqwest::Client::builder().user_agent("bpi-etl/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for price index: {}",
                response.status(),
                url
            ));
        }

        let text = response.text().await?;
        let data: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {url}"))?;

        debug!(document = %data, "Received price index");
        Ok(data)
    }
}
