use super::workspace::Workspace;
use crate::core::index::PriceIndexSource;
use crate::core::rate::{ExchangeRateSource, RateQuote};
use anyhow::Result;
use tracing::{info, warn};

/// Fetches the quoted exchange rate. Any fetch failure is replaced by `fallback`;
/// only a failure to write the artifact is returned as an error.
pub async fn extract_exchange_rate(
    source: &dyn ExchangeRateSource,
    fallback: &str,
    workspace: &Workspace,
) -> Result<RateQuote> {
    info!("Extracting USD exchange rate");

    let quote = match source.fetch_quote().await {
        Ok(text) => {
            info!("Scraped exchange rate: {}", text);
            RateQuote::live(text)
        }
        Err(e) => {
            warn!(
                error = %e,
                "Can't scrape exchange rate, using default exchange rate: {}", fallback
            );
            RateQuote::fallback(fallback)
        }
    };

    workspace.write_exchange_rate(&quote.text)?;
    Ok(quote)
}

/// Fetches the price index document and stores it verbatim. Errors propagate.
pub async fn extract_price_index(
    source: &dyn PriceIndexSource,
    workspace: &Workspace,
) -> Result<serde_json::Value> {
    info!("Extracting price index");

    let document = source.fetch_index().await?;
    info!("Extracted price index");
    workspace.write_extracted(&document)?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::workspace::{EXCHANGE_RATE_FILE, EXTRACTED_DATA_FILE};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    struct FixedRate(&'static str);

    #[async_trait]
    impl ExchangeRateSource for FixedRate {
        async fn fetch_quote(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl ExchangeRateSource for Unreachable {
        async fn fetch_quote(&self) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    #[async_trait]
    impl PriceIndexSource for Unreachable {
        async fn fetch_index(&self) -> Result<serde_json::Value> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_live_rate_is_written() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());

        let quote = extract_exchange_rate(&FixedRate("15,750.30"), "15,000", &workspace)
            .await
            .unwrap();

        assert_eq!(quote, RateQuote::live("15,750.30"));
        let text = std::fs::read_to_string(workspace.path(EXCHANGE_RATE_FILE)).unwrap();
        assert_eq!(text, "15,750.30");
    }

    #[tokio::test]
    async fn test_fetch_failure_uses_fallback() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());

        let quote = extract_exchange_rate(&Unreachable, "15,000", &workspace)
            .await
            .unwrap();

        assert!(quote.used_fallback);
        assert_eq!(quote.text, "15,000");
        let text = std::fs::read_to_string(workspace.path(EXCHANGE_RATE_FILE)).unwrap();
        assert_eq!(text, "15,000");
    }

    #[tokio::test]
    async fn test_index_failure_propagates_without_artifact() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());

        let result = extract_price_index(&Unreachable, &workspace).await;

        assert_eq!(result.unwrap_err().to_string(), "connection refused");
        assert!(!workspace.path(EXTRACTED_DATA_FILE).exists());
    }

    #[tokio::test]
    async fn test_index_is_written_verbatim() {
        struct Fixed;

        #[async_trait]
        impl PriceIndexSource for Fixed {
            async fn fetch_index(&self) -> Result<serde_json::Value> {
                Ok(json!({"chartName": "Bitcoin", "extra": [1, 2]}))
            }
        }

        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());

        let doc = extract_price_index(&Fixed, &workspace).await.unwrap();
        assert_eq!(workspace.read_extracted().unwrap(), doc);
    }
}
