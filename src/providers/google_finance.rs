use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::core::rate::ExchangeRateSource;

/// Scrapes the USD to home currency quote from a Google Finance quote page.
pub struct GoogleFinanceRateProvider {
    base_url: String,
    home_currency: String,
    selector_class: String,
}

impl GoogleFinanceRateProvider {
    pub fn new(base_url: &str, home_currency: &str, selector_class: &str) -> Self {
        GoogleFinanceRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            home_currency: home_currency.to_string(),
            selector_class: selector_class.to_string(),
        }
    }

    fn quote_url(&self) -> String {
        format!(
            "{}/finance/quote/USD-{}",
            self.base_url, self.home_currency
        )
    }
}

/// Returns the text between the opening tag of the first element whose class
/// attribute is exactly `class` and the next tag boundary.
fn extract_element_text<'a>(html: &'a str, class: &str) -> Option<&'a str> {
    let start = [format!("class=\"{class}\""), format!("class='{class}'")]
        .iter()
        .filter_map(|needle| html.find(needle.as_str()))
        .min()?;
    let rest = &html[start..];
    let open_end = rest.find('>')?;
    let text = &rest[open_end + 1..];
    let close = text.find('<')?;
    let value = text[..close].trim();
    (!value.is_empty()).then_some(value)
}

#[async_trait]
impl ExchangeRateSource for GoogleFinanceRateProvider {
    #[instrument(
        name = "GoogleFinanceRateFetch",
        skip(self),
        fields(currency = %self.home_currency)
    )]
    async fn fetch_quote(&self) -> Result<String> {
        let url = self.quote_url();
        debug!("Requesting exchange rate page from {}", url);

        let client = reqwest::Client::builder().user_agent("bpi-etl/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: USD-{}",
                response.status(),
                self.home_currency
            ));
        }

        let body = response.text().await?;
        let quote = extract_element_text(&body, &self.selector_class).ok_or_else(|| {
            anyhow!(
                "No element with class '{}' found for currency pair: USD-{}",
                self.selector_class,
                self.home_currency
            )
        })?;

        debug!(quote = %quote, "Scraped exchange rate");
        Ok(quote.to_string())
    }
}
