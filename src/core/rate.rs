//! Exchange rate abstractions

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Source of the quoted USD to home currency rate, as the page displays it.
#[async_trait]
pub trait ExchangeRateSource: Send + Sync {
    async fn fetch_quote(&self) -> Result<String>;
}

/// Output of the rate extraction stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub text: String,
    pub used_fallback: bool,
}

impl RateQuote {
    pub fn live(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: false,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: true,
        }
    }
}

/// Rounds to two decimal places from the exact binary value, so `2.675`
/// (stored just below the tie) becomes `2.67`. Exact ties go to even.
pub fn round2(value: f64) -> Result<f64> {
    Decimal::from_f64_retain(value)
        .and_then(|d| d.round_dp(2).to_f64())
        .ok_or_else(|| anyhow!("Cannot round non-finite value: {value}"))
}

/// Parses quoted rate text such as `15,750.30`, dropping thousands separators
/// and rounding to two decimal places.
pub fn parse_rate(text: &str) -> Result<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    let rate: f64 = cleaned
        .parse()
        .with_context(|| format!("Invalid exchange rate: {text:?}"))?;
    round2(rate).with_context(|| format!("Invalid exchange rate: {text:?}"))
}
