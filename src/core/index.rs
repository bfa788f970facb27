//! Price index abstractions and the typed view of the index document

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Source of the raw price index JSON document.
#[async_trait]
pub trait PriceIndexSource: Send + Sync {
    async fn fetch_index(&self) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTime {
    pub updated: String,
    #[serde(rename = "updatedISO")]
    pub updated_iso: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyIndex {
    pub code: String,
    pub rate_float: f64,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceIndexDocument {
    pub disclaimer: String,
    #[serde(rename = "chartName")]
    pub chart_name: String,
    pub time: UpdateTime,
    pub bpi: HashMap<String, CurrencyIndex>,
}

impl PriceIndexDocument {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Self::deserialize(value).context("Malformed price index document")
    }

    pub fn currency(&self, code: &str) -> Result<&CurrencyIndex> {
        self.bpi
            .get(code)
            .ok_or_else(|| anyhow!("Price index has no entry for currency: {code}"))
    }
}
