//! The four-stage pipeline: prepare, extract (rate and index), transform, load

pub mod extract;
pub mod load;
pub mod retry;
pub mod transform;
pub mod workspace;

use crate::core::config::AppConfig;
use crate::core::index::PriceIndexSource;
use crate::core::rate::ExchangeRateSource;
use crate::core::record::NormalizedRecord;
use crate::core::table::Table;
use crate::providers::{CoindeskProvider, GoogleFinanceRateProvider};
use crate::store::sql::SqlWarehouse;
use anyhow::Result;
use chrono::Utc;
use load::LoadReport;
use retry::{RetryPolicy, with_retry};
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;
use workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    ExtractRate,
    ExtractIndex,
    Transform,
    Load,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::Prepare => "prepare",
                Stage::ExtractRate => "extract-rate",
                Stage::ExtractIndex => "extract-index",
                Stage::Transform => "transform",
                Stage::Load => "load",
            }
        )
    }
}

/// Outcome of one full run. Degraded success shows up as `used_fallback_rate`
/// or `rows_inserted == 0`.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Currency the USD index was restated in. The record column keeps its
    /// `bpi_idr_rate_float` name whatever this is.
    pub home_currency: String,
    pub used_fallback_rate: bool,
    pub exchange_rate: f64,
    pub record: NormalizedRecord,
    pub load: LoadReport,
}

pub struct Pipeline {
    workspace: Workspace,
    rate_source: Arc<dyn ExchangeRateSource>,
    index_source: Arc<dyn PriceIndexSource>,
    home_currency: String,
    fallback_rate: String,
    database_url: String,
    table: String,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        rate_source: Arc<dyn ExchangeRateSource>,
        index_source: Arc<dyn PriceIndexSource>,
    ) -> Result<Self> {
        Ok(Self {
            workspace: Workspace::new(&config.dump_dir),
            rate_source,
            index_source,
            home_currency: config.home_currency.clone(),
            fallback_rate: config.fallback_rate.clone(),
            database_url: config.database.connection_url()?,
            table: config.database.table.clone(),
            retry: RetryPolicy {
                retries: config.schedule.retries,
                delay: config.schedule.retry_delay(),
            },
        })
    }

    /// Builds the pipeline against the configured live endpoints.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let google = &config.providers.google_finance;
        let rate_source = Arc::new(GoogleFinanceRateProvider::new(
            &google.base_url,
            &config.home_currency,
            &google.selector_class,
        ));
        let index_source = Arc::new(CoindeskProvider::new(&config.providers.coindesk.base_url));
        Self::new(config, rate_source, index_source)
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Runs every stage once. Each stage is retried on its own; the two
    /// extractions run concurrently and both must finish before transform.
    pub async fn run(&self) -> Result<RunReport> {
        let this = self;
        info!("Starting pipeline run");

        with_retry(
            "prepare",
            move || async move { this.workspace.prepare() },
            this.retry,
        )
        .await?;

        let (quote, document) = futures::future::join(
            with_retry(
                "extract-rate",
                move || async move {
                    extract::extract_exchange_rate(
                        this.rate_source.as_ref(),
                        &this.fallback_rate,
                        &this.workspace,
                    )
                    .await
                },
                this.retry,
            ),
            with_retry(
                "extract-index",
                move || async move {
                    extract::extract_price_index(this.index_source.as_ref(), &this.workspace).await
                },
                this.retry,
            ),
        )
        .await;
        let quote = quote?;
        let document = document?;

        let document = &document;
        let rate_text = quote.text.as_str();
        let transformed = with_retry(
            "transform",
            move || async move {
                transform::run_transform(&this.workspace, document, rate_text, Utc::now())
            },
            this.retry,
        )
        .await?;

        let rows = transformed.record.to_table();
        let rows = &rows;
        let load = with_retry(
            "load",
            move || async move { this.load_rows(rows).await },
            this.retry,
        )
        .await?;

        info!(
            used_fallback_rate = quote.used_fallback,
            rows_inserted = load.rows_inserted,
            "Pipeline run finished"
        );
        Ok(RunReport {
            home_currency: this.home_currency.clone(),
            used_fallback_rate: quote.used_fallback,
            exchange_rate: transformed.exchange_rate,
            record: transformed.record,
            load,
        })
    }

    /// Runs a single stage with artifact handoff through the dump directory.
    /// No retry is applied; the external trigger owns that.
    pub async fn run_stage(&self, stage: Stage) -> Result<()> {
        info!("Running stage {}", stage);
        match stage {
            Stage::Prepare => self.workspace.prepare(),
            Stage::ExtractRate => {
                extract::extract_exchange_rate(
                    self.rate_source.as_ref(),
                    &self.fallback_rate,
                    &self.workspace,
                )
                .await?;
                Ok(())
            }
            Stage::ExtractIndex => {
                extract::extract_price_index(self.index_source.as_ref(), &self.workspace).await?;
                Ok(())
            }
            Stage::Transform => {
                let document = self.workspace.read_extracted()?;
                let rate_text = self.workspace.read_exchange_rate()?;
                transform::run_transform(&self.workspace, &document, &rate_text, Utc::now())?;
                Ok(())
            }
            Stage::Load => {
                let rows = self.workspace.read_transformed()?;
                self.load_rows(&rows).await?;
                Ok(())
            }
        }
    }

    /// Creates the target table with the record's columns if it is missing.
    pub async fn init_table(&self) -> Result<()> {
        let warehouse = SqlWarehouse::connect(&self.database_url).await?;
        let result = warehouse.create_table(&self.table).await;
        warehouse.close().await;
        result
    }

    async fn load_rows(&self, rows: &Table) -> Result<LoadReport> {
        let warehouse = SqlWarehouse::connect(&self.database_url).await?;
        let result = load::load(&warehouse, &self.table, rows, &self.workspace).await;
        warehouse.close().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = [
            Stage::Prepare,
            Stage::ExtractRate,
            Stage::ExtractIndex,
            Stage::Transform,
            Stage::Load,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            names,
            ["prepare", "extract-rate", "extract-index", "transform", "load"]
        );
    }
}
