//! The flattened record persisted once per run

use super::table::{Table, Value};
use serde::Serialize;

/// Column holding the run timestamp; the warehouse table is ordered by it.
pub const RUN_TIMESTAMP_COLUMN: &str = "last_update";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub disclaimer: String,
    pub chart_name: String,
    pub time_updated: String,
    pub time_updated_iso: String,
    pub bpi_usd_code: String,
    pub bpi_usd_rate_float: f64,
    pub bpi_usd_description: String,
    pub bpi_gbp_code: String,
    pub bpi_gbp_rate_float: f64,
    pub bpi_gbp_description: String,
    pub bpi_eur_code: String,
    pub bpi_eur_rate_float: f64,
    pub bpi_eur_description: String,
    pub bpi_idr_rate_float: f64,
    pub last_update: String,
}

impl NormalizedRecord {
    pub const COLUMNS: [&'static str; 15] = [
        "disclaimer",
        "chart_name",
        "time_updated",
        "time_updated_iso",
        "bpi_usd_code",
        "bpi_usd_rate_float",
        "bpi_usd_description",
        "bpi_gbp_code",
        "bpi_gbp_rate_float",
        "bpi_gbp_description",
        "bpi_eur_code",
        "bpi_eur_rate_float",
        "bpi_eur_description",
        "bpi_idr_rate_float",
        RUN_TIMESTAMP_COLUMN,
    ];

    pub fn values(&self) -> Vec<Value> {
        vec![
            self.disclaimer.as_str().into(),
            self.chart_name.as_str().into(),
            self.time_updated.as_str().into(),
            self.time_updated_iso.as_str().into(),
            self.bpi_usd_code.as_str().into(),
            self.bpi_usd_rate_float.into(),
            self.bpi_usd_description.as_str().into(),
            self.bpi_gbp_code.as_str().into(),
            self.bpi_gbp_rate_float.into(),
            self.bpi_gbp_description.as_str().into(),
            self.bpi_eur_code.as_str().into(),
            self.bpi_eur_rate_float.into(),
            self.bpi_eur_description.as_str().into(),
            self.bpi_idr_rate_float.into(),
            self.last_update.as_str().into(),
        ]
    }

    /// Single-row table with the record's columns in persistence order.
    pub fn to_table(&self) -> Table {
        Table {
            columns: Self::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![self.values()],
        }
    }
}
