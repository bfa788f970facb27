//! Reshapes the price index and exchange rate into a [`NormalizedRecord`]

use super::workspace::Workspace;
use crate::core::index::{CurrencyIndex, PriceIndexDocument};
use crate::core::rate::{parse_rate, round2};
use crate::core::record::NormalizedRecord;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TARGET_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;

const UPDATED_FORMAT: &str = "%b %d, %Y %H:%M:%S";
// Length of the trailing " UTC" suffix on `time.updated`.
const UPDATED_ZONE_SUFFIX_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub record: NormalizedRecord,
    pub exchange_rate: f64,
}

/// Home currency value of the USD index, rounded like every other rate.
fn convert(usd_rate: f64, exchange_rate: f64) -> Result<f64> {
    round2(usd_rate * exchange_rate)
        .with_context(|| format!("Cannot convert USD rate: {usd_rate} * {exchange_rate}"))
}

/// `Dec 01, 2022 12:00:00 UTC` becomes `2022-12-01 12:00:00`. The zone suffix is
/// dropped, not interpreted.
pub fn reformat_updated(updated: &str) -> Result<String> {
    let trimmed = updated
        .len()
        .checked_sub(UPDATED_ZONE_SUFFIX_LEN)
        .and_then(|end| updated.get(..end))
        .ok_or_else(|| anyhow!("Update time too short: {updated:?}"))?;
    let parsed = NaiveDateTime::parse_from_str(trimmed, UPDATED_FORMAT)
        .with_context(|| format!("Invalid update time: {updated:?}"))?;
    Ok(parsed.format(TIMESTAMP_FORMAT).to_string())
}

/// Re-renders an ISO-8601 timestamp keeping its wall-clock fields; any offset
/// is discarded without conversion.
pub fn reformat_updated_iso(updated_iso: &str) -> Result<String> {
    let parsed = match DateTime::parse_from_rfc3339(updated_iso) {
        Ok(dt) => dt.naive_local(),
        Err(_) => NaiveDateTime::parse_from_str(updated_iso, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(updated_iso, "%Y-%m-%d %H:%M:%S%.f"))
            .with_context(|| format!("Invalid ISO update time: {updated_iso:?}"))?,
    };
    Ok(parsed.format(TIMESTAMP_FORMAT).to_string())
}

/// Run timestamp: `now` without sub-seconds, in the target time zone.
pub fn localize_run_time(now: DateTime<Utc>) -> String {
    now.trunc_subsecs(0)
        .with_timezone(&TARGET_TIMEZONE)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

pub fn transform(
    document: &serde_json::Value,
    rate_text: &str,
    now: DateTime<Utc>,
) -> Result<Transformed> {
    let exchange_rate = parse_rate(rate_text)?;
    let doc = PriceIndexDocument::from_json(document)?;

    let time_updated = reformat_updated(&doc.time.updated)?;
    let time_updated_iso = reformat_updated_iso(&doc.time.updated_iso)?;
    let last_update = localize_run_time(now);

    let usd: &CurrencyIndex = doc.currency("USD")?;
    let gbp = doc.currency("GBP")?;
    let eur = doc.currency("EUR")?;

    let record = NormalizedRecord {
        disclaimer: doc.disclaimer.clone(),
        chart_name: doc.chart_name.clone(),
        time_updated,
        time_updated_iso,
        bpi_usd_code: usd.code.clone(),
        bpi_usd_rate_float: round2(usd.rate_float)?,
        bpi_usd_description: usd.description.clone(),
        bpi_gbp_code: gbp.code.clone(),
        bpi_gbp_rate_float: round2(gbp.rate_float)?,
        bpi_gbp_description: gbp.description.clone(),
        bpi_eur_code: eur.code.clone(),
        bpi_eur_rate_float: round2(eur.rate_float)?,
        bpi_eur_description: eur.description.clone(),
        bpi_idr_rate_float: convert(usd.rate_float, exchange_rate)?,
        last_update,
    };

    Ok(Transformed {
        record,
        exchange_rate,
    })
}

/// Transforms and writes `2_transformed_data.csv` and `2_transformed_exchange_rate.txt`.
pub fn run_transform(
    workspace: &Workspace,
    document: &serde_json::Value,
    rate_text: &str,
    now: DateTime<Utc>,
) -> Result<Transformed> {
    info!("Transforming all data");

    let transformed = transform(document, rate_text, now)?;
    workspace.write_transformed(&transformed.record, transformed.exchange_rate)?;

    info!("Rate exchange: {}", transformed.exchange_rate);
    debug!(
        "Main data: {}",
        serde_json::to_string_pretty(&transformed.record)?
    );
    Ok(transformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::workspace::{TRANSFORMED_DATA_FILE, TRANSFORMED_RATE_FILE};
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn document(usd: f64, gbp: f64, eur: f64) -> serde_json::Value {
        json!({
            "time": {
                "updated": "Dec 01, 2022 12:00:00 UTC",
                "updatedISO": "2022-12-01T12:00:00+00:00",
                "updateduk": "Dec 1, 2022 at 12:00 GMT"
            },
            "disclaimer": "This data was produced from the CoinDesk Bitcoin Price Index (USD).",
            "chartName": "Bitcoin",
            "bpi": {
                "USD": {"code": "USD", "symbol": "&#36;", "rate": "x", "description": "United States Dollar", "rate_float": usd},
                "GBP": {"code": "GBP", "symbol": "&pound;", "rate": "x", "description": "British Pound Sterling", "rate_float": gbp},
                "EUR": {"code": "EUR", "symbol": "&euro;", "rate": "x", "description": "Euro", "rate_float": eur}
            }
        })
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 12, 1, 12, 30, 15).unwrap()
            + chrono::Duration::milliseconds(789)
    }

    #[test]
    fn test_reformat_updated() {
        assert_eq!(
            reformat_updated("Dec 01, 2022 12:00:00 UTC").unwrap(),
            "2022-12-01 12:00:00"
        );
        assert_eq!(
            reformat_updated("Jan 5, 2023 08:15:42 UTC").unwrap(),
            "2023-01-05 08:15:42"
        );
        assert!(reformat_updated("UTC").is_err());
        assert!(reformat_updated("yesterday UTC").is_err());
    }

    #[test]
    fn test_reformat_updated_iso_drops_offset() {
        assert_eq!(
            reformat_updated_iso("2022-12-01T12:00:00+00:00").unwrap(),
            "2022-12-01 12:00:00"
        );
        assert_eq!(
            reformat_updated_iso("2022-12-01T12:00:00+07:00").unwrap(),
            "2022-12-01 12:00:00"
        );
        assert_eq!(
            reformat_updated_iso("2022-12-01T12:00:00").unwrap(),
            "2022-12-01 12:00:00"
        );
        assert!(reformat_updated_iso("not a date").is_err());
    }

    #[test]
    fn test_localize_run_time_is_utc_plus_seven() {
        assert_eq!(localize_run_time(fixed_now()), "2022-12-01 19:30:15");
        let late = Utc.with_ymd_and_hms(2022, 12, 31, 20, 0, 0).unwrap();
        assert_eq!(localize_run_time(late), "2023-01-01 03:00:00");
    }

    #[test]
    fn test_convert_rounds_the_float_product() {
        assert_eq!(convert(1.015, 1.0).unwrap(), 1.01);
        assert_eq!(convert(42000.123, 15750.30).unwrap(), 661514537.29);
        assert!(convert(f64::MAX, 2.0).is_err());
    }

    #[test]
    fn test_derived_rate() {
        let transformed = transform(&document(42000.123, 35000.0, 40000.0), "15,750.30", fixed_now())
            .unwrap();
        assert_eq!(transformed.exchange_rate, 15750.30);
        assert_eq!(transformed.record.bpi_idr_rate_float, 661514537.29);
        assert_eq!(transformed.record.bpi_usd_rate_float, 42000.12);
    }

    #[test]
    fn test_transform_maps_every_field() {
        let transformed =
            transform(&document(100.0, 80.0, 90.0), "1.00", fixed_now()).unwrap();
        let record = transformed.record;

        assert_eq!(transformed.exchange_rate, 1.0);
        assert_eq!(record.chart_name, "Bitcoin");
        assert!(record.disclaimer.starts_with("This data was produced"));
        assert_eq!(record.time_updated, "2022-12-01 12:00:00");
        assert_eq!(record.time_updated_iso, "2022-12-01 12:00:00");
        assert_eq!(record.bpi_usd_code, "USD");
        assert_eq!(record.bpi_usd_rate_float, 100.0);
        assert_eq!(record.bpi_usd_description, "United States Dollar");
        assert_eq!(record.bpi_gbp_code, "GBP");
        assert_eq!(record.bpi_gbp_rate_float, 80.0);
        assert_eq!(record.bpi_gbp_description, "British Pound Sterling");
        assert_eq!(record.bpi_eur_code, "EUR");
        assert_eq!(record.bpi_eur_rate_float, 90.0);
        assert_eq!(record.bpi_eur_description, "Euro");
        assert_eq!(record.bpi_idr_rate_float, 100.0);
        assert_eq!(record.last_update, "2022-12-01 19:30:15");
    }

    #[test]
    fn test_missing_currency_fails() {
        let mut doc = document(100.0, 80.0, 90.0);
        doc["bpi"].as_object_mut().unwrap().remove("EUR");

        let err = transform(&doc, "1.00", fixed_now()).unwrap_err();
        assert_eq!(err.to_string(), "Price index has no entry for currency: EUR");
    }

    #[test]
    fn test_bad_rate_fails() {
        let result = transform(&document(100.0, 80.0, 90.0), "", fixed_now());
        assert!(result.is_err());
    }

    #[test]
    fn test_run_transform_writes_artifacts() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());

        run_transform(&workspace, &document(100.0, 80.0, 90.0), "15,750.30", fixed_now())
            .unwrap();

        let rate = std::fs::read_to_string(workspace.path(TRANSFORMED_RATE_FILE)).unwrap();
        assert_eq!(rate, "15750.3");

        let csv = std::fs::read_to_string(workspace.path(TRANSFORMED_DATA_FILE)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), NormalizedRecord::COLUMNS.join(","));
        assert!(lines.next().unwrap().ends_with(",1575030.0,2022-12-01 19:30:15"));
        assert!(lines.next().is_none());

        let table = workspace.read_transformed().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns.len(), NormalizedRecord::COLUMNS.len());
    }
}
