use crate::pipeline::Pipeline;
use anyhow::{Result, bail};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Runs the pipeline every `interval` until Ctrl-C, or `max_runs` runs when given.
/// The first run starts immediately. Missed ticks are skipped, never replayed.
/// A failed run is logged and does not stop the schedule.
pub async fn run(pipeline: &Pipeline, interval: Duration, max_runs: Option<usize>) -> Result<()> {
    if interval.is_zero() {
        bail!("Schedule interval must be greater than zero");
    }
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut completed = 0;

    info!("Scheduling pipeline every {:?}", interval);
    loop {
        if max_runs.is_some_and(|max| completed >= max) {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, stopping schedule");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        match pipeline.run().await {
            Ok(report) => info!(
                used_fallback_rate = report.used_fallback_rate,
                rows_inserted = report.load.rows_inserted,
                rows_in_table = report.load.loaded.len(),
                "Scheduled run succeeded"
            ),
            Err(e) => error!(error = %format!("{e:#}"), "Scheduled run failed"),
        }
        completed += 1;
    }
}
