pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod store;

use anyhow::Result;
use pipeline::{Pipeline, Stage};
use tracing::debug;

pub enum AppCommand {
    Run,
    Schedule,
    Stage(Stage),
    InitTable,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = crate::core::config::AppConfig::resolve(config_path)?;
    debug!(
        dump_dir = %config.dump_dir.display(),
        table = %config.database.table,
        "Loaded config"
    );

    let pipeline = Pipeline::from_config(&config)?;

    match command {
        AppCommand::Run => cli::run::run(&pipeline).await,
        AppCommand::Schedule => {
            cli::schedule::run(&pipeline, config.schedule.interval(), None).await
        }
        AppCommand::Stage(stage) => pipeline.run_stage(stage).await,
        AppCommand::InitTable => {
            pipeline.init_table().await?;
            tracing::info!("Table {} is ready", pipeline.table());
            Ok(())
        }
    }
}
