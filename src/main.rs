use anyhow::Result;
use bpi_etl::core::log::init_logging;
use bpi_etl::pipeline::Stage;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Prepare,
    ExtractRate,
    ExtractIndex,
    Transform,
    Load,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Stage {
        match stage {
            StageArg::Prepare => Stage::Prepare,
            StageArg::ExtractRate => Stage::ExtractRate,
            StageArg::ExtractIndex => Stage::ExtractIndex,
            StageArg::Transform => Stage::Transform,
            StageArg::Load => Stage::Load,
        }
    }
}

impl From<Commands> for bpi_etl::AppCommand {
    fn from(cmd: Commands) -> bpi_etl::AppCommand {
        match cmd {
            Commands::Run => bpi_etl::AppCommand::Run,
            Commands::Schedule => bpi_etl::AppCommand::Schedule,
            Commands::Stage { stage } => bpi_etl::AppCommand::Stage(stage.into()),
            Commands::InitTable => bpi_etl::AppCommand::InitTable,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the whole pipeline once
    Run,
    /// Run the pipeline on the configured interval
    Schedule,
    /// Run a single stage, exchanging artifacts through the dump directory
    Stage {
        #[arg(value_enum)]
        stage: StageArg,
    },
    /// Create the target table if it does not exist
    InitTable,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => bpi_etl::cli::setup::setup(),
        Some(cmd) => bpi_etl::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
