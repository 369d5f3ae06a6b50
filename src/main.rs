mod app;
mod cli;
mod runtime;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, StudyArgs};
use fitts_experiment::{FileCalibrationStore, StudyConfig};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(StudyArgs::default())) {
        Command::Run(args) => {
            let config = load_config(&cli.config, &args)?;
            let store = FileCalibrationStore::default_location()?;
            log::info!("Calibration stored at {}", store.path().display());
            app::App::new(config, Box::new(store))?.run()
        }
        Command::Simulate(args) => {
            let config = load_config(&cli.config, &args.study)?;
            let path = simulate::run(&config, &args)?;
            log::info!("Simulated results in {}", path.display());
            Ok(())
        }
        Command::Listen { addr } => {
            let rt = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            rt.block_on(fitts_remote::listen(&addr))?;
            Ok(())
        }
        Command::Receive { addr, data_dir } => {
            let rt = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            rt.block_on(fitts_export::receive(&addr, data_dir))?;
            Ok(())
        }
    }
}

fn load_config(path: &Option<std::path::PathBuf>, args: &StudyArgs) -> Result<StudyConfig> {
    let mut config = StudyConfig::load(path.as_deref())?;
    args.apply(&mut config)?;
    Ok(config)
}
