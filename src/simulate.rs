use crate::cli::SimulateArgs;
use anyhow::{Context, Result};
use fitts_core::{Position, StudyResults};
use fitts_experiment::{Autopilot, CalibrationStore, FileCalibrationStore, StudyConfig, StudySession};
use fitts_export::{ResultTables, UploadPayload};
use fitts_timing::ManualTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

/// Runs the configured study with a scripted pointer, then exports (and,
/// when enabled, uploads) the results like a windowed run would.
pub fn run(config: &StudyConfig, args: &SimulateArgs) -> Result<PathBuf> {
    let scale = match args.scale {
        Some(scale) => scale,
        None => FileCalibrationStore::default_location()
            .map(|store| store.load_or_default())
            .unwrap_or(fitts_experiment::calibration::DEFAULT_SCALE),
    };
    let plan = config.validate(scale)?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let viewport = (f64::from(args.width), f64::from(args.height));
    let mut session = StudySession::new(ManualTimer::new(), rng, viewport);
    let mut pilot = Autopilot::new(args.speed, Position::new(viewport.0 / 2.0, viewport.1 / 2.0))
        .with_jitter(args.jitter);

    log::info!(
        "Simulating {} tasks of {} targets at {} px/s",
        plan.task_count(),
        plan.target_count,
        args.speed
    );
    let results = fitts_experiment::run_headless(
        &mut session,
        &mut pilot,
        config.participant.clone(),
        &plan,
    )
    .context("simulated study failed")?;

    log_summary(&results);
    let path = fitts_export::export_results(&results, &config.results_dir)?;

    if config.server.upload {
        if let Err(e) = upload(config, &results) {
            log::error!("Upload failed, results kept locally: {:#}", e);
        }
    }
    Ok(path)
}

fn upload(config: &StudyConfig, results: &StudyResults) -> Result<()> {
    let tables = ResultTables::from_results(results)?;
    let payload = UploadPayload::new(results.session.file_stem(), &tables);
    let rt = tokio::runtime::Runtime::new().context("failed to start upload runtime")?;
    rt.block_on(async {
        let client = reqwest::Client::new();
        fitts_export::upload(&client, &config.server.url, &payload).await
    })?;
    Ok(())
}

fn log_summary(results: &StudyResults) {
    for task in &results.tasks {
        log::info!(
            "task {}: A={} W={} MT={:.1}ms err={:.1}% TP={:.2}",
            task.task_index,
            task.amplitude,
            task.width,
            task.mean_time_ms,
            task.error_pct,
            task.throughput
        );
    }
    log::info!(
        "overall: MT={:.1}ms err={:.1}% TP={:.2}",
        results.overall.mean_time_ms,
        results.overall.error_pct,
        results.overall.throughput
    );
}
