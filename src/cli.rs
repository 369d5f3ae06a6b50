use clap::{Args, Parser, Subcommand};
use fitts_core::ConfigError;
use fitts_experiment::StudyConfig;
use fitts_experiment::config::parse_number_list;
use fitts_export::{DEFAULT_DATA_DIR, DEFAULT_RECEIVER_ADDR};
use fitts_remote::DEFAULT_LISTEN_ADDR;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "webfitts", version, about = "Fitts's-Law pointing study with throughput analysis")]
pub struct Cli {
    /// Study configuration file (TOML). Defaults to ./fitts.toml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the study window (default).
    Run(StudyArgs),
    /// Drive a study headless with a scripted pointer and export the results.
    Simulate(SimulateArgs),
    /// Accept remote-bridge connections and log what studies send.
    Listen {
        #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
        addr: String,
    },
    /// Collect uploaded results over HTTP and write them to disk.
    Receive {
        #[arg(long, default_value = DEFAULT_RECEIVER_ADDR)]
        addr: String,
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
}

/// Overrides layered on top of the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct StudyArgs {
    #[arg(long)]
    pub participant: Option<String>,
    #[arg(long)]
    pub session: Option<String>,
    #[arg(long)]
    pub condition: Option<String>,
    #[arg(long)]
    pub hand: Option<String>,
    #[arg(long)]
    pub device: Option<String>,
    #[arg(long)]
    pub experience: Option<String>,
    /// Comma separated amplitudes in pixels, e.g. "256,512".
    #[arg(long)]
    pub amplitudes: Option<String>,
    /// Comma separated target widths in pixels.
    #[arg(long)]
    pub widths: Option<String>,
    /// Targets per ring.
    #[arg(long)]
    pub targets: Option<usize>,
    /// Remote-control bridge address, e.g. localhost:8765.
    #[arg(long)]
    pub remote: Option<String>,
    /// Upload results to the collection server when the study finishes.
    #[arg(long)]
    pub upload: bool,
    #[arg(long)]
    pub server: Option<String>,
    /// Agree to the data usage policy (required for uploads).
    #[arg(long)]
    pub accept_policy: bool,
    #[arg(long)]
    pub results_dir: Option<PathBuf>,
}

impl StudyArgs {
    pub fn apply(&self, config: &mut StudyConfig) -> Result<(), ConfigError> {
        let p = &mut config.participant;
        for (value, field) in [
            (&self.participant, &mut p.participant_code),
            (&self.session, &mut p.session_code),
            (&self.condition, &mut p.condition_code),
            (&self.hand, &mut p.hand_dominance),
            (&self.device, &mut p.pointing_device),
            (&self.experience, &mut p.device_experience),
        ] {
            if let Some(v) = value {
                *field = v.clone();
            }
        }

        if let Some(raw) = &self.amplitudes {
            config.amplitudes = parse_number_list("amplitude", raw)?;
        }
        if let Some(raw) = &self.widths {
            config.widths = parse_number_list("width", raw)?;
        }
        if let Some(n) = self.targets {
            config.target_count = n;
        }
        if self.remote.is_some() {
            config.remote = self.remote.clone();
        }
        if let Some(url) = &self.server {
            config.server.url = url.clone();
        }
        if let Some(dir) = &self.results_dir {
            config.results_dir = dir.clone();
        }
        config.server.upload |= self.upload;
        config.policy_accepted |= self.accept_policy;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub study: StudyArgs,
    /// Cursor speed in pixels per second.
    #[arg(long, default_value_t = 1000.0, value_parser = finite_f64)]
    pub speed: f64,
    /// Click scatter as a fraction of the target radius, 0 to 1.
    #[arg(long, default_value_t = 0.0, value_parser = finite_f64)]
    pub jitter: f64,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Calibration scale; defaults to the stored value.
    #[arg(long, value_parser = finite_f64)]
    pub scale: Option<f64>,
    #[arg(long, default_value_t = 1280)]
    pub width: u32,
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

fn finite_f64(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Ok(v) => Err(format!("expected a finite, non-negative number, got {v}")),
        Err(e) => Err(e.to_string()),
    }
}
