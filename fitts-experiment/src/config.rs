use fitts_core::{ConfigError, MIN_TARGETS, SessionInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "fitts.toml";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config error: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Result upload settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Upload the result tables when a study finishes.
    pub upload: bool,
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            upload: false,
            url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

/// Study set-up as read from `fitts.toml`, `FITTS_*` variables and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub amplitudes: Vec<f64>,
    pub widths: Vec<f64>,
    pub target_count: usize,
    pub participant: SessionInfo,
    /// Participant agreed to the data usage policy.
    pub policy_accepted: bool,
    pub server: ServerConfig,
    pub results_dir: PathBuf,
    /// Remote-control bridge address, e.g. `localhost:8765`.
    pub remote: Option<String>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            amplitudes: vec![100.0, 200.0],
            widths: vec![40.0, 80.0],
            target_count: 7,
            participant: SessionInfo::default(),
            policy_accepted: false,
            server: ServerConfig::default(),
            results_dir: PathBuf::from("results"),
            remote: None,
        }
    }
}

impl StudyConfig {
    /// Layers an optional TOML file and `FITTS_*` environment variables over
    /// the defaults. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("FITTS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("amplitudes")
                    .with_list_parse_key("widths"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Checks everything a study needs before it may start and returns the
    /// plan for the given calibration scale.
    pub fn validate(&self, calibration_scale: f64) -> Result<StudyPlan, ConfigError> {
        self.participant.validate()?;
        if self.server.upload && !self.policy_accepted {
            return Err(ConfigError::PolicyNotAccepted);
        }
        StudyPlan::new(
            self.amplitudes.clone(),
            self.widths.clone(),
            self.target_count,
            calibration_scale,
        )
    }
}

/// Validated parameters for one study run.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyPlan {
    pub amplitudes: Vec<f64>,
    pub widths: Vec<f64>,
    pub target_count: usize,
    pub calibration_scale: f64,
}

impl StudyPlan {
    pub fn new(
        amplitudes: Vec<f64>,
        widths: Vec<f64>,
        target_count: usize,
        calibration_scale: f64,
    ) -> Result<Self, ConfigError> {
        if amplitudes.is_empty() {
            return Err(ConfigError::EmptyAmplitudes);
        }
        if widths.is_empty() {
            return Err(ConfigError::EmptyWidths);
        }
        check_positive("amplitude", &amplitudes)?;
        check_positive("width", &widths)?;
        if target_count < MIN_TARGETS {
            return Err(ConfigError::TooFewTargets {
                min: MIN_TARGETS,
                actual: target_count,
            });
        }
        if !(calibration_scale.is_finite() && calibration_scale > 0.0) {
            return Err(ConfigError::InvalidCalibrationScale(calibration_scale));
        }

        Ok(Self {
            amplitudes,
            widths,
            target_count,
            calibration_scale,
        })
    }

    pub fn task_count(&self) -> usize {
        self.amplitudes.len() * self.widths.len()
    }
}

fn check_positive(field: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    match values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        Some(&value) => Err(ConfigError::NonPositive { field, value }),
        None => Ok(()),
    }
}

/// Parses a comma separated list such as `"100, 200"`.
pub fn parse_number_list(field: &'static str, raw: &str) -> Result<Vec<f64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| ConfigError::InvalidNumber {
                field,
                value: s.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant() -> SessionInfo {
        SessionInfo {
            participant_code: "P1".into(),
            session_code: "S1".into(),
            condition_code: "C1".into(),
            ..SessionInfo::default()
        }
    }

    #[test]
    fn test_parse_number_list() {
        assert_eq!(
            parse_number_list("amplitude", "100, 200 ,300").unwrap(),
            vec![100.0, 200.0, 300.0]
        );
        assert_eq!(parse_number_list("width", " ").unwrap(), Vec::<f64>::new());
        assert_eq!(
            parse_number_list("width", "40,abc"),
            Err(ConfigError::InvalidNumber {
                field: "width",
                value: "abc".into()
            })
        );
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        assert_eq!(
            StudyPlan::new(vec![], vec![10.0], 7, 1.0),
            Err(ConfigError::EmptyAmplitudes)
        );
        assert_eq!(
            StudyPlan::new(vec![100.0], vec![], 7, 1.0),
            Err(ConfigError::EmptyWidths)
        );
        assert_eq!(
            StudyPlan::new(vec![100.0], vec![-1.0], 7, 1.0),
            Err(ConfigError::NonPositive {
                field: "width",
                value: -1.0
            })
        );
        assert_eq!(
            StudyPlan::new(vec![100.0], vec![10.0], 1, 1.0),
            Err(ConfigError::TooFewTargets { min: 2, actual: 1 })
        );
        assert!(matches!(
            StudyPlan::new(vec![100.0], vec![10.0], 7, 0.0),
            Err(ConfigError::InvalidCalibrationScale(_))
        ));
    }

    #[test]
    fn test_validate_requires_policy_when_uploading() {
        let mut config = StudyConfig {
            participant: participant(),
            ..StudyConfig::default()
        };
        assert!(config.validate(1.0).is_ok());

        config.server.upload = true;
        assert_eq!(config.validate(1.0), Err(ConfigError::PolicyNotAccepted));

        config.policy_accepted = true;
        let plan = config.validate(1.25).unwrap();
        assert_eq!(plan.task_count(), 4);
        assert_eq!(plan.calibration_scale, 1.25);
    }

    #[test]
    fn test_validate_requires_participant() {
        let config = StudyConfig::default();
        assert_eq!(
            config.validate(1.0),
            Err(ConfigError::MissingField("participant code"))
        );
    }

    #[test]
    fn test_load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        fs_err::write(
            &path,
            r#"
amplitudes = [256.0, 512.0]
widths = [32.0]
target_count = 9
results_dir = "out"

[participant]
participant_code = "P7"
session_code = "S2"
condition_code = "tablet"

[server]
upload = true
url = "http://example.test"
"#,
        )
        .unwrap();

        let config = StudyConfig::load(Some(&path)).unwrap();
        assert_eq!(config.amplitudes, vec![256.0, 512.0]);
        assert_eq!(config.widths, vec![32.0]);
        assert_eq!(config.target_count, 9);
        assert_eq!(config.participant.participant_code, "P7");
        assert!(config.server.upload);
        assert_eq!(config.server.url, "http://example.test");
        assert_eq!(config.results_dir, PathBuf::from("out"));
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StudyConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.target_count, StudyConfig::default().target_count);
    }
}
