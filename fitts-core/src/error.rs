use thiserror::Error;

/// Problems with the study set-up, surfaced before any trial runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("amplitude list is empty")]
    EmptyAmplitudes,
    #[error("width list is empty")]
    EmptyWidths,
    #[error("incorrect {field} value entered: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} values must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("at least {min} targets are required, got {actual}")]
    TooFewTargets { min: usize, actual: usize },
    #[error("{0} is empty")]
    MissingField(&'static str),
    #[error("data usage policy agreement is required")]
    PolicyNotAccepted,
    #[error("calibration scale must be positive and finite, got {0}")]
    InvalidCalibrationScale(f64),
    #[error("a study cannot start while one is running or calibrating")]
    Busy,
}

#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("data is corrupt: expected {expected} click records, found {actual}")]
    DataConsistency { expected: usize, actual: usize },
}
