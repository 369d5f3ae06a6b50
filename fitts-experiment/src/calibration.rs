use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;
pub const SCALE_STEP: f64 = 0.01;

/// Width of the on-screen card at scale 1.0, in pixels.
pub const CARD_BASE_WIDTH_PX: f64 = 500.0;
/// ISO/IEC 7810 ID-1 width / height.
pub const CARD_ASPECT: f64 = 1.586;

const STORE_FILE: &str = "calibration";

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored calibration {0:?} is not a number")]
    Corrupt(String),
}

/// Persists the display calibration scale between runs.
pub trait CalibrationStore {
    fn load(&self) -> Result<Option<f64>, CalibrationError>;
    fn save(&self, scale: f64) -> Result<(), CalibrationError>;

    /// Stored value clamped to the slider range, or the default.
    fn load_or_default(&self) -> f64 {
        match self.load() {
            Ok(Some(scale)) => clamp_scale(scale),
            Ok(None) => DEFAULT_SCALE,
            Err(e) => {
                log::warn!("Ignoring stored calibration: {}", e);
                DEFAULT_SCALE
            }
        }
    }
}

/// Plain-text file holding the scale, by default under the user config dir.
#[derive(Debug, Clone)]
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self, CalibrationError> {
        let dirs = ProjectDirs::from("org", "webfitts", "webfitts")
            .ok_or(CalibrationError::ConfigDirNotFound)?;
        Ok(Self::new(dirs.config_dir().join(STORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&self) -> Result<Option<f64>, CalibrationError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs_err::read_to_string(&self.path)?;
        let raw = raw.trim();
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| CalibrationError::Corrupt(raw.to_string()))
    }

    fn save(&self, scale: f64) -> Result<(), CalibrationError> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        fs_err::write(&self.path, format!("{scale:.2}\n"))?;
        log::info!("Calibration {:.2} saved to {}", scale, self.path.display());
        Ok(())
    }
}

/// Keeps the value for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryCalibrationStore {
    value: std::sync::Mutex<Option<f64>>,
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self) -> Result<Option<f64>, CalibrationError> {
        Ok(*self.value.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save(&self, scale: f64) -> Result<(), CalibrationError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(scale);
        Ok(())
    }
}

pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        DEFAULT_SCALE
    }
}

/// Interactive calibration pass: the participant resizes a card outline
/// until it matches a physical ID card held against the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSlider {
    committed: f64,
    value: f64,
}

impl CalibrationSlider {
    pub fn new(committed: f64) -> Self {
        let committed = clamp_scale(committed);
        Self {
            committed,
            value: committed,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Moves the slider by `steps` increments of [`SCALE_STEP`], staying in
    /// range and on the step grid.
    pub fn nudge(&mut self, steps: i32) {
        let raw = self.value + f64::from(steps) * SCALE_STEP;
        self.value = (clamp_scale(raw) / SCALE_STEP).round() * SCALE_STEP;
    }

    pub fn set(&mut self, value: f64) {
        self.value = clamp_scale(value);
    }

    /// Accepts the current value.
    pub fn confirm(&mut self) -> f64 {
        self.committed = self.value;
        self.committed
    }

    /// Drops the pending value and returns the last committed one.
    pub fn cancel(&mut self) -> f64 {
        self.value = self.committed;
        self.committed
    }

    /// Card outline size in pixels for the current value.
    pub fn card_size(&self) -> (f64, f64) {
        card_size(self.value)
    }
}

pub fn card_size(scale: f64) -> (f64, f64) {
    let width = CARD_BASE_WIDTH_PX * scale;
    (width, width / CARD_ASPECT)
}
