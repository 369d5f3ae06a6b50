pub mod aggregate;
pub mod autopilot;
pub mod calibration;
pub mod config;
pub mod schedule;
pub mod scoring;
pub mod state;

pub use autopilot::{Autopilot, run_headless};
pub use calibration::{
    CalibrationError, CalibrationSlider, CalibrationStore, FileCalibrationStore,
    MemoryCalibrationStore,
};
pub use config::{ServerConfig, SettingsError, StudyConfig, StudyPlan};
pub use schedule::Schedule;
pub use state::{ClickOutcome, StudyEvent, StudyNotice, StudySession};
