use crate::error::ConfigError;
use crate::geometry::Position;
use serde::{Deserialize, Serialize};

pub const CLICK_HEADER: [&str; 21] = [
    "Participant Code",
    "Session Code",
    "Condition Code",
    "Hand Dominance",
    "Pointing Device",
    "Device Experience",
    "Amplitude",
    "Width",
    "Number of Targets",
    "Task Index",
    "Click Number",
    "Completion Time (ms)",
    "Source X",
    "Source Y",
    "Target X",
    "Target Y",
    "Click X",
    "Click Y",
    "Source-Target Distance",
    "dx",
    "Incorrect",
];

pub const TASK_HEADER: [&str; 17] = [
    "Participant Code",
    "Session Code",
    "Condition Code",
    "Hand Dominance",
    "Pointing Device",
    "Device Experience",
    "Amplitude",
    "Width",
    "Number of Targets",
    "Task Index",
    "Mean Completion Time (ms)",
    "Error (%)",
    "SDx",
    "We",
    "IDe",
    "Ae",
    "Throughput (bps)",
];

pub const OVERALL_HEADER: [&str; 9] = [
    "Participant Code",
    "Session Code",
    "Condition Code",
    "Hand Dominance",
    "Pointing Device",
    "Device Experience",
    "Mean Completion Time (ms)",
    "Mean Click Error (%)",
    "Mean Throughput (bps)",
];

/// Participant and session metadata copied into every result row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub participant_code: String,
    pub session_code: String,
    pub condition_code: String,
    pub hand_dominance: String,
    pub pointing_device: String,
    pub device_experience: String,
}

impl SessionInfo {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.participant_code.trim().is_empty() {
            return Err(ConfigError::MissingField("participant code"));
        }
        if self.session_code.trim().is_empty() {
            return Err(ConfigError::MissingField("session code"));
        }
        if self.condition_code.trim().is_empty() {
            return Err(ConfigError::MissingField("condition code"));
        }
        Ok(())
    }

    /// Base name shared by every exported file of this session.
    pub fn file_stem(&self) -> String {
        format!(
            "WebFitts_{}_{}_{}_{}",
            self.participant_code, self.session_code, self.condition_code, self.pointing_device
        )
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.participant_code.clone(),
            self.session_code.clone(),
            self.condition_code.clone(),
            self.hand_dominance.clone(),
            self.pointing_device.clone(),
            self.device_experience.clone(),
        ]
    }
}

/// One scored click after the trial was armed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickRecord {
    pub session: SessionInfo,
    pub amplitude: f64,
    pub width: f64,
    pub target_count: usize,
    pub task_index: usize,
    pub click_number: usize,
    pub completion_ms: f64,
    pub source: Position,
    pub target: Position,
    pub click: Position,
    pub source_target_distance: f64,
    pub dx: f64,
    pub missed: bool,
}

impl ClickRecord {
    pub fn to_row(&self) -> Vec<String> {
        let mut row = self.session.columns();
        row.extend([
            self.amplitude.to_string(),
            self.width.to_string(),
            self.target_count.to_string(),
            self.task_index.to_string(),
            self.click_number.to_string(),
            self.completion_ms.to_string(),
            self.source.x.to_string(),
            self.source.y.to_string(),
            self.target.x.to_string(),
            self.target.y.to_string(),
            self.click.x.to_string(),
            self.click.y.to_string(),
            self.source_target_distance.to_string(),
            self.dx.to_string(),
            u8::from(self.missed).to_string(),
        ]);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskAggregate {
    pub session: SessionInfo,
    pub amplitude: f64,
    pub width: f64,
    pub target_count: usize,
    pub task_index: usize,
    pub mean_time_ms: f64,
    pub error_pct: f64,
    pub sdx: f64,
    pub we: f64,
    pub ide: f64,
    pub ae: f64,
    pub throughput: f64,
}

impl TaskAggregate {
    pub fn to_row(&self) -> Vec<String> {
        let mut row = self.session.columns();
        row.extend([
            self.amplitude.to_string(),
            self.width.to_string(),
            self.target_count.to_string(),
            self.task_index.to_string(),
            self.mean_time_ms.to_string(),
            self.error_pct.to_string(),
            self.sdx.to_string(),
            self.we.to_string(),
            self.ide.to_string(),
            self.ae.to_string(),
            self.throughput.to_string(),
        ]);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallAggregate {
    pub session: SessionInfo,
    pub mean_time_ms: f64,
    pub error_pct: f64,
    pub throughput: f64,
}

impl OverallAggregate {
    pub fn to_row(&self) -> Vec<String> {
        let mut row = self.session.columns();
        row.extend([
            self.mean_time_ms.to_string(),
            self.error_pct.to_string(),
            self.throughput.to_string(),
        ]);
        row
    }
}

/// The three result tables of a finished study.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyResults {
    pub session: SessionInfo,
    pub clicks: Vec<ClickRecord>,
    pub tasks: Vec<TaskAggregate>,
    pub overall: OverallAggregate,
}
