use crate::geometry::Position;
use serde::{Deserialize, Serialize};

/// Smallest ring a study may use.
pub const MIN_TARGETS: usize = 2;

/// One amplitude/width/target-count combination of a study.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskCondition {
    pub amplitude: f64,
    pub width: f64,
    pub target_count: usize,
}

impl TaskCondition {
    pub const fn new(amplitude: f64, width: f64, target_count: usize) -> Self {
        Self {
            amplitude,
            width,
            target_count,
        }
    }

    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            amplitude: self.amplitude * scale,
            width: self.width * scale,
            target_count: self.target_count,
        }
    }
}

/// Everything the renderer needs to draw one frame of a running task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetFrame {
    pub center: Position,
    pub amplitude: f64,
    pub width: f64,
    pub target_count: usize,
    pub highlighted: usize,
    pub armed: bool,
}
