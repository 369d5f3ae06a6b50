use crate::protocol::{Canvas, Movement, Required, StudyData, TaskInfo};
use fitts_core::{Position, distance};

/// Frame state the telemetry is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSnapshot {
    pub cursor: Position,
    pub target: Position,
    pub task: TaskInfo,
    pub canvas: Canvas,
}

/// Turns successive cursor samples into `study_data` payloads. Movement is
/// measured against the previous sample, starting from the origin after a
/// reset.
#[derive(Debug, Clone, Default)]
pub struct StudyDataTracker {
    last: Position,
}

impl StudyDataTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous sample, e.g. when a new task starts.
    pub fn reset(&mut self) {
        self.last = Position::default();
    }

    pub fn sample(&mut self, frame: &FrameSnapshot, timestamp: i64) -> StudyData {
        let vector = Position::new(frame.cursor.x - self.last.x, frame.cursor.y - self.last.y);
        let speed = distance(frame.cursor, self.last);
        let required = Position::new(frame.target.x - frame.cursor.x, frame.target.y - frame.cursor.y);
        let remaining = distance(frame.target, frame.cursor);

        self.last = frame.cursor;

        StudyData {
            timestamp,
            cursor: frame.cursor,
            target: frame.target,
            movement: Movement {
                vector,
                normalized: unit(vector, speed),
                speed,
            },
            required: Required {
                vector: required,
                normalized: unit(required, remaining),
                distance: remaining,
            },
            task: frame.task,
            canvas: frame.canvas,
        }
    }
}

fn unit(v: Position, length: f64) -> Position {
    if length > 0.0 {
        Position::new(v.x / length, v.y / length)
    } else {
        Position::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cursor: Position) -> FrameSnapshot {
        FrameSnapshot {
            cursor,
            target: Position::new(700.0, 400.0),
            task: TaskInfo {
                index: 0,
                click_number: 1,
                amplitude: 200.0,
                width: 40.0,
                num_targets: 9,
            },
            canvas: Canvas {
                width: 1280.0,
                height: 720.0,
            },
        }
    }

    #[test]
    fn test_movement_between_samples() {
        let mut tracker = StudyDataTracker::new();
        tracker.sample(&snapshot(Position::new(100.0, 100.0)), 0);
        let data = tracker.sample(&snapshot(Position::new(103.0, 104.0)), 16);

        assert_eq!(data.movement.vector, Position::new(3.0, 4.0));
        assert_eq!(data.movement.speed, 5.0);
        assert_eq!(data.movement.normalized, Position::new(0.6, 0.8));
        assert_eq!(data.timestamp, 16);
    }

    #[test]
    fn test_required_vector_points_at_target() {
        let mut tracker = StudyDataTracker::new();
        let data = tracker.sample(&snapshot(Position::new(400.0, 0.0)), 0);
        assert_eq!(data.required.vector, Position::new(300.0, 400.0));
        assert_eq!(data.required.distance, 500.0);
        assert_eq!(data.required.normalized, Position::new(0.6, 0.8));
    }

    #[test]
    fn test_stationary_cursor_has_zero_direction() {
        let mut tracker = StudyDataTracker::new();
        tracker.sample(&snapshot(Position::new(700.0, 400.0)), 0);
        let data = tracker.sample(&snapshot(Position::new(700.0, 400.0)), 1);
        assert_eq!(data.movement.speed, 0.0);
        assert_eq!(data.movement.normalized, Position::default());
        assert_eq!(data.required.normalized, Position::default());
    }

    #[test]
    fn test_reset_measures_from_origin() {
        let mut tracker = StudyDataTracker::new();
        tracker.sample(&snapshot(Position::new(50.0, 50.0)), 0);
        tracker.reset();
        let data = tracker.sample(&snapshot(Position::new(6.0, 8.0)), 1);
        assert_eq!(data.movement.speed, 10.0);
    }
}
