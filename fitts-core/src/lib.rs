pub mod error;
pub mod geometry;
pub mod phase;
pub mod record;
pub mod task;
pub mod trial;

pub use error::{ConfigError, StudyError};
pub use geometry::{Position, distance, is_hit, target_position, target_sequence};
pub use phase::StudyPhase;
pub use record::{
    CLICK_HEADER, ClickRecord, OVERALL_HEADER, OverallAggregate, SessionInfo, StudyResults,
    TASK_HEADER, TaskAggregate,
};
pub use task::{MIN_TARGETS, TargetFrame, TaskCondition};
pub use trial::TrialState;
