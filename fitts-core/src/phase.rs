/// Top-level phases a study session moves through.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum StudyPhase {
    /// No study running; waiting for a start request.
    #[default]
    Idle,
    /// Display calibration in progress; clicks are not routed to trials.
    Calibration,
    Running,
    Finished,
}

impl StudyPhase {
    pub fn allows_clicks(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self, Self::Calibration)
    }

    /// Whether a new study or a calibration pass may be started from here.
    pub fn can_begin(&self) -> bool {
        matches!(self, Self::Idle | Self::Finished)
    }
}
