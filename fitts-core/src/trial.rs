/// Progress through the task currently on screen.
///
/// Timestamps are nanoseconds on the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialState {
    pub task_index: usize,
    pub click_count: usize,
    /// Set by the first click that lands on the start target.
    pub armed: bool,
    pub last_click_ns: u64,
    pub current_click_ns: u64,
}

impl TrialState {
    pub fn new(task_index: usize) -> Self {
        Self {
            task_index,
            ..Self::default()
        }
    }

    /// A task is done once the arming click plus one click per target landed.
    pub fn is_complete(&self, target_count: usize) -> bool {
        self.click_count == target_count + 1
    }

    pub fn click_interval_ms(&self) -> f64 {
        self.current_click_ns.saturating_sub(self.last_click_ns) as f64 / 1_000_000.0
    }
}
