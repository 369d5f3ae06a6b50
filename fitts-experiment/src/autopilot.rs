use crate::config::StudyPlan;
use crate::state::{StudyEvent, StudyNotice, StudySession};
use fitts_core::{Position, SessionInfo, StudyError, StudyResults, distance};
use fitts_timing::ManualTimer;
use rand::Rng;
use std::time::Duration;

/// Pause after each click before the next movement starts.
pub const CLICK_SETTLE: Duration = Duration::from_millis(50);

/// Scripted pointer: glides to the highlighted target at a fixed speed and
/// clicks, optionally scattering armed clicks inside the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Autopilot {
    /// Pixels per second.
    pub speed: f64,
    /// Fraction of the target radius the click may land away from its
    /// center, in `[0, 1]`. Zero aims perfectly.
    pub jitter: f64,
    pub cursor: Position,
}

impl Autopilot {
    /// A non-finite or negative `speed` moves instantly.
    pub fn new(speed: f64, start: Position) -> Self {
        Self {
            speed: if speed.is_finite() { speed.max(0.0) } else { 0.0 },
            jitter: 0.0,
            cursor: start,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Travel time from the cursor to `to` at the configured speed.
    pub fn travel_time(&self, to: Position) -> Duration {
        if self.speed <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(distance(self.cursor, to) / self.speed)
    }

    /// Picks the click point for `target` with diameter `width`. The arming
    /// click always lands on the center.
    pub fn aim<R: Rng + ?Sized>(&self, target: Position, width: f64, armed: bool, rng: &mut R) -> Position {
        if !armed || self.jitter <= 0.0 {
            return target;
        }
        let reach = self.jitter * width / 2.0;
        let angle = rng.random_range(0.0..std::f64::consts::TAU);
        // strictly inside the radius so the click still counts as a hit
        let radius = rng.random_range(0.0..reach) * 0.999;
        target.offset(angle.cos() * radius, angle.sin() * radius)
    }

    /// Performs one move-and-click against the session. Returns false when
    /// there is no target on screen.
    pub fn step<R: Rng>(&mut self, session: &mut StudySession<ManualTimer, R>) -> bool {
        let (Some(target), Some(frame)) = (session.expected_target(), session.frame()) else {
            return false;
        };
        let travel = self.travel_time(target);
        let click = self.aim(target, frame.width, frame.armed, &mut session.rng);

        session.timer.advance(travel);
        self.cursor = click;
        session.handle_event(StudyEvent::Click(click));
        session.timer.advance(CLICK_SETTLE);
        true
    }
}

/// Runs a whole study without a window and returns its results.
pub fn run_headless<R: Rng>(
    session: &mut StudySession<ManualTimer, R>,
    pilot: &mut Autopilot,
    info: SessionInfo,
    plan: &StudyPlan,
) -> Result<StudyResults, StudyError> {
    session.begin(info, plan)?;
    session.update();

    while pilot.step(session) {
        for notice in session.update() {
            if let StudyNotice::AggregationFailed { reason } = notice {
                log::warn!("Headless run could not be aggregated: {}", reason);
            }
        }
    }

    match session.results() {
        Some(results) => Ok(results.clone()),
        None => Err(StudyError::DataConsistency {
            expected: session.schedule().expected_records(),
            actual: session.clicks().len(),
        }),
    }
}
