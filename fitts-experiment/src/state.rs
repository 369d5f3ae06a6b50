use crate::aggregate;
use crate::config::StudyPlan;
use crate::schedule::{self, Schedule};
use crate::scoring::{ClickContext, score_click};
use fitts_core::{
    ClickRecord, ConfigError, Position, SessionInfo, StudyError, StudyPhase, StudyResults,
    TargetFrame, TaskCondition, TrialState, is_hit, target_position, target_sequence,
};
use fitts_timing::Timer;
use rand::Rng;

/// Input delivered to the session from native or remote sources.
#[derive(Debug, Clone, PartialEq)]
pub enum StudyEvent {
    Click(Position),
    BeginCalibration,
    EndCalibration,
}

/// What happened to a single click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// No study running, or the start target was missed before arming.
    Ignored,
    /// First hit on the start target; timing starts here.
    Armed,
    Recorded { missed: bool },
}

/// Lifecycle notifications produced by [`StudySession::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum StudyNotice {
    StudyStarted { tasks: usize },
    TaskStarted { index: usize, condition: TaskCondition },
    TaskCompleted { index: usize },
    StudyFinished,
    AggregationFailed { reason: String },
}

/// Owns one study run: the schedule, the trial in progress and every record
/// produced so far. All mutation goes through this value.
pub struct StudySession<T, R>
where
    T: Timer,
    R: Rng,
{
    pub timer: T,
    pub rng: R,
    phase: StudyPhase,
    info: SessionInfo,
    schedule: Schedule,
    trial: TrialState,
    center: Position,
    clicks: Vec<ClickRecord>,
    results: Option<StudyResults>,
    pending: Vec<StudyNotice>,
}

impl<T, R> StudySession<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(timer: T, rng: R, viewport: (f64, f64)) -> Self {
        Self {
            timer,
            rng,
            phase: StudyPhase::Idle,
            info: SessionInfo::default(),
            schedule: Schedule::default(),
            trial: TrialState::default(),
            center: Position::new(viewport.0 / 2.0, viewport.1 / 2.0),
            clicks: Vec::new(),
            results: None,
            pending: Vec::new(),
        }
    }

    /// Starts a fresh study. Any earlier records are discarded. On error the
    /// session stays in its current phase.
    pub fn begin(&mut self, info: SessionInfo, plan: &StudyPlan) -> Result<(), StudyError> {
        if !self.phase.can_begin() {
            return Err(ConfigError::Busy.into());
        }
        info.validate()?;
        let schedule = schedule::generate(plan, &mut self.rng)?;

        log::info!(
            "Study started: {} tasks, {} targets, calibration scale {:.2}",
            schedule.len(),
            plan.target_count,
            plan.calibration_scale
        );

        self.info = info;
        self.schedule = schedule;
        self.clicks.clear();
        self.results = None;
        self.pending.clear();
        self.trial = TrialState::new(0);
        self.phase = StudyPhase::Running;

        self.pending.push(StudyNotice::StudyStarted {
            tasks: self.schedule.len(),
        });
        self.announce_task(0);
        Ok(())
    }

    pub fn handle_event(&mut self, event: StudyEvent) -> bool {
        match event {
            StudyEvent::Click(pos) => self.handle_click(pos) != ClickOutcome::Ignored,
            StudyEvent::BeginCalibration if self.phase.can_begin() => {
                self.phase = StudyPhase::Calibration;
                true
            }
            StudyEvent::EndCalibration if self.phase.is_calibrating() => {
                self.phase = StudyPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Routes one pointer click through the hit test and, once armed, the
    /// scorer.
    pub fn handle_click(&mut self, pos: Position) -> ClickOutcome {
        if !self.phase.allows_clicks() || self.trial.is_complete(self.target_count()) {
            return ClickOutcome::Ignored;
        }
        let Some((calibrated, uncalibrated)) = self.schedule.get(self.trial.task_index) else {
            return ClickOutcome::Ignored;
        };
        let (calibrated, uncalibrated) = (*calibrated, *uncalibrated);

        let n = calibrated.target_count;
        let expected = target_sequence(self.trial.click_count, n);
        let shown = target_position(self.center, calibrated.amplitude, n, expected);
        let hit = is_hit(pos, shown, calibrated.width);
        let now = self.timer.now();

        if hit && !self.trial.armed {
            self.trial.armed = true;
            self.trial.last_click_ns = now;
            self.trial.current_click_ns = now;
            self.trial.click_count += 1;
            log::debug!("Task {} armed", self.trial.task_index);
            return ClickOutcome::Armed;
        }

        if !self.trial.armed {
            return ClickOutcome::Ignored;
        }

        self.trial.current_click_ns = now;
        let record = score_click(
            &ClickContext {
                session: &self.info,
                calibrated: &calibrated,
                uncalibrated: &uncalibrated,
                center: self.center,
                trial: &self.trial,
            },
            pos,
        );
        let missed = record.missed;
        log::debug!(
            "Task {} click {}: {:.1} ms, dx {:.2}, missed {}",
            record.task_index,
            record.click_number,
            record.completion_ms,
            record.dx,
            missed
        );
        self.clicks.push(record);
        self.trial.click_count += 1;
        self.trial.last_click_ns = self.trial.current_click_ns;

        ClickOutcome::Recorded { missed }
    }

    /// Per-frame step: advances past completed tasks and, after the last one,
    /// aggregates the results. Returns the notices raised since the previous
    /// call.
    pub fn update(&mut self) -> Vec<StudyNotice> {
        if self.phase.is_running() && self.trial.is_complete(self.target_count()) {
            let finished = self.trial.task_index;
            self.pending
                .push(StudyNotice::TaskCompleted { index: finished });

            if finished + 1 < self.schedule.len() {
                self.trial = TrialState::new(finished + 1);
                self.announce_task(finished + 1);
            } else {
                self.trial = TrialState::new(finished);
                self.finish();
            }
        }

        std::mem::take(&mut self.pending)
    }

    fn finish(&mut self) {
        self.phase = StudyPhase::Finished;
        self.pending.push(StudyNotice::StudyFinished);

        let clicks = std::mem::take(&mut self.clicks);
        match aggregate::summarize(&self.info, &self.schedule.uncalibrated, clicks.clone()) {
            Ok(results) => {
                log::info!(
                    "Study finished: mean time {:.2} ms, error {:.2}%, throughput {:.2} bps",
                    results.overall.mean_time_ms,
                    results.overall.error_pct,
                    results.overall.throughput
                );
                self.results = Some(results);
            }
            Err(e) => {
                log::error!("Aggregation aborted: {}", e);
                self.clicks = clicks;
                self.pending.push(StudyNotice::AggregationFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn announce_task(&mut self, index: usize) {
        if let Some((_, raw)) = self.schedule.get(index) {
            log::info!(
                "Task {} of {}: amplitude {} | width {}",
                index + 1,
                self.schedule.len(),
                raw.amplitude,
                raw.width
            );
            self.pending.push(StudyNotice::TaskStarted {
                index,
                condition: *raw,
            });
        }
    }

    fn target_count(&self) -> usize {
        self.schedule
            .get(self.trial.task_index)
            .map_or(usize::MAX, |(c, _)| c.target_count)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.center = Position::new(width / 2.0, height / 2.0);
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn phase(&self) -> StudyPhase {
        self.phase
    }

    pub fn trial(&self) -> Option<&TrialState> {
        self.phase.is_running().then_some(&self.trial)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Records emitted so far in the current run.
    pub fn clicks(&self) -> &[ClickRecord] {
        match &self.results {
            Some(results) => &results.clicks,
            None => &self.clicks,
        }
    }

    pub fn results(&self) -> Option<&StudyResults> {
        self.results.as_ref()
    }

    /// Calibrated geometry of the running task for the renderer.
    pub fn frame(&self) -> Option<TargetFrame> {
        if !self.phase.is_running() {
            return None;
        }
        let (calibrated, _) = self.schedule.get(self.trial.task_index)?;
        Some(TargetFrame {
            center: self.center,
            amplitude: calibrated.amplitude,
            width: calibrated.width,
            target_count: calibrated.target_count,
            highlighted: target_sequence(self.trial.click_count, calibrated.target_count),
            armed: self.trial.armed,
        })
    }

    /// Screen position of the target the participant should click next.
    pub fn expected_target(&self) -> Option<Position> {
        self.frame().map(|f| {
            target_position(f.center, f.amplitude, f.target_count, f.highlighted)
        })
    }

    /// One-based task number and task total while running.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.phase
            .is_running()
            .then(|| (self.trial.task_index + 1, self.schedule.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitts_timing::ManualTimer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn info() -> SessionInfo {
        SessionInfo {
            participant_code: "P1".into(),
            session_code: "S1".into(),
            condition_code: "C1".into(),
            ..SessionInfo::default()
        }
    }

    fn session() -> (StudySession<ManualTimer, StdRng>, ManualTimer) {
        let timer = ManualTimer::new();
        let session = StudySession::new(timer.clone(), StdRng::seed_from_u64(11), (1000.0, 800.0));
        (session, timer)
    }

    fn plan(amplitudes: Vec<f64>, widths: Vec<f64>, n: usize, scale: f64) -> StudyPlan {
        StudyPlan::new(amplitudes, widths, n, scale).unwrap()
    }

    fn click_expected(session: &mut StudySession<ManualTimer, StdRng>) -> ClickOutcome {
        let pos = session.expected_target().unwrap();
        session.handle_click(pos)
    }

    #[test]
    fn test_begin_enters_running() {
        let (mut s, _) = session();
        assert_eq!(s.phase(), StudyPhase::Idle);
        s.begin(info(), &plan(vec![100.0], vec![20.0], 5, 1.0)).unwrap();
        assert_eq!(s.phase(), StudyPhase::Running);
        assert_eq!(s.progress(), Some((1, 1)));

        let notices = s.update();
        assert_eq!(notices[0], StudyNotice::StudyStarted { tasks: 1 });
        assert!(matches!(notices[1], StudyNotice::TaskStarted { index: 0, .. }));
    }

    #[test]
    fn test_empty_schedule_never_runs() {
        let (mut s, _) = session();
        let bad = StudyPlan {
            amplitudes: vec![],
            widths: vec![10.0],
            target_count: 5,
            calibration_scale: 1.0,
        };
        let err = s.begin(info(), &bad).unwrap_err();
        assert!(matches!(
            err,
            StudyError::Configuration(ConfigError::EmptyAmplitudes)
        ));
        assert_eq!(s.phase(), StudyPhase::Idle);
        assert!(s.frame().is_none());
    }

    #[test]
    fn test_missing_participant_never_runs() {
        let (mut s, _) = session();
        let err = s
            .begin(SessionInfo::default(), &plan(vec![100.0], vec![20.0], 5, 1.0))
            .unwrap_err();
        assert!(matches!(err, StudyError::Configuration(ConfigError::MissingField(_))));
        assert_eq!(s.phase(), StudyPhase::Idle);
    }

    #[test]
    fn test_clicks_before_arming_are_ignored() {
        let (mut s, _) = session();
        s.begin(info(), &plan(vec![200.0], vec![20.0], 5, 1.0)).unwrap();

        assert_eq!(s.handle_click(s.center()), ClickOutcome::Ignored);
        assert_eq!(s.handle_click(Position::new(0.0, 0.0)), ClickOutcome::Ignored);
        assert_eq!(s.trial().unwrap().click_count, 0);
        assert!(!s.trial().unwrap().armed);
        assert!(s.clicks().is_empty());

        assert_eq!(click_expected(&mut s), ClickOutcome::Armed);
        assert_eq!(s.trial().unwrap().click_count, 1);
        assert!(s.clicks().is_empty());
    }

    #[test]
    fn test_misses_after_arming_count_towards_completion() {
        let (mut s, timer) = session();
        let n = 4;
        s.begin(info(), &plan(vec![200.0], vec![20.0], n, 1.0)).unwrap();
        s.update();

        assert_eq!(click_expected(&mut s), ClickOutcome::Armed);
        for i in 0..n {
            timer.advance_ms(300.0);
            let outcome = s.handle_click(s.center());
            assert_eq!(outcome, ClickOutcome::Recorded { missed: true });
            if i + 1 < n {
                assert!(s.update().is_empty());
                assert_eq!(s.phase(), StudyPhase::Running);
            }
        }
        assert_eq!(s.trial().unwrap().click_count, n + 1);

        let notices = s.update();
        assert_eq!(notices[0], StudyNotice::TaskCompleted { index: 0 });
        assert_eq!(notices[1], StudyNotice::StudyFinished);
        assert_eq!(s.phase(), StudyPhase::Finished);

        let results = s.results().unwrap();
        assert_eq!(results.clicks.len(), n);
        assert_eq!(results.tasks[0].error_pct, 100.0);
        assert!(results.clicks.iter().all(|c| (c.completion_ms - 300.0).abs() < 1e-6));
    }

    #[test]
    fn test_completion_waits_for_frame_update() {
        let (mut s, _) = session();
        s.begin(info(), &plan(vec![200.0, 300.0], vec![30.0], 3, 1.0)).unwrap();
        s.update();

        for _ in 0..4 {
            click_expected(&mut s);
        }
        // the task is full; further clicks before the next frame are dropped
        assert_eq!(s.handle_click(s.center()), ClickOutcome::Ignored);
        assert_eq!(s.trial().unwrap().task_index, 0);

        let notices = s.update();
        assert_eq!(notices[0], StudyNotice::TaskCompleted { index: 0 });
        assert!(matches!(notices[1], StudyNotice::TaskStarted { index: 1, .. }));
        let trial = s.trial().unwrap();
        assert_eq!((trial.task_index, trial.click_count, trial.armed), (1, 0, false));
    }

    #[test]
    fn test_perfect_run_produces_target_count_records_per_task() {
        let (mut s, timer) = session();
        let n = 7;
        let p = plan(vec![150.0, 300.0], vec![25.0, 50.0], n, 1.3);
        s.begin(info(), &p).unwrap();

        let mut finished = false;
        for _ in 0..1000 {
            timer.advance_ms(200.0);
            click_expected(&mut s);
            if s.update().contains(&StudyNotice::StudyFinished) {
                finished = true;
                break;
            }
        }
        assert!(finished);

        let results = s.results().unwrap();
        assert_eq!(results.clicks.len(), 4 * n);
        assert!(results.clicks.iter().all(|c| !c.missed));
        for (i, chunk) in results.clicks.chunks(n).enumerate() {
            assert!(chunk.iter().all(|c| c.task_index == i));
            let numbers: Vec<usize> = chunk.iter().map(|c| c.click_number).collect();
            assert_eq!(numbers, (1..=n).collect::<Vec<_>>());
            // reporting uses raw amplitudes even though the scale is 1.3
            assert!([150.0, 300.0].contains(&chunk[0].amplitude));
        }
        assert_eq!(results.tasks.len(), 4);
        assert!(results.tasks.iter().all(|t| t.error_pct == 0.0));
        assert!((results.overall.mean_time_ms - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_begin_clears_previous_records() {
        let (mut s, _) = session();
        let p = plan(vec![100.0], vec![30.0], 2, 1.0);
        s.begin(info(), &p).unwrap();
        for _ in 0..3 {
            click_expected(&mut s);
        }
        s.update();
        assert_eq!(s.phase(), StudyPhase::Finished);
        assert_eq!(s.clicks().len(), 2);

        s.begin(info(), &p).unwrap();
        assert!(s.clicks().is_empty());
        assert!(s.results().is_none());
        assert_eq!(s.phase(), StudyPhase::Running);
    }

    #[test]
    fn test_cannot_begin_while_running() {
        let (mut s, _) = session();
        let p = plan(vec![100.0], vec![30.0], 3, 1.0);
        s.begin(info(), &p).unwrap();
        assert!(matches!(
            s.begin(info(), &p),
            Err(StudyError::Configuration(ConfigError::Busy))
        ));
    }

    #[test]
    fn test_calibration_blocks_clicks() {
        let (mut s, _) = session();
        assert!(s.handle_event(StudyEvent::BeginCalibration));
        assert_eq!(s.phase(), StudyPhase::Calibration);
        assert!(!s.handle_event(StudyEvent::Click(s.center())));
        assert!(s.begin(info(), &plan(vec![100.0], vec![30.0], 3, 1.0)).is_err());
        assert!(s.handle_event(StudyEvent::EndCalibration));
        assert_eq!(s.phase(), StudyPhase::Idle);
    }

    #[test]
    fn test_frame_follows_calibrated_geometry() {
        let (mut s, _) = session();
        s.begin(info(), &plan(vec![100.0], vec![20.0], 6, 2.0)).unwrap();
        let frame = s.frame().unwrap();
        assert_eq!(frame.amplitude, 200.0);
        assert_eq!(frame.width, 40.0);
        assert_eq!(frame.highlighted, 0);
        assert_eq!(frame.center, Position::new(500.0, 400.0));

        click_expected(&mut s);
        assert_eq!(s.frame().unwrap().highlighted, target_sequence(1, 6));
        assert!(s.frame().unwrap().armed);
    }
}
