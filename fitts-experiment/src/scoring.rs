use fitts_core::{
    ClickRecord, Position, SessionInfo, TaskCondition, TrialState, distance, is_hit,
    target_position, target_sequence,
};

/// Signed deviation of `click` along the source→target axis, measured from
/// the target center (law of cosines). NaN when source and target coincide.
pub fn projected_deviation(source: Position, target: Position, click: Position) -> f64 {
    let source_target = distance(source, target);
    let source_click = distance(click, source);
    let target_click = distance(click, target);
    (source_click.powi(2) - target_click.powi(2) - source_target.powi(2)) / (2.0 * source_target)
}

/// Inputs for scoring one click of an armed trial.
pub struct ClickContext<'a> {
    pub session: &'a SessionInfo,
    pub calibrated: &'a TaskCondition,
    pub uncalibrated: &'a TaskCondition,
    pub center: Position,
    pub trial: &'a TrialState,
}

/// Scores `click` against the target expected at the trial's current click
/// count. Geometry is reported in raw units; the miss flag uses the
/// calibrated circle the participant actually saw.
pub fn score_click(ctx: &ClickContext<'_>, click: Position) -> ClickRecord {
    let raw = ctx.uncalibrated;
    let n = raw.target_count;
    let k = ctx.trial.click_count;
    debug_assert!(k > 0, "scoring requires an armed trial");

    let expected = target_sequence(k, n);
    let source = target_position(ctx.center, raw.amplitude, n, target_sequence(k - 1, n));
    let target = target_position(ctx.center, raw.amplitude, n, expected);

    let shown = target_position(
        ctx.center,
        ctx.calibrated.amplitude,
        ctx.calibrated.target_count,
        expected,
    );
    let missed = !is_hit(click, shown, ctx.calibrated.width);

    ClickRecord {
        session: ctx.session.clone(),
        amplitude: raw.amplitude,
        width: raw.width,
        target_count: n,
        task_index: ctx.trial.task_index,
        click_number: k,
        completion_ms: ctx.trial.click_interval_ms(),
        source,
        target,
        click,
        source_target_distance: distance(source, target),
        dx: projected_deviation(source, target, click),
        missed,
    }
}
