use fitts_core::{
    ClickRecord, OverallAggregate, SessionInfo, StudyError, StudyResults, TaskAggregate,
    TaskCondition,
};

/// Scale factor turning the SD of endpoint deviation into effective width.
pub const EFFECTIVE_WIDTH_FACTOR: f64 = 4.133;

pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(data: &[f64]) -> f64 {
    let m = mean(data);
    let sum: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    (sum / (data.len() as f64 - 1.0)).sqrt()
}

/// Fitts's-Law statistics over the click records of one task.
pub fn aggregate_task(
    session: &SessionInfo,
    condition: &TaskCondition,
    task_index: usize,
    records: &[ClickRecord],
) -> TaskAggregate {
    let times: Vec<f64> = records.iter().map(|r| r.completion_ms).collect();
    let errors: Vec<f64> = records.iter().map(|r| f64::from(u8::from(r.missed))).collect();
    let dxs: Vec<f64> = records.iter().map(|r| r.dx).collect();
    let effective_amplitudes: Vec<f64> = records
        .iter()
        .map(|r| r.source_target_distance + r.dx)
        .collect();

    let mean_time_ms = mean(&times);
    let sdx = sample_std_dev(&dxs);
    let ae = mean(&effective_amplitudes);
    let we = EFFECTIVE_WIDTH_FACTOR * sdx;
    let ide = (ae / we + 1.0).log2();

    TaskAggregate {
        session: session.clone(),
        amplitude: condition.amplitude,
        width: condition.width,
        target_count: condition.target_count,
        task_index,
        mean_time_ms,
        error_pct: mean(&errors) * 100.0,
        sdx,
        we,
        ide,
        ae,
        throughput: ide * 1000.0 / mean_time_ms,
    }
}

/// Splits `clicks` into contiguous per-task runs and aggregates each.
///
/// Task `i` owns the next `tasks[i].target_count` records; any other total is
/// a consistency error and nothing is aggregated.
pub fn aggregate_tasks(
    session: &SessionInfo,
    tasks: &[TaskCondition],
    clicks: &[ClickRecord],
) -> Result<Vec<TaskAggregate>, StudyError> {
    let expected: usize = tasks.iter().map(|t| t.target_count).sum();
    if clicks.len() != expected {
        return Err(StudyError::DataConsistency {
            expected,
            actual: clicks.len(),
        });
    }

    let mut offset = 0;
    let mut results = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let records = &clicks[offset..offset + task.target_count];
        results.push(aggregate_task(session, task, i, records));
        offset += task.target_count;
    }
    Ok(results)
}

pub fn aggregate_overall(session: &SessionInfo, tasks: &[TaskAggregate]) -> OverallAggregate {
    let times: Vec<f64> = tasks.iter().map(|t| t.mean_time_ms).collect();
    let errors: Vec<f64> = tasks.iter().map(|t| t.error_pct).collect();
    let throughputs: Vec<f64> = tasks.iter().map(|t| t.throughput).collect();

    OverallAggregate {
        session: session.clone(),
        mean_time_ms: mean(&times),
        error_pct: mean(&errors),
        throughput: mean(&throughputs),
    }
}

/// Runs both reduction stages and bundles the three result tables.
pub fn summarize(
    session: &SessionInfo,
    tasks: &[TaskCondition],
    clicks: Vec<ClickRecord>,
) -> Result<StudyResults, StudyError> {
    let task_results = aggregate_tasks(session, tasks, &clicks)?;
    let overall = aggregate_overall(session, &task_results);
    Ok(StudyResults {
        session: session.clone(),
        clicks,
        tasks: task_results,
        overall,
    })
}
