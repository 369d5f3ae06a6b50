use crate::config::StudyPlan;
use fitts_core::{ConfigError, TaskCondition};
use rand::Rng;

/// Calibrated and raw task sequences, aligned index by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    /// Scaled by the display calibration; drives drawing and hit testing.
    pub calibrated: Vec<TaskCondition>,
    /// Values as entered; used in the result tables.
    pub uncalibrated: Vec<TaskCondition>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.calibrated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calibrated.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(&TaskCondition, &TaskCondition)> {
        Some((self.calibrated.get(index)?, self.uncalibrated.get(index)?))
    }

    /// Total click records a complete run of this schedule produces.
    pub fn expected_records(&self) -> usize {
        self.uncalibrated.iter().map(|t| t.target_count).sum()
    }
}

/// Amplitude-major cross product of the two lists.
pub fn cross_product(
    amplitudes: &[f64],
    widths: &[f64],
    target_count: usize,
    scale: f64,
) -> Vec<TaskCondition> {
    amplitudes
        .iter()
        .flat_map(|&a| {
            widths
                .iter()
                .map(move |&w| TaskCondition::new(a * scale, w * scale, target_count))
        })
        .collect()
}

/// Builds both sequences for `plan` and shuffles them with one permutation.
pub fn generate<R: Rng + ?Sized>(plan: &StudyPlan, rng: &mut R) -> Result<Schedule, ConfigError> {
    let mut calibrated = cross_product(
        &plan.amplitudes,
        &plan.widths,
        plan.target_count,
        plan.calibration_scale,
    );
    let mut uncalibrated = cross_product(&plan.amplitudes, &plan.widths, plan.target_count, 1.0);

    if calibrated.is_empty() {
        return Err(if plan.amplitudes.is_empty() {
            ConfigError::EmptyAmplitudes
        } else {
            ConfigError::EmptyWidths
        });
    }

    shuffle_aligned(&mut calibrated, &mut uncalibrated, rng);

    Ok(Schedule {
        calibrated,
        uncalibrated,
    })
}

/// Fisher–Yates over two slices at once, swapping the same pair in each.
pub fn shuffle_aligned<T, U, R: Rng + ?Sized>(a: &mut [T], b: &mut [U], rng: &mut R) {
    debug_assert_eq!(a.len(), b.len());
    for i in (1..a.len()).rev() {
        let j = rng.random_range(0..=i);
        a.swap(i, j);
        b.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn plan(amplitudes: Vec<f64>, widths: Vec<f64>, scale: f64) -> StudyPlan {
        StudyPlan {
            amplitudes,
            widths,
            target_count: 9,
            calibration_scale: scale,
        }
    }

    #[test]
    fn test_cross_product_order() {
        let tasks = cross_product(&[100.0, 200.0], &[10.0, 20.0, 30.0], 5, 1.0);
        let pairs: Vec<(f64, f64)> = tasks.iter().map(|t| (t.amplitude, t.width)).collect();
        assert_eq!(
            pairs,
            vec![
                (100.0, 10.0),
                (100.0, 20.0),
                (100.0, 30.0),
                (200.0, 10.0),
                (200.0, 20.0),
                (200.0, 30.0),
            ]
        );
    }

    #[test]
    fn test_schedule_size_and_alignment() {
        let mut rng = StdRng::seed_from_u64(7);
        for (p, q) in [(1, 1), (2, 3), (4, 2), (5, 5)] {
            let amplitudes: Vec<f64> = (1..=p).map(|i| 100.0 * i as f64).collect();
            let widths: Vec<f64> = (1..=q).map(|i| 10.0 * i as f64).collect();
            let schedule = generate(&plan(amplitudes, widths, 1.5), &mut rng).unwrap();

            assert_eq!(schedule.len(), p * q);
            assert_eq!(schedule.uncalibrated.len(), p * q);
            for (cal, raw) in schedule.calibrated.iter().zip(&schedule.uncalibrated) {
                assert_eq!(*cal, raw.scaled(1.5));
            }
        }
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let amplitudes = vec![64.0, 128.0, 256.0, 512.0];
        let widths = vec![8.0, 16.0, 32.0];
        let schedule = generate(&plan(amplitudes.clone(), widths.clone(), 1.0), &mut rng).unwrap();

        let mut seen: Vec<(u64, u64)> = schedule
            .uncalibrated
            .iter()
            .map(|t| (t.amplitude as u64, t.width as u64))
            .collect();
        seen.sort_unstable();
        let mut expected: Vec<(u64, u64)> = cross_product(&amplitudes, &widths, 9, 1.0)
            .iter()
            .map(|t| (t.amplitude as u64, t.width as u64))
            .collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_same_seed_same_order() {
        let p = plan(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], 1.0);
        let a = generate(&p, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = generate(&p, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_lists_are_configuration_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            generate(&plan(vec![], vec![10.0], 1.0), &mut rng),
            Err(ConfigError::EmptyAmplitudes)
        );
        assert_eq!(
            generate(&plan(vec![10.0], vec![], 1.0), &mut rng),
            Err(ConfigError::EmptyWidths)
        );
    }

    #[test]
    fn test_expected_records() {
        let schedule = generate(
            &plan(vec![100.0, 200.0], vec![20.0], 1.0),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(schedule.expected_records(), 18);
    }
}
