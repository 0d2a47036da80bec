/// Force signals for one walking trial.
///
/// A trial carries one shared time axis and a vertical ground-reaction force
/// channel per foot. Construction validates the axis so that every index
/// walked by the gait event stages refers to a real, ordered sample.

use crate::error::{GaitError, GaitResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limb {
    Left,
    Right,
}

impl Limb {
    pub fn label(&self) -> &'static str {
        match self {
            Limb::Left => "left",
            Limb::Right => "right",
        }
    }
}

/// Left and right force channels sharing one time axis.
///
/// Each channel together with the time axis forms the per-limb signal the
/// event stages walk.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSignals {
    time: Vec<f64>,
    left: Vec<f64>,
    right: Vec<f64>,
}

impl TrialSignals {
    pub fn new(time: Vec<f64>, left: Vec<f64>, right: Vec<f64>) -> GaitResult<Self> {
        validate_time_axis(&time)?;
        validate_channel(&time, &left)?;
        validate_channel(&time, &right)?;
        Ok(TrialSignals { time, left, right })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn force(&self, limb: Limb) -> &[f64] {
        match limb {
            Limb::Left => &self.left,
            Limb::Right => &self.right,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Median spacing of the time axis, in seconds.
    pub fn sample_interval(&self) -> Option<f64> {
        if self.time.len() < 2 {
            return None;
        }
        let mut steps: Vec<f64> = self.time.windows(2).map(|w| w[1] - w[0]).collect();
        steps.sort_by(|a, b| a.total_cmp(b));
        Some(steps[steps.len() / 2])
    }

    /// Replace both force channels, keeping the time axis.
    pub fn map_forces<F>(&self, mut f: F) -> GaitResult<Self>
    where
        F: FnMut(&[f64]) -> GaitResult<Vec<f64>>,
    {
        let left = f(&self.left)?;
        let right = f(&self.right)?;
        TrialSignals::new(self.time.clone(), left, right)
    }
}

fn validate_time_axis(time: &[f64]) -> GaitResult<()> {
    if time.is_empty() {
        return Err(GaitError::EmptySignal);
    }
    if let Some(index) = time.iter().position(|t| !t.is_finite()) {
        return Err(GaitError::NonFiniteSample { index });
    }
    for i in 1..time.len() {
        if time[i] <= time[i - 1] {
            return Err(GaitError::NonMonotonicTime { index: i });
        }
    }
    Ok(())
}

fn validate_channel(time: &[f64], force: &[f64]) -> GaitResult<()> {
    if time.len() != force.len() {
        return Err(GaitError::LengthMismatch {
            time: time.len(),
            force: force.len(),
        });
    }
    if let Some(index) = force.iter().position(|f| !f.is_finite()) {
        return Err(GaitError::NonFiniteSample { index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_trial() {
        let trial = TrialSignals::new(
            vec![0.0, 0.01, 0.02],
            vec![1.0, 2.0, 3.0],
            vec![3.0, 2.0, 1.0],
        )
        .unwrap();

        assert_eq!(trial.len(), 3);
        assert_eq!(trial.force(Limb::Left), &[1.0, 2.0, 3.0]);
        assert_eq!(trial.force(Limb::Right), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_rejects_empty_signal() {
        let err = TrialSignals::new(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, GaitError::EmptySignal));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = TrialSignals::new(vec![0.0, 1.0], vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, GaitError::LengthMismatch { time: 2, force: 1 }));
    }

    #[test]
    fn test_rejects_non_monotonic_time() {
        let err = TrialSignals::new(vec![0.0, 1.0, 1.0, 2.0], vec![0.0; 4], vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, GaitError::NonMonotonicTime { index: 2 }));
    }

    #[test]
    fn test_rejects_nan_force() {
        let err = TrialSignals::new(vec![0.0, 1.0, 2.0], vec![0.0; 3], vec![0.0, f64::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, GaitError::NonFiniteSample { index: 1 }));
    }

    #[test]
    fn test_sample_interval_is_median_step() {
        let trial = TrialSignals::new(
            vec![0.0, 0.01, 0.02, 0.05, 0.06],
            vec![0.0; 5],
            vec![0.0; 5],
        )
        .unwrap();
        let dt = trial.sample_interval().unwrap();
        assert!((dt - 0.01).abs() < 1e-12);
    }
}
