/// Zero-phase Butterworth low-pass for force channels.
///
/// Runs a second-order section forward, then again over the reversed output,
/// so stance edges are smoothed without being shifted in time.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Q_BUTTERWORTH_F64};

use crate::error::{GaitError, GaitResult};
use crate::signal::TrialSignals;

pub fn filtfilt(samples: &[f64], sample_rate_hz: f64, cutoff_hz: f64) -> GaitResult<Vec<f64>> {
    let nyquist = sample_rate_hz / 2.0;
    if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
        return Err(GaitError::InvalidConfig(format!(
            "low-pass cutoff {:.3} Hz must lie in (0, {:.3}) Hz for {:.3} Hz sampling",
            cutoff_hz, nyquist, sample_rate_hz
        )));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let coeffs = Coefficients::<f64>::from_params(
        biquad::Type::LowPass,
        sample_rate_hz.hz(),
        cutoff_hz.hz(),
        Q_BUTTERWORTH_F64,
    )
    .map_err(|e| GaitError::InvalidConfig(format!("filter design failed: {:?}", e)))?;

    // Prime the state with the first sample to avoid a start-up transient
    let mut forward = DirectForm1::<f64>::new(coeffs);
    let first = samples[0];
    for _ in 0..64 {
        forward.run(first);
    }
    let mut filtered: Vec<f64> = samples.iter().map(|&x| forward.run(x)).collect();

    filtered.reverse();
    let mut backward = DirectForm1::<f64>::new(coeffs);
    let last = filtered[0];
    for _ in 0..64 {
        backward.run(last);
    }
    let mut smoothed: Vec<f64> = filtered.iter().map(|&x| backward.run(x)).collect();
    smoothed.reverse();

    Ok(smoothed)
}

/// Low-pass both force channels of a trial.
pub fn smooth_trial(signals: &TrialSignals, cutoff_hz: f64) -> GaitResult<TrialSignals> {
    let dt = signals.sample_interval().ok_or_else(|| {
        GaitError::InvalidConfig("low-pass filtering needs at least two samples".to_string())
    })?;
    let sample_rate_hz = 1.0 / dt;

    log::debug!(
        "low-pass {:.2} Hz at {:.1} Hz sampling",
        cutoff_hz,
        sample_rate_hz
    );

    signals.map_forces(|force| filtfilt(force, sample_rate_hz, cutoff_hz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_constant_level_is_preserved() {
        let samples = vec![640.0; 200];
        let smoothed = filtfilt(&samples, 100.0, 10.0).unwrap();

        assert_eq!(smoothed.len(), samples.len());
        for value in smoothed {
            assert_abs_diff_eq!(value, 640.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_high_frequency_is_attenuated() {
        // alternating +-50 N is at Nyquist
        let samples: Vec<f64> = (0..400)
            .map(|i| 500.0 + if i % 2 == 0 { 50.0 } else { -50.0 })
            .collect();
        let smoothed = filtfilt(&samples, 100.0, 5.0).unwrap();

        for value in &smoothed[50..350] {
            assert!((value - 500.0).abs() < 1.0, "residual ripple {}", value - 500.0);
        }
    }

    #[test]
    fn test_rejects_cutoff_above_nyquist() {
        let err = filtfilt(&[1.0, 2.0, 3.0], 100.0, 60.0).unwrap_err();
        assert!(matches!(err, GaitError::InvalidConfig(_)));
        assert!(filtfilt(&[1.0], 100.0, 0.0).is_err());
    }

    #[test]
    fn test_smooth_trial_keeps_time_axis() {
        let time: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
        let signals = TrialSignals::new(time.clone(), vec![10.0; 100], vec![20.0; 100]).unwrap();
        let smoothed = smooth_trial(&signals, 5.0).unwrap();

        assert_eq!(smoothed.time(), &time[..]);
        assert_eq!(smoothed.len(), 100);
    }
}
