/// Gait event extraction from vertical ground-reaction force.
///
/// Follows the foot-contact approach of Hausdorff, Ladin and Wei (1995):
/// 1. Threshold edges: samples where force crosses the rise/fall level
/// 2. Slope minima: walk from each edge until a local line fit is flat
/// 3. Final contact: walk forward from the plateau against (plateau - offset)
/// 4. Stride times: difference interior contacts, boundary contacts dropped
///
/// Every stage is a pure function over slices; left and right limbs go
/// through exactly the same calls.

use serde::{Deserialize, Serialize};

use crate::error::{GaitError, GaitResult};
use crate::signal::{Limb, TrialSignals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// How the contact walk compares force with `plateau - offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRule {
    /// Advance while force is still below the level. A non-negative offset
    /// puts the level at or below the plateau, so the contact is the slope
    /// minimum itself; a negative offset waits for force to climb past it.
    ReachLevel,
    /// Advance while force stays at or above the level; the contact is the
    /// first sample strictly below it.
    DropBelow,
}

/// Algorithm parameters shared by both limbs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitEventParams {
    /// Force level (N) whose crossings mark candidate stance transitions.
    pub rise_fall_edge: f64,
    /// Number of samples in each local line fit.
    pub slope_window: usize,
    /// Slope magnitude (N/sample) below which the signal counts as flat.
    pub slope_tolerance: f64,
    /// Distance (N) of the contact level below the plateau force.
    pub offset_contact: f64,
    pub contact_rule: ContactRule,
    pub direction: SearchDirection,
}

impl Default for GaitEventParams {
    fn default() -> Self {
        GaitEventParams {
            rise_fall_edge: 500.0,
            slope_window: 5,
            slope_tolerance: 0.01,
            offset_contact: 10.0,
            contact_rule: ContactRule::ReachLevel,
            direction: SearchDirection::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub time: f64,
    pub index: usize,
}

/// Intermediate and final products of one limb's event extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbEvents {
    pub edges: Vec<usize>,
    pub slope_minima: Vec<usize>,
    pub contacts: Vec<ContactEvent>,
    pub strides: Vec<f64>,
}

/// Stride sequences for both limbs, padded to a common length.
///
/// `None` marks padding, never a measured stride.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub left: LimbEvents,
    pub right: LimbEvents,
    pub rows: Vec<(Option<f64>, Option<f64>)>,
}

impl TrialResult {
    pub fn limb(&self, limb: Limb) -> &LimbEvents {
        match limb {
            Limb::Left => &self.left,
            Limb::Right => &self.right,
        }
    }
}

/// Indices where `force > threshold` changes state.
///
/// The reported index is the first sample of the new state, so a pulse
/// occupying samples `a..=b` yields `[a, b + 1]`.
pub fn detect_edges(force: &[f64], threshold: f64) -> Vec<usize> {
    if force.len() < 2 {
        return Vec::new();
    }

    force
        .windows(2)
        .enumerate()
        .filter(|(_, w)| (w[0] > threshold) != (w[1] > threshold))
        .map(|(i, _)| i + 1)
        .collect()
}

/// Least-squares slope of `force[start..end]` against sample index.
fn fitted_slope(force: &[f64], start: usize, end: usize) -> f64 {
    let n = end - start;
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let mean_x = (start + end - 1) as f64 / 2.0;
    let mean_y = force[start..end].iter().sum::<f64>() / n_f;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (offset, &y) in force[start..end].iter().enumerate() {
        let dx = (start + offset) as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    if sxx == 0.0 {
        0.0
    } else {
        sxy / sxx
    }
}

/// Walk from `start` until the local line fit is flat.
///
/// Forward walks fit the `window` samples ending at the current index,
/// backward walks the `window` samples starting at it. The walk stops on
/// `|slope| < tolerance` or when the next step reaches either end of the
/// signal, so the result is always in `[0, N-1]`. Returns `None` only when
/// there is nothing to walk: fewer than two samples or `start` out of range.
pub fn locate_slope_minimum(
    force: &[f64],
    start: usize,
    direction: SearchDirection,
    window: usize,
    tolerance: f64,
) -> Option<usize> {
    let n = force.len();
    if n < 2 || start >= n {
        return None;
    }

    let window = window.max(1);
    let mut idx = start;

    loop {
        let (fit_start, fit_end) = match direction {
            SearchDirection::Forward => {
                if idx + 1 >= n {
                    break;
                }
                ((idx + 1).saturating_sub(window), idx + 1)
            }
            SearchDirection::Backward => {
                if idx == 0 {
                    break;
                }
                (idx, (idx + window).min(n))
            }
        };

        if fitted_slope(force, fit_start, fit_end).abs() < tolerance {
            break;
        }

        idx = match direction {
            SearchDirection::Forward => idx + 1,
            SearchDirection::Backward => idx - 1,
        };

        if idx == 0 || idx >= n - 1 {
            break;
        }
    }

    Some(idx)
}

/// Walk forward from `min_idx` against the level `force[min_idx] - offset`.
///
/// `min_idx` past the end is clamped to the last sample, and the walk stops
/// there when `rule` never ends it earlier. `None` for an empty signal.
pub fn find_contact(
    force: &[f64],
    time: &[f64],
    min_idx: usize,
    offset: f64,
    rule: ContactRule,
) -> Option<ContactEvent> {
    let last = force.len().min(time.len()).checked_sub(1)?;
    let mut idx = min_idx.min(last);
    let level = force[idx] - offset;

    let keep_walking = |f: f64| match rule {
        ContactRule::ReachLevel => f < level,
        ContactRule::DropBelow => f >= level,
    };
    while idx < last && keep_walking(force[idx]) {
        idx += 1;
    }

    Some(ContactEvent {
        time: time[idx],
        index: idx,
    })
}

/// Stride durations between interior contacts.
///
/// The first and last contacts are boundary artifacts (partial stance at the
/// start and end of a recording) and are dropped before differencing, so
/// `L` contacts give `L - 3` strides and fewer than four give none.
pub fn stride_intervals(contact_times: &[f64]) -> GaitResult<Vec<f64>> {
    if contact_times.len() < 3 {
        return Ok(Vec::new());
    }

    let interior = &contact_times[1..contact_times.len() - 1];
    interior
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let interval = w[1] - w[0];
            if interval < 0.0 {
                Err(GaitError::StrideOrder {
                    index: i + 2,
                    interval,
                })
            } else {
                Ok(interval)
            }
        })
        .collect()
}

/// Run all four stages on one limb.
pub fn extract_limb(force: &[f64], time: &[f64], params: &GaitEventParams) -> GaitResult<LimbEvents> {
    let edges = detect_edges(force, params.rise_fall_edge);

    let slope_minima: Vec<usize> = edges
        .iter()
        .filter_map(|&edge| {
            locate_slope_minimum(
                force,
                edge,
                params.direction,
                params.slope_window,
                params.slope_tolerance,
            )
        })
        .collect();

    let contacts: Vec<ContactEvent> = slope_minima
        .iter()
        .filter_map(|&min_idx| {
            find_contact(force, time, min_idx, params.offset_contact, params.contact_rule)
        })
        .collect();

    let contact_times: Vec<f64> = contacts.iter().map(|c| c.time).collect();
    let strides = stride_intervals(&contact_times)?;

    Ok(LimbEvents {
        edges,
        slope_minima,
        contacts,
        strides,
    })
}

/// Pair two stride sequences row by row, padding the shorter with `None`.
pub fn align_strides(left: &[f64], right: &[f64]) -> Vec<(Option<f64>, Option<f64>)> {
    let rows = left.len().max(right.len());
    (0..rows)
        .map(|i| (left.get(i).copied(), right.get(i).copied()))
        .collect()
}

/// Extract stride times for both limbs of a trial.
pub fn extract_trial(signals: &TrialSignals, params: &GaitEventParams) -> GaitResult<TrialResult> {
    let left = extract_limb(signals.force(Limb::Left), signals.time(), params)?;
    let right = extract_limb(signals.force(Limb::Right), signals.time(), params)?;
    let rows = align_strides(&left.strides, &right.strides);
    let result = TrialResult { left, right, rows };

    for limb in [Limb::Left, Limb::Right] {
        let events = result.limb(limb);
        log::debug!(
            "{}: {} edges, {} slope minima, {} contacts, {} strides",
            limb.label(),
            events.edges.len(),
            events.slope_minima.len(),
            events.contacts.len(),
            events.strides.len()
        );
    }

    Ok(result)
}
