//! Conversion of irregular samples to a fixed-interval grid.

use crate::data::ingest::SampleSet;
use crate::error::{AppResult, InputError};
use serde::Serialize;
use tracing::{debug, instrument};

/// Smallest sampling interval the resampler will produce (seconds).
pub const MIN_DT: f64 = 1e-3;

/// Values on a uniform grid: `values[i]` is the signal at `i * dt` seconds.
///
/// When the source angles were unwrapped the values are a continuous real
/// proxy for the circular signal and may leave `[0, 360)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformSeries {
    dt: f64,
    values: Vec<f64>,
}

impl UniformSeries {
    /// Construct from a known interval and values. Non-positive or non-finite
    /// `dt` is replaced by `1.0`.
    pub fn new(dt: f64, values: Vec<f64>) -> Self {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 1.0 };
        Self { dt, values }
    }

    /// Sampling interval, seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Values in grid order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Time in seconds of sample `index`.
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.dt
    }

    /// Time axis in seconds, one entry per value.
    pub fn times(&self) -> Vec<f64> {
        (0..self.values.len()).map(|i| self.time_at(i)).collect()
    }
}

/// Median of the strictly positive consecutive time deltas, floored at
/// [`MIN_DT`]. Falls back to `1.0` when no delta is positive.
pub fn sampling_interval(times: &[f64]) -> f64 {
    let mut deltas: Vec<f64> = times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .collect();
    if deltas.is_empty() {
        return 1.0;
    }
    deltas.sort_by(f64::total_cmp);
    let mid = deltas.len() / 2;
    let median = if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) / 2.0
    } else {
        deltas[mid]
    };
    median.max(MIN_DT)
}

/// Unwrap a degree sequence so that every step takes the short way around
/// the circle. Steps of exactly 180° keep their sign.
pub fn unwrap_degrees(angles: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(angles.len());
    let Some(&first) = angles.first() else {
        return out;
    };
    out.push(first);
    let mut offset = 0.0;
    for pair in angles.windows(2) {
        let delta = pair[1] - pair[0];
        if delta.abs() >= 180.0 {
            let mut short = (delta + 180.0).rem_euclid(360.0) - 180.0;
            if short == -180.0 && delta > 0.0 {
                short = 180.0;
            }
            offset += short - delta;
        }
        out.push(pair[1] + offset);
    }
    out
}

/// Map an angle onto `[0, 360)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Linear interpolation of `ys` (sampled at increasing `xs`) at each `x` in
/// `targets`, clamping to the end values outside the sampled range.
fn interpolate(xs: &[f64], ys: &[f64], targets: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out = Vec::new();
    let mut j = 0usize;
    let last = xs.len() - 1;
    for x in targets {
        while j + 1 < last && xs[j + 1] <= x {
            j += 1;
        }
        let value = if x <= xs[0] {
            ys[0]
        } else if x >= xs[last] {
            ys[last]
        } else {
            let (x0, x1) = (xs[j], xs[j + 1]);
            let frac = (x - x0) / (x1 - x0);
            ys[j] + frac * (ys[j + 1] - ys[j])
        };
        out.push(value);
    }
    out
}

/// Resample onto a grid `0, dt, 2*dt, ...` strictly before the last sample
/// time.
///
/// With `unwrap` set, angles are unwrapped before interpolation so that a
/// crossing such as 359° to 1° interpolates through 360° rather than 180°.
#[instrument(skip(samples), fields(samples = samples.len()))]
pub fn resample_uniform(samples: &SampleSet, unwrap: bool) -> AppResult<UniformSeries> {
    if samples.len() < 2 {
        return Err(InputError::TooFewSamples {
            found: samples.len(),
        }
        .into());
    }
    let times: Vec<f64> = samples.samples().iter().map(|s| s.time).collect();
    let angles: Vec<f64> = samples.samples().iter().map(|s| s.angle).collect();
    let dt = sampling_interval(&times);

    let series = if unwrap {
        unwrap_degrees(&angles)
    } else {
        angles
    };

    let end = times[times.len() - 1];
    let count = (end / dt).ceil().max(0.0) as usize;
    let grid = (0..count).map(|i| i as f64 * dt);
    let values = interpolate(&times, &series, grid);

    debug!(dt, len = values.len(), unwrap, "resampled series");
    Ok(UniformSeries::new(dt, values))
}
