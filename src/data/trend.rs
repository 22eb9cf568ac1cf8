//! Linear trend removal.

use serde::Serialize;

/// Ordinary-least-squares line `value = slope * time + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearTrend {
    /// Degrees per second
    pub slope: f64,
    /// Value at `t = 0`
    pub intercept: f64,
}

impl LinearTrend {
    /// Fit over `(times[i], values[i])` pairs. A degenerate time axis (fewer
    /// than two distinct times) yields a flat line through the mean.
    pub fn fit(times: &[f64], values: &[f64]) -> Self {
        let n = times.len().min(values.len());
        if n == 0 {
            return Self {
                slope: 0.0,
                intercept: 0.0,
            };
        }
        let count = n as f64;
        let t_mean = times[..n].iter().sum::<f64>() / count;
        let v_mean = values[..n].iter().sum::<f64>() / count;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (&t, &v) in times[..n].iter().zip(&values[..n]) {
            numerator += (t - t_mean) * (v - v_mean);
            denominator += (t - t_mean).powi(2);
        }

        let slope = if denominator.abs() > 1e-10 {
            numerator / denominator
        } else {
            0.0
        };
        Self {
            slope,
            intercept: v_mean - slope * t_mean,
        }
    }

    /// The line evaluated at `time`.
    pub fn at(&self, time: f64) -> f64 {
        self.slope * time + self.intercept
    }

    /// The fitted line evaluated at each time.
    pub fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.at(t)).collect()
    }
}
