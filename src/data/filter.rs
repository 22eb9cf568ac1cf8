//! Zero-phase single-pole low-pass filter.
//!
//! A first-order exponential smoother is run forward over the data and then
//! backward over the forward output. The backward pass starts from the last
//! forward value, and the two passes' phase delays cancel.
//!
//! # Example
//!
//! ```
//! use wind_fft::data::filter::ZeroPhaseFilter;
//!
//! let filter = ZeroPhaseFilter::new(1.0, 10.0);
//! let smoothed = filter.apply(&[0.0, 0.0, 10.0, 0.0, 0.0]);
//! assert_eq!(smoothed.len(), 5);
//! ```

/// Forward-backward exponential smoother parameterized by sample interval
/// and time constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroPhaseFilter {
    /// `None` when the parameters are degenerate; the filter is then the
    /// identity.
    alpha: Option<f64>,
}

impl ZeroPhaseFilter {
    /// `dt` is the sample interval and `tau` the time constant, both in
    /// seconds. The smoothing coefficient is `1 - exp(-dt / tau)`.
    pub fn new(dt: f64, tau: f64) -> Self {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        let alpha = (valid(dt) && valid(tau)).then(|| 1.0 - (-dt / tau).exp());
        Self { alpha }
    }

    /// Smoothing coefficient, `None` for the identity filter.
    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    /// True when the parameters were degenerate.
    pub fn is_identity(&self) -> bool {
        self.alpha.is_none()
    }

    /// Filter a whole series. Never fails; degenerate parameters return the
    /// input unchanged.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let Some(alpha) = self.alpha else {
            return values.to_vec();
        };
        let Some(&first) = values.first() else {
            return Vec::new();
        };

        let mut forward = Vec::with_capacity(values.len());
        let mut state = first;
        for &x in values {
            state += alpha * (x - state);
            forward.push(state);
        }

        let mut backward = vec![0.0; values.len()];
        let mut state = forward[forward.len() - 1];
        for (out, &x) in backward.iter_mut().zip(forward.iter()).rev() {
            state += alpha * (x - state);
            *out = state;
        }
        backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn degenerate_parameters_are_identity() {
        let data = vec![1.0, 5.0, -2.0];
        for (dt, tau) in [(0.0, 5.0), (1.0, 0.0), (-1.0, 5.0), (f64::NAN, 5.0), (1.0, f64::INFINITY)] {
            let filter = ZeroPhaseFilter::new(dt, tau);
            assert!(filter.is_identity());
            assert_eq!(filter.apply(&data), data);
        }
    }

    #[test]
    fn coefficient_matches_time_constant() {
        let filter = ZeroPhaseFilter::new(5.0, 10.0);
        let alpha = filter.alpha().unwrap();
        assert!((alpha - (1.0 - (-0.5f64).exp())).abs() < 1e-15);
    }

    #[test]
    fn empty_and_constant_inputs() {
        let filter = ZeroPhaseFilter::new(1.0, 3.0);
        assert!(filter.apply(&[]).is_empty());
        let flat = vec![42.0; 50];
        for v in filter.apply(&flat) {
            assert!((v - 42.0).abs() < 1e-12);
        }
    }

    #[test]
    fn smoothing_reduces_noise() {
        let signal: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let filtered = ZeroPhaseFilter::new(1.0, 5.0).apply(&signal);
        let energy = |v: &[f64]| v.iter().map(|x| x * x).sum::<f64>();
        assert!(energy(&filtered[10..190]) < 0.05 * energy(&signal[10..190]));
    }

    #[test]
    fn no_phase_lag_on_slow_sinusoid() {
        let period = 200.0;
        let signal: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * i as f64 / period).sin())
            .collect();
        let filtered = ZeroPhaseFilter::new(1.0, 5.0).apply(&signal);

        let xcorr = |lag: i64| -> f64 {
            (100..900)
                .map(|i| signal[i] * filtered[(i as i64 + lag) as usize])
                .sum()
        };
        let best = (-20..=20)
            .max_by(|&a, &b| xcorr(a).total_cmp(&xcorr(b)))
            .unwrap();
        assert_eq!(best, 0);
    }
}
