//! Welch power spectral density and the sliding-window period tracker.
//!
//! Each analysis window is split into overlapping segments. Every segment is
//! mean-removed, Hann-tapered and transformed; the resulting power spectra are
//! normalized by the taper energy and averaged. The strongest in-band bin of
//! the average gives the dominant period for that window.

use crate::config::{SpectralSettings, WelchSettings};
use crate::data::fft::{in_period_band, rfft_frequencies, RealFft};
use crate::data::resample::UniformSeries;
use serde::Serialize;
use std::f64::consts::PI;
use tracing::{debug, info, instrument};

/// Symmetric Hann taper of `len` points.
pub fn hann_window(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (len - 1) as f64).cos())
            .collect(),
    }
}

/// Averaged one-sided power spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WelchEstimate {
    /// Bin frequencies, Hz
    pub frequencies: Vec<f64>,
    /// Averaged power per bin
    pub power: Vec<f64>,
    /// Number of segments averaged
    pub segments: usize,
}

impl WelchEstimate {
    /// Frequency of the strongest bin inside the period band, if any.
    pub fn peak_frequency(&self, min_period_sec: f64, max_freq_hz: f64) -> Option<f64> {
        self.frequencies
            .iter()
            .zip(&self.power)
            .filter(|(&f, _)| in_period_band(f, min_period_sec, max_freq_hz))
            .fold(None::<(f64, f64)>, |best, (&f, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((f, p)),
            })
            .map(|(f, _)| f)
    }
}

/// Welch estimator with a fixed segment length, reusable across windows.
#[derive(Debug, Clone)]
pub struct WelchEstimator {
    segment_len: usize,
    stride: usize,
    taper: Vec<f64>,
    taper_energy: f64,
    fft: RealFft,
}

impl WelchEstimator {
    /// Estimator for `segment_len`-sample segments overlapping by `overlap`.
    pub fn new(segment_len: usize, overlap: usize) -> Self {
        let taper = hann_window(segment_len);
        let taper_energy = taper.iter().map(|w| w * w).sum();
        Self {
            segment_len,
            stride: segment_len.saturating_sub(overlap).max(1),
            taper,
            taper_energy,
            fft: RealFft::new(segment_len),
        }
    }

    /// Estimate the PSD of `values`. `None` when the segment length is below
    /// two, the input is shorter than one segment, or the taper has no energy.
    pub fn estimate(&self, values: &[f64], dt: f64) -> Option<WelchEstimate> {
        let n = self.segment_len;
        if n < 2 || values.len() < n || self.taper_energy <= 0.0 {
            return None;
        }

        let mut sum = vec![0.0; n / 2 + 1];
        let mut segments = 0usize;
        for start in (0..=values.len() - n).step_by(self.stride) {
            let segment = &values[start..start + n];
            let mean = segment.iter().sum::<f64>() / n as f64;
            let tapered: Vec<f64> = segment
                .iter()
                .zip(&self.taper)
                .map(|(v, w)| (v - mean) * w)
                .collect();
            for (acc, bin) in sum.iter_mut().zip(self.fft.process(&tapered)) {
                *acc += bin.norm_sqr() / self.taper_energy;
            }
            segments += 1;
        }
        if segments == 0 {
            return None;
        }

        Some(WelchEstimate {
            frequencies: rfft_frequencies(n, dt),
            power: sum.into_iter().map(|p| p / segments as f64).collect(),
            segments,
        })
    }
}

/// Welch PSD of `values` with `segment_len`-sample segments overlapping by
/// `overlap` samples. The segment length is capped at the input length.
pub fn welch_psd(values: &[f64], dt: f64, segment_len: usize, overlap: usize) -> Option<WelchEstimate> {
    if segment_len < 2 || values.len() < 2 {
        return None;
    }
    WelchEstimator::new(segment_len.min(values.len()), overlap).estimate(values, dt)
}

/// Dominant period of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodPoint {
    /// Window centre, minutes from series start
    pub center_time_min: f64,
    /// Dominant period, minutes
    pub peak_period_min: f64,
}

/// Dominant period over time, one point per window that produced a peak.
pub type PeriodTrace = Vec<PeriodPoint>;

/// Window geometry in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    /// Samples per analysis window
    pub window: usize,
    /// Samples between window starts
    pub step: usize,
    /// Samples per Welch segment
    pub segment: usize,
    /// Samples shared by consecutive segments
    pub overlap: usize,
}

fn samples_for(seconds: f64, dt: f64) -> usize {
    // Saturating cast: NaN and negatives become 0
    (seconds / dt).round_ties_even() as usize
}

/// Sliding-window Welch tracker of the dominant oscillation period.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSpectralTracker {
    /// Analysis window length, seconds
    pub window_sec: f64,
    /// Stride between windows, seconds
    pub step_sec: f64,
    /// Welch segment length, seconds
    pub segment_sec: f64,
    /// Shortest period considered, seconds
    pub min_period_sec: f64,
    /// Highest frequency considered, Hz
    pub max_freq_hz: f64,
}

impl Default for WindowedSpectralTracker {
    fn default() -> Self {
        Self::from_settings(&WelchSettings::default(), &SpectralSettings::default())
    }
}

impl WindowedSpectralTracker {
    /// Tracker from the `[welch]` geometry and the `[spectral]` band.
    pub fn from_settings(welch: &WelchSettings, spectral: &SpectralSettings) -> Self {
        Self {
            window_sec: welch.window_sec,
            step_sec: welch.step_sec,
            segment_sec: welch.segment_sec,
            min_period_sec: spectral.min_period_sec,
            max_freq_hz: spectral.max_recon_freq_hz,
        }
    }

    /// Convert the configured durations into sample counts for a series of
    /// `total` samples spaced `dt` seconds apart.
    pub fn plan(&self, dt: f64, total: usize) -> WindowPlan {
        let window = samples_for(self.window_sec, dt).max(8).min(total);
        let step = samples_for(self.step_sec, dt).max(1).min(window);
        let segment = samples_for(self.segment_sec, dt).max(8).min(window);
        let overlap = segment.saturating_sub(1).min(segment / 2);
        WindowPlan {
            window,
            step,
            segment,
            overlap,
        }
    }

    /// Dominant period of every window that has an in-band peak.
    #[instrument(skip(self, series), fields(len = series.len(), dt = series.dt()))]
    pub fn track(&self, series: &UniformSeries) -> PeriodTrace {
        let total = series.len();
        if total < 2 {
            return Vec::new();
        }
        let dt = series.dt();
        let plan = self.plan(dt, total);
        debug!(?plan, "welch window plan");

        let estimator = WelchEstimator::new(plan.segment, plan.overlap);
        let values = series.values();
        let mut trace = Vec::new();
        let mut skipped = 0usize;
        for start in (0..=total - plan.window).step_by(plan.step) {
            let window = &values[start..start + plan.window];
            let peak = estimator
                .estimate(window, dt)
                .and_then(|est| est.peak_frequency(self.min_period_sec, self.max_freq_hz))
                .filter(|f| f.is_finite() && *f > 0.0);
            let Some(frequency) = peak else {
                skipped += 1;
                continue;
            };
            let center = (series.time_at(start) + series.time_at(start + plan.window - 1)) / 2.0;
            trace.push(PeriodPoint {
                center_time_min: center / 60.0,
                peak_period_min: (1.0 / frequency) / 60.0,
            });
        }

        info!(points = trace.len(), skipped, "period trace complete");
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sinusoid(dt: f64, len: usize, period: impl Fn(usize) -> f64) -> UniformSeries {
        UniformSeries::new(
            dt,
            (0..len)
                .map(|i| 180.0 + 10.0 * (2.0 * PI * i as f64 * dt / period(i)).sin())
                .collect(),
        )
    }

    #[test]
    fn hann_matches_reference_shape() {
        assert_eq!(hann_window(1), vec![1.0]);
        let w = hann_window(5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in w.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn plan_follows_durations_and_caps() {
        let tracker = WindowedSpectralTracker::default();
        assert_eq!(
            tracker.plan(5.0, 10_000),
            WindowPlan {
                window: 120,
                step: 12,
                segment: 96,
                overlap: 48
            }
        );
        let short = tracker.plan(5.0, 5);
        assert_eq!(short.window, 5);
        assert_eq!(short.segment, 5);
        assert_eq!(short.step, 5);
        assert_eq!(short.overlap, 2);
    }

    #[test]
    fn welch_averages_overlapping_segments() {
        let values: Vec<f64> = (0..64).map(|i| (2.0 * PI * i as f64 / 8.0).sin()).collect();
        let est = welch_psd(&values, 1.0, 16, 8).unwrap();
        assert_eq!(est.segments, 7);
        assert_eq!(est.frequencies.len(), 9);
        let peak = est.peak_frequency(0.0, f64::INFINITY).unwrap();
        assert!((peak - 0.125).abs() < 1e-12);
    }

    #[test]
    fn welch_rejects_degenerate_input() {
        assert!(welch_psd(&[1.0], 1.0, 8, 4).is_none());
        assert!(welch_psd(&[1.0, 2.0, 3.0], 1.0, 1, 0).is_none());
    }

    #[test]
    fn steady_oscillation_gives_flat_trace() {
        let tracker = WindowedSpectralTracker {
            window_sec: 1200.0,
            segment_sec: 600.0,
            ..WindowedSpectralTracker::default()
        };
        let trace = tracker.track(&sinusoid(5.0, 720, |_| 300.0));
        assert_eq!(trace.len(), 41);
        for point in &trace {
            assert!((point.peak_period_min - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn default_geometry_brackets_five_minute_period() {
        let trace = WindowedSpectralTracker::default().track(&sinusoid(5.0, 720, |_| 300.0));
        assert!(!trace.is_empty());
        for point in &trace {
            assert!((4.0 - 1e-9..=8.0 + 1e-9).contains(&point.peak_period_min));
        }
    }

    #[test]
    fn period_switch_shows_at_midpoint() {
        let len = 1440;
        let dt = 5.0;
        let series = sinusoid(dt, len, |i| if i < len / 2 { 300.0 } else { 900.0 });
        let tracker = WindowedSpectralTracker {
            window_sec: 1800.0,
            segment_sec: 900.0,
            ..WindowedSpectralTracker::default()
        };
        let trace = tracker.track(&series);
        let midpoint_min = (len / 2) as f64 * dt / 60.0;
        let half_window_min = 1800.0 / 60.0 / 2.0;

        let before: Vec<_> = trace
            .iter()
            .filter(|p| p.center_time_min + half_window_min <= midpoint_min)
            .collect();
        let after: Vec<_> = trace
            .iter()
            .filter(|p| p.center_time_min - half_window_min >= midpoint_min)
            .collect();
        assert!(!before.is_empty() && !after.is_empty());
        assert!(before.iter().all(|p| (p.peak_period_min - 5.0).abs() < 1e-9));
        assert!(after.iter().all(|p| (p.peak_period_min - 15.0).abs() < 1e-9));
    }

    #[test]
    fn tiny_series_yields_empty_trace() {
        let tracker = WindowedSpectralTracker::default();
        assert!(tracker.track(&UniformSeries::new(1.0, vec![1.0])).is_empty());
        // Eight one-second samples cannot hold a period of a minute or more.
        assert!(tracker.track(&UniformSeries::new(1.0, vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0])).is_empty());
    }
}
