//! Full-series spectral analysis and dominant-oscillation reconstruction.
//!
//! The extractor works on a detrended, low-pass filtered copy of the series:
//!
//! 1. Fit and subtract a linear trend.
//! 2. Smooth the residual with a [`ZeroPhaseFilter`].
//! 3. Remove the residual mean and take a one-sided FFT.
//! 4. Keep the strongest bins inside the configured period band as [`Peak`]s.
//! 5. Reconstruct `trend + mean + sum(amplitude * cos(2*pi*f*t + phase))`.
//!
//! # Example
//!
//! ```
//! use wind_fft::data::fft::SpectralPeakExtractor;
//! use wind_fft::data::resample::UniformSeries;
//! use std::f64::consts::PI;
//!
//! let dt = 5.0;
//! let values: Vec<f64> = (0..720)
//!     .map(|i| 180.0 + 10.0 * (2.0 * PI * i as f64 * dt / 300.0).cos())
//!     .collect();
//! let series = UniformSeries::new(dt, values);
//!
//! let analysis = SpectralPeakExtractor::default().extract(&series).unwrap();
//! assert!((analysis.peaks[0].period - 300.0).abs() < 1.0);
//! ```

use crate::config::SpectralSettings;
use crate::data::filter::ZeroPhaseFilter;
use crate::data::resample::UniformSeries;
use crate::data::trend::LinearTrend;
use crate::error::{AppResult, InputError};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::Serialize;
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Forward FFT of real input returning the non-negative frequency bins
/// `0..=len/2`.
#[derive(Clone)]
pub struct RealFft {
    len: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for RealFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFft").field("len", &self.len).finish()
    }
}

impl RealFft {
    /// Plan a forward transform of `len` points.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        Self { len, fft }
    }

    /// Transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length transform.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of one-sided bins produced for this length.
    pub fn bins(&self) -> usize {
        self.len / 2 + 1
    }

    /// Transform `values`, which must have exactly `len` elements.
    pub fn process(&self, values: &[f64]) -> Vec<Complex<f64>> {
        debug_assert_eq!(values.len(), self.len);
        if self.len == 0 {
            return Vec::new();
        }
        let mut buffer: Vec<Complex<f64>> =
            values.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.fft.process(&mut buffer);
        buffer.truncate(self.bins());
        buffer
    }
}

/// Bin frequencies in Hz for a one-sided transform of `len` samples spaced
/// `dt` seconds apart.
pub fn rfft_frequencies(len: usize, dt: f64) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    let span = len as f64 * dt;
    (0..=len / 2).map(|k| k as f64 / span).collect()
}

/// True when a bin lies in the band of physically meaningful wind periods.
pub fn in_period_band(frequency: f64, min_period_sec: f64, max_freq_hz: f64) -> bool {
    if !(frequency > 0.0 && frequency <= max_freq_hz) {
        return false;
    }
    let period = 1.0 / frequency;
    period.is_finite() && period >= min_period_sec
}

/// One dominant oscillation found in the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    /// Hz, always positive
    pub frequency: f64,
    /// Degrees, half peak-to-peak
    pub amplitude: f64,
    /// Radians, phase of the cosine at `t = 0`
    pub phase: f64,
    /// Seconds, `1 / frequency`
    pub period: f64,
}

impl Peak {
    /// Contribution of this oscillation at time `t` seconds.
    pub fn value_at(&self, t: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * t + self.phase).cos()
    }
}

/// One-sided amplitude spectrum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    /// Bin frequencies, Hz
    pub frequencies: Vec<f64>,
    /// Physical amplitude per bin, degrees
    pub amplitudes: Vec<f64>,
    /// Phase per bin, radians
    pub phases: Vec<f64>,
}

impl Spectrum {
    /// Compute the spectrum of `values` sampled every `dt` seconds.
    ///
    /// `amplitude[k] = |X[k]| / N`, doubled for every bin except DC and, for
    /// even `N`, the Nyquist bin, so that a pure cosine of amplitude `A`
    /// reports `A`.
    pub fn compute(values: &[f64], dt: f64) -> Self {
        let n = values.len();
        let bins = RealFft::new(n).process(values);
        let nyquist = (n % 2 == 0).then_some(n / 2);
        let amplitudes = bins
            .iter()
            .enumerate()
            .map(|(k, c)| {
                let a = c.norm() / n as f64;
                if k == 0 || Some(k) == nyquist {
                    a
                } else {
                    2.0 * a
                }
            })
            .collect();
        Self {
            frequencies: rfft_frequencies(n, dt),
            amplitudes,
            phases: bins.iter().map(|c| c.arg()).collect(),
        }
    }

    /// Number of one-sided bins.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// True when the spectrum has no bins.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// The `count` strongest in-band bins, strongest first. Equal amplitudes
    /// keep ascending bin order.
    pub fn top_peaks(&self, min_period_sec: f64, max_freq_hz: f64, count: usize) -> Vec<Peak> {
        let mut candidates: Vec<usize> = (0..self.len())
            .filter(|&k| in_period_band(self.frequencies[k], min_period_sec, max_freq_hz))
            .collect();
        candidates.sort_by(|&a, &b| self.amplitudes[b].total_cmp(&self.amplitudes[a]));
        candidates
            .into_iter()
            .take(count)
            .map(|k| Peak {
                frequency: self.frequencies[k],
                amplitude: self.amplitudes[k],
                phase: self.phases[k],
                period: 1.0 / self.frequencies[k],
            })
            .collect()
    }

    /// `(period_minutes, amplitude)` for every positive-frequency bin whose
    /// period is at least `min_period_sec`, sorted by period.
    ///
    /// Fails with `NoSpectralContent` when nothing survives the cutoff.
    pub fn period_band(&self, min_period_sec: f64) -> Result<Vec<(f64, f64)>, InputError> {
        let mut band: Vec<(f64, f64)> = self
            .frequencies
            .iter()
            .zip(&self.amplitudes)
            .filter(|(&f, _)| f > 0.0)
            .map(|(&f, &a)| (1.0 / f, a))
            .filter(|(period, _)| period.is_finite() && *period >= min_period_sec)
            .map(|(period, a)| (period / 60.0, a))
            .collect();
        if band.is_empty() {
            return Err(InputError::NoSpectralContent { min_period_sec });
        }
        band.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(band)
    }
}

/// Result of the full-series spectral stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralAnalysis {
    /// Fitted linear drift
    pub trend: LinearTrend,
    /// Mean of the filtered residual
    pub mean_offset: f64,
    /// Filtered residual with the trend added back, a clean low-pass reference
    pub lowpass: Vec<f64>,
    /// Spectrum of the centred, filtered residual
    pub spectrum: Spectrum,
    /// Strongest in-band oscillations, strongest first
    pub peaks: Vec<Peak>,
    /// Trend plus mean plus the retained oscillations, one value per sample
    pub reconstruction: Vec<f64>,
}

/// Extracts the dominant oscillations of a uniform series.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralPeakExtractor {
    /// Shortest period kept as a peak, seconds
    pub min_period_sec: f64,
    /// Highest frequency kept as a peak, Hz
    pub max_freq_hz: f64,
    /// Number of peaks retained
    pub peak_count: usize,
    /// Smoothing time constant, seconds
    pub filter_tau_sec: f64,
}

impl Default for SpectralPeakExtractor {
    fn default() -> Self {
        Self::from_settings(&SpectralSettings::default())
    }
}

impl SpectralPeakExtractor {
    /// Extractor configured from the `[spectral]` section.
    pub fn from_settings(settings: &SpectralSettings) -> Self {
        Self {
            min_period_sec: settings.min_period_sec,
            max_freq_hz: settings.max_recon_freq_hz,
            peak_count: settings.peak_count,
            filter_tau_sec: settings.filter_tau_sec,
        }
    }

    /// Run the spectral stage. Fails only on an empty series.
    #[instrument(skip(self, series), fields(len = series.len(), dt = series.dt()))]
    pub fn extract(&self, series: &UniformSeries) -> AppResult<SpectralAnalysis> {
        if series.is_empty() {
            return Err(InputError::TooFewSamples { found: 0 }.into());
        }
        let dt = series.dt();
        let times = series.times();
        let values = series.values();

        let trend = LinearTrend::fit(&times, values);
        let trend_line = trend.evaluate(&times);
        let detrended: Vec<f64> = values
            .iter()
            .zip(&trend_line)
            .map(|(v, t)| v - t)
            .collect();

        let filtered = ZeroPhaseFilter::new(dt, self.filter_tau_sec).apply(&detrended);
        let lowpass: Vec<f64> = filtered
            .iter()
            .zip(&trend_line)
            .map(|(f, t)| f + t)
            .collect();

        let mean_offset = filtered.iter().sum::<f64>() / filtered.len() as f64;
        let centred: Vec<f64> = filtered.iter().map(|f| f - mean_offset).collect();

        let spectrum = Spectrum::compute(&centred, dt);
        let peaks = spectrum.top_peaks(self.min_period_sec, self.max_freq_hz, self.peak_count);
        debug!(bins = spectrum.len(), peaks = peaks.len(), "spectrum computed");

        let reconstruction: Vec<f64> = times
            .iter()
            .zip(&trend_line)
            .map(|(&t, &base)| base + mean_offset + peaks.iter().map(|p| p.value_at(t)).sum::<f64>())
            .collect();

        for peak in &peaks {
            info!(
                period_min = peak.period / 60.0,
                amplitude_deg = peak.amplitude,
                "spectral peak"
            );
        }

        Ok(SpectralAnalysis {
            trend,
            mean_offset,
            lowpass,
            spectrum,
            peaks,
            reconstruction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(dt: f64, len: usize, f: impl Fn(f64) -> f64) -> UniformSeries {
        UniformSeries::new(dt, (0..len).map(|i| f(i as f64 * dt)).collect())
    }

    #[test]
    fn frequencies_follow_length_and_interval() {
        assert_eq!(rfft_frequencies(4, 0.5), vec![0.0, 0.5, 1.0]);
        assert_eq!(rfft_frequencies(5, 1.0).len(), 3);
        assert!(rfft_frequencies(0, 1.0).is_empty());
    }

    #[test]
    fn amplitude_normalization_recovers_cosine() {
        let n = 64;
        let values: Vec<f64> = (0..n)
            .map(|i| 3.0 * (2.0 * PI * 4.0 * i as f64 / n as f64).cos())
            .collect();
        let spectrum = Spectrum::compute(&values, 1.0);
        assert!((spectrum.amplitudes[4] - 3.0).abs() < 1e-9);
        assert!(spectrum.amplitudes[0].abs() < 1e-9);

        // Nyquist bin is not doubled
        let alternating: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let spectrum = Spectrum::compute(&alternating, 1.0);
        assert!((spectrum.amplitudes[n / 2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn band_excludes_dc_fast_and_short_periods() {
        assert!(!in_period_band(0.0, 60.0, 1.0 / 60.0));
        assert!(!in_period_band(1.0 / 30.0, 60.0, 1.0));
        assert!(!in_period_band(1.0 / 30.0, 10.0, 1.0 / 60.0));
        assert!(in_period_band(1.0 / 300.0, 60.0, 1.0 / 60.0));
    }

    #[test]
    fn recovers_injected_oscillation_over_drift() {
        let s = series(5.0, 720, |t| {
            180.0 + 0.01 * t + 10.0 * (2.0 * PI * t / 300.0 + 0.4).cos()
        });
        let analysis = SpectralPeakExtractor::default().extract(&s).unwrap();
        let peak = analysis.peaks[0];
        assert!((peak.period - 300.0).abs() <= 0.05 * 300.0, "period {}", peak.period);
        assert!((peak.amplitude - 10.0).abs() <= 0.05 * 10.0, "amplitude {}", peak.amplitude);
        assert!((analysis.trend.slope - 0.01).abs() < 1e-3);
        assert_eq!(analysis.reconstruction.len(), s.len());
        assert_eq!(analysis.lowpass.len(), s.len());
    }

    #[test]
    fn peaks_are_ranked_by_amplitude() {
        let s = series(5.0, 1440, |t| {
            4.0 * (2.0 * PI * t / 900.0).cos() + 8.0 * (2.0 * PI * t / 240.0).cos()
        });
        let analysis = SpectralPeakExtractor::default().extract(&s).unwrap();
        assert_eq!(analysis.peaks.len(), 2);
        assert!((analysis.peaks[0].period - 240.0).abs() < 1e-6);
        assert!((analysis.peaks[1].period - 900.0).abs() < 1e-6);
        assert!(analysis.peaks[0].amplitude > analysis.peaks[1].amplitude);
    }

    #[test]
    fn no_in_band_content_reconstructs_trend_only() {
        let extractor = SpectralPeakExtractor {
            min_period_sec: 1.0e9,
            ..SpectralPeakExtractor::default()
        };
        let s = series(1.0, 100, |t| 2.0 * t + 5.0);
        let analysis = extractor.extract(&s).unwrap();
        assert!(analysis.peaks.is_empty());
        for (i, v) in analysis.reconstruction.iter().enumerate() {
            let expected = analysis.trend.at(i as f64) + analysis.mean_offset;
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn period_band_guard() {
        let spectrum = Spectrum::compute(&[1.0, -1.0, 1.0, -1.0], 1.0);
        assert_eq!(
            spectrum.period_band(60.0),
            Err(InputError::NoSpectralContent {
                min_period_sec: 60.0
            })
        );
        let band = spectrum.period_band(0.0).unwrap();
        assert_eq!(band.len(), 2);
        assert!(band[0].0 < band[1].0);
    }

    #[test]
    fn empty_series_is_rejected() {
        let err = SpectralPeakExtractor::default()
            .extract(&UniformSeries::new(1.0, Vec::new()))
            .unwrap_err();
        assert!(err.as_input().is_some());
    }
}
