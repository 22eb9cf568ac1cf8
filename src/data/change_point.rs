//! Page-Hinkley detection of abrupt wind shifts.
//!
//! The detector tracks a running mean and two one-sided cumulative deviation
//! statistics. A positive excursion larger than the alarm threshold is a
//! *veer* (direction increasing), a negative one a *back*. After every alarm
//! the whole accumulator restarts from the triggering sample, so a sustained
//! shift is reported once.
//!
//! The threshold is derived from the smallest step of interest and the delay
//! allowed to detect it:
//!
//! ```text
//! threshold = max(0, step - drift) * (target_delay / dt) * scale
//! ```

use crate::config::ChangeSettings;
use crate::data::filter::ZeroPhaseFilter;
use crate::data::resample::UniformSeries;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, instrument};

/// Direction of a detected shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftDirection {
    /// Clockwise shift, direction angle increasing
    Veer,
    /// Counter-clockwise shift, direction angle decreasing
    Back,
}

impl fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftDirection::Veer => f.write_str("veer"),
            ShiftDirection::Back => f.write_str("back"),
        }
    }
}

/// A detected shift at `index` of the uniform series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Index into the uniform series of the triggering sample
    pub index: usize,
    /// Veer or back
    pub direction: ShiftDirection,
}

/// Alarm threshold for a step of `step_deg` detected within `delay_sec`.
///
/// Non-finite inputs, non-positive `dt`, a step no larger than the drift,
/// or a negative delay or scale all give `0.0`. A negative drift counts as
/// zero, matching [`PageHinkley::new`].
pub fn page_hinkley_threshold(step_deg: f64, drift: f64, delay_sec: f64, dt: f64, scale: f64) -> f64 {
    if !(step_deg.is_finite() && drift.is_finite() && delay_sec.is_finite() && scale.is_finite()) {
        return 0.0;
    }
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    let effective_step = (step_deg - drift.max(0.0)).max(0.0);
    if effective_step <= 0.0 {
        return 0.0;
    }
    (effective_step * (delay_sec / dt) * scale).max(0.0)
}

/// Running state of one Page-Hinkley test. Owned by a single detection run.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Accumulator {
    mean: f64,
    count: u64,
    m_pos: f64,
    min_pos: f64,
    m_neg: f64,
    max_neg: f64,
}

impl Accumulator {
    fn new(baseline: f64) -> Self {
        Self {
            mean: baseline,
            count: 1,
            m_pos: 0.0,
            min_pos: 0.0,
            m_neg: 0.0,
            max_neg: 0.0,
        }
    }

    /// Fold one sample in and return `(ph_pos, ph_neg)`.
    fn update(&mut self, x: f64, drift: f64) -> (f64, f64) {
        self.count += 1;
        self.mean += (x - self.mean) / self.count as f64;

        self.m_pos += x - self.mean - drift;
        self.min_pos = self.min_pos.min(self.m_pos);
        self.m_neg += x - self.mean + drift;
        self.max_neg = self.max_neg.max(self.m_neg);

        (self.m_pos - self.min_pos, self.max_neg - self.m_neg)
    }
}

/// Output of a detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeDetection {
    /// Alarm threshold used for this run
    pub threshold: f64,
    /// Upward statistic per sample (0 at index 0 and after each reset)
    pub ph_pos: Vec<f64>,
    /// Downward statistic per sample
    pub ph_neg: Vec<f64>,
    /// Alarms in time order
    pub events: Vec<ChangeEvent>,
}

/// Sequential Page-Hinkley change detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHinkley {
    drift: f64,
    threshold: f64,
}

impl PageHinkley {
    /// Negative or non-finite `drift` and `threshold` are treated as `0.0`.
    pub fn new(drift: f64, threshold: f64) -> Self {
        let non_negative = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            drift: non_negative(drift),
            threshold: non_negative(threshold),
        }
    }

    /// Alarm threshold in use
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run the test over `values`.
    pub fn detect(&self, values: &[f64]) -> ChangeDetection {
        let mut ph_pos = vec![0.0; values.len()];
        let mut ph_neg = vec![0.0; values.len()];
        let mut events = Vec::new();

        let Some(&first) = values.first() else {
            return ChangeDetection {
                threshold: self.threshold,
                ph_pos,
                ph_neg,
                events,
            };
        };

        let mut acc = Accumulator::new(first);
        for (index, &x) in values.iter().enumerate().skip(1) {
            let (pos, neg) = acc.update(x, self.drift);
            ph_pos[index] = pos;
            ph_neg[index] = neg;
            if pos > self.threshold || neg > self.threshold {
                let direction = if pos >= neg {
                    ShiftDirection::Veer
                } else {
                    ShiftDirection::Back
                };
                debug!(index, %direction, pos, neg, "page-hinkley alarm");
                events.push(ChangeEvent { index, direction });
                acc = Accumulator::new(x);
            }
        }

        ChangeDetection {
            threshold: self.threshold,
            ph_pos,
            ph_neg,
            events,
        }
    }
}

/// Wind-shift detector: short zero-phase pre-filter followed by a
/// Page-Hinkley test tuned from [`ChangeSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePointDetector {
    settings: ChangeSettings,
}

impl Default for ChangePointDetector {
    fn default() -> Self {
        Self::new(ChangeSettings::default())
    }
}

impl ChangePointDetector {
    /// Detector tuned by `settings`.
    pub fn new(settings: ChangeSettings) -> Self {
        Self { settings }
    }

    /// Threshold this detector uses for a series sampled every `dt` seconds.
    pub fn threshold_for(&self, dt: f64) -> f64 {
        let s = &self.settings;
        page_hinkley_threshold(s.step_deg, s.drift_deg, s.target_delay_sec, dt, s.threshold_scale)
    }

    /// Filter `series` with the change time constant and run the test.
    #[instrument(skip(self, series), fields(len = series.len()))]
    pub fn detect(&self, series: &UniformSeries) -> ChangeDetection {
        let dt = series.dt();
        let filtered = ZeroPhaseFilter::new(dt, self.settings.filter_tau_sec).apply(series.values());
        let detector = PageHinkley::new(self.settings.drift_deg, self.threshold_for(dt));
        let detection = detector.detect(&filtered);
        info!(
            threshold = detection.threshold,
            events = detection.events.len(),
            "change detection complete"
        );
        detection
    }
}
