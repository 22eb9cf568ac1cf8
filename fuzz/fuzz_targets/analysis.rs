//! Fuzz target for resampling and the three analyses.
//!
//! Tests:
//! - Irregular spacing, gaps and duplicate times
//! - Arbitrary angles including wrap-around jumps
//! - Arbitrary (possibly degenerate) stage settings

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wind_fft::config::Settings;
use wind_fft::data::ingest::{RawSample, SampleSet};
use wind_fft::WindPipeline;

#[derive(Debug, Arbitrary)]
struct AnalysisInput {
    /// Time step to the next sample in tenths of a second
    steps: Vec<(u8, i16)>,
    unwrap: bool,
    filter_tau: f32,
    drift: f32,
    step_deg: f32,
    peak_count: u8,
}

fuzz_target!(|input: AnalysisInput| {
    let mut time = 0.0;
    let rows: Vec<RawSample> = input
        .steps
        .iter()
        .take(2048)
        .map(|&(gap, angle)| {
            time += f64::from(gap) / 10.0;
            RawSample {
                time: Some(time),
                angle: f64::from(angle),
            }
        })
        .collect();
    let Ok(samples) = SampleSet::from_raw(&rows) else {
        return;
    };

    let mut settings = Settings::default();
    settings.input.unwrap = input.unwrap;
    settings.spectral.filter_tau_sec = f64::from(input.filter_tau);
    settings.spectral.peak_count = usize::from(input.peak_count % 8);
    settings.change.drift_deg = f64::from(input.drift);
    settings.change.step_deg = f64::from(input.step_deg);

    let Ok(report) = WindPipeline::from_settings(&settings).run(&samples) else {
        return;
    };

    let len = report.series.len();
    assert_eq!(report.spectral.reconstruction.len(), len);
    assert_eq!(report.changes.ph_pos.len(), len);
    assert!(report.spectral.peaks.len() <= settings.spectral.peak_count);
    for event in &report.changes.events {
        assert!(event.index > 0 && event.index < len);
    }
});
