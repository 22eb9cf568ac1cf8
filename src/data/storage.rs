//! Writers for analysis results.
//!
//! `ReportWriter` lays a completed [`AnalysisReport`] out as a directory of
//! CSV tables plus a JSON document. Angles in `reconstruction.csv` are given
//! both as the continuous (unwrapped) values used by the analysis and rewrapped
//! onto `[0, 360)`.

use crate::data::resample::wrap_degrees;
use crate::error::AppResult;
use crate::pipeline::AnalysisReport;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Series, low-pass reference and reconstruction per grid point
pub const RECONSTRUCTION_FILE: &str = "reconstruction.csv";
/// Retained spectral peaks, strongest first
pub const PEAKS_FILE: &str = "peaks.csv";
/// Detected wind shifts
pub const EVENTS_FILE: &str = "events.csv";
/// Page-Hinkley statistics per grid point
pub const PAGE_HINKLEY_FILE: &str = "page_hinkley.csv";
/// Dominant period per Welch window
pub const PERIOD_TRACE_FILE: &str = "period_trace.csv";
/// Amplitude spectrum above the period cutoff
pub const SPECTRUM_FILE: &str = "spectrum.csv";
/// Full report
pub const REPORT_FILE: &str = "report.json";

#[derive(Serialize)]
struct ReconstructionRow {
    time_s: f64,
    value_deg: f64,
    lowpass_deg: f64,
    reconstruction_deg: f64,
    reconstruction_wrapped_deg: f64,
}

#[derive(Serialize)]
struct PeakRow {
    rank: usize,
    frequency_hz: f64,
    period_min: f64,
    amplitude_deg: f64,
    phase_rad: f64,
}

#[derive(Serialize)]
struct EventRow {
    index: usize,
    time_s: f64,
    direction: String,
}

#[derive(Serialize)]
struct PageHinkleyRow {
    time_s: f64,
    ph_pos: f64,
    ph_neg: f64,
    threshold: f64,
}

#[derive(Serialize)]
struct SpectrumRow {
    period_min: f64,
    amplitude_deg: f64,
}

/// Writes every table of a report into one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    min_period_sec: f64,
}

impl ReportWriter {
    /// `min_period_sec` is the cutoff applied to the exported spectrum.
    pub fn new<P: AsRef<Path>>(dir: P, min_period_sec: f64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            min_period_sec,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write all tables and the JSON report, returning the paths written.
    ///
    /// Fails before touching the filesystem if the spectrum has nothing at or
    /// above the period cutoff.
    pub fn write_all(&self, report: &AnalysisReport) -> AppResult<Vec<PathBuf>> {
        let band = report.spectral.spectrum.period_band(self.min_period_sec)?;
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }

        let written = vec![
            self.write_reconstruction(report)?,
            self.write_peaks(report)?,
            self.write_events(report)?,
            self.write_page_hinkley(report)?,
            self.write_period_trace(report)?,
            self.write_rows(
                SPECTRUM_FILE,
                band.into_iter().map(|(period_min, amplitude_deg)| SpectrumRow {
                    period_min,
                    amplitude_deg,
                }),
            )?,
            self.write_json(report)?,
        ];
        info!(dir = %self.dir.display(), files = written.len(), "report written");
        Ok(written)
    }

    /// Write the resampled series, low-pass reference and reconstruction.
    pub fn write_reconstruction(&self, report: &AnalysisReport) -> AppResult<PathBuf> {
        let series = &report.series;
        let spectral = &report.spectral;
        let rows = series
            .values()
            .iter()
            .zip(&spectral.lowpass)
            .zip(&spectral.reconstruction)
            .enumerate()
            .map(|(i, ((&value, &lowpass), &recon))| ReconstructionRow {
                time_s: series.time_at(i),
                value_deg: value,
                lowpass_deg: lowpass,
                reconstruction_deg: recon,
                reconstruction_wrapped_deg: wrap_degrees(recon),
            });
        self.write_rows(RECONSTRUCTION_FILE, rows)
    }

    /// Write the retained peaks with their rank.
    pub fn write_peaks(&self, report: &AnalysisReport) -> AppResult<PathBuf> {
        let rows = report
            .spectral
            .peaks
            .iter()
            .enumerate()
            .map(|(rank, p)| PeakRow {
                rank: rank + 1,
                frequency_hz: p.frequency,
                period_min: p.period / 60.0,
                amplitude_deg: p.amplitude,
                phase_rad: p.phase,
            });
        self.write_rows(PEAKS_FILE, rows)
    }

    /// Write detected shifts with their times.
    pub fn write_events(&self, report: &AnalysisReport) -> AppResult<PathBuf> {
        let rows = report.changes.events.iter().map(|e| EventRow {
            index: e.index,
            time_s: report.series.time_at(e.index),
            direction: e.direction.to_string(),
        });
        self.write_rows(EVENTS_FILE, rows)
    }

    /// Write both Page-Hinkley statistics and the threshold.
    pub fn write_page_hinkley(&self, report: &AnalysisReport) -> AppResult<PathBuf> {
        let changes = &report.changes;
        let rows = changes
            .ph_pos
            .iter()
            .zip(&changes.ph_neg)
            .enumerate()
            .map(|(i, (&ph_pos, &ph_neg))| PageHinkleyRow {
                time_s: report.series.time_at(i),
                ph_pos,
                ph_neg,
                threshold: changes.threshold,
            });
        self.write_rows(PAGE_HINKLEY_FILE, rows)
    }

    /// Write the Welch period trace.
    pub fn write_period_trace(&self, report: &AnalysisReport) -> AppResult<PathBuf> {
        self.write_rows(PERIOD_TRACE_FILE, report.period_trace.iter())
    }

    /// Write the whole report as pretty-printed JSON.
    pub fn write_json(&self, report: &AnalysisReport) -> AppResult<PathBuf> {
        let path = self.dir.join(REPORT_FILE);
        let mut out = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut out, report)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(path)
    }

    fn write_rows<T, I>(&self, name: &str, rows: I) -> AppResult<PathBuf>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let path = self.dir.join(name);
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }
}
