//! Reading wind-direction samples from delimited text.
//!
//! Header names are matched case-insensitively: `timestamp` or `time` for the
//! time column, `wind_dir_deg` or `wind_dir` for the direction column. Rows
//! without a parseable direction are dropped. Timestamps are optional per row;
//! see [`fill_missing_times`] for the fallback rules.

use crate::error::{AppResult, InputError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const TIME_ALIASES: [&str; 2] = ["timestamp", "time"];
const ANGLE_ALIASES: [&str; 2] = ["wind_dir_deg", "wind_dir"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A single wind-direction reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Seconds since the earliest sample of the set
    pub time: f64,
    /// Direction in degrees (circular)
    pub angle: f64,
}

/// Samples ordered by strictly increasing time, one per timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

/// A row as read from the source, before time normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Absolute time in seconds, if the row had a usable timestamp
    pub time: Option<f64>,
    /// Direction in degrees
    pub angle: f64,
}

impl SampleSet {
    /// Build a set from raw rows: fill missing times, sort, shift the time
    /// origin to the earliest sample and collapse exact-equal timestamps,
    /// keeping the value that came last in the source.
    pub fn from_raw(rows: &[RawSample]) -> AppResult<Self> {
        if rows.is_empty() {
            return Err(InputError::NoSamples.into());
        }
        let times = fill_missing_times(rows);
        let mut pairs: Vec<(f64, f64)> = times
            .into_iter()
            .zip(rows.iter().map(|r| r.angle))
            .collect();
        // Stable: equal timestamps keep source order, so the last one wins below.
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let origin = pairs[0].0;
        let mut samples: Vec<Sample> = Vec::with_capacity(pairs.len());
        for (t, angle) in pairs {
            let time = t - origin;
            match samples.last_mut() {
                Some(last) if last.time == time => last.angle = angle,
                _ => samples.push(Sample { time, angle }),
            }
        }
        debug!(
            rows = rows.len(),
            unique = samples.len(),
            "normalized sample times"
        );
        Ok(Self { samples })
    }

    /// Build directly from already-normalized samples. The caller guarantees
    /// strictly increasing times.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Samples in increasing time order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the set holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the last sample, relative to the first.
    pub fn duration(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.time)
    }
}

/// Parse a timestamp cell.
///
/// Accepts ISO-8601 text (an optional trailing `Z` is stripped first; naive
/// values are read as UTC) or raw epoch seconds. Blank or unparseable cells
/// yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let text = text.strip_suffix('Z').unwrap_or(text);

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(epoch_seconds(&dt.naive_utc()));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(epoch_seconds(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| epoch_seconds(&naive));
    }
    text.parse::<f64>().ok().filter(|t| t.is_finite())
}

fn epoch_seconds(naive: &NaiveDateTime) -> f64 {
    let utc = naive.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9
}

/// Resolve optional timestamps into concrete ones.
///
/// - No timestamp at all: rows are indexed `0, 1, 2, ...` (1 Hz) and a
///   warning is emitted.
/// - Some missing: each missing time becomes the previous valid time plus one
///   second. Rows before the first valid time use that first valid time as
///   their baseline.
pub fn fill_missing_times(rows: &[RawSample]) -> Vec<f64> {
    let Some(first_valid) = rows.iter().find_map(|r| r.time) else {
        warn!(
            samples = rows.len(),
            "no timestamps found, assuming 1 Hz samples"
        );
        return (0..rows.len()).map(|i| i as f64).collect();
    };

    let mut last_valid = first_valid;
    rows.iter()
        .map(|row| match row.time {
            Some(t) => {
                last_valid = t;
                t
            }
            None => last_valid + 1.0,
        })
        .collect()
}

/// Read raw rows from any CSV source with a header row.
#[instrument(skip(source))]
pub fn read_raw_samples<R: Read>(source: R) -> AppResult<Vec<RawSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(InputError::NoHeader.into());
    }
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let column = |aliases: &[&str]| -> Vec<usize> {
        aliases
            .iter()
            .filter_map(|alias| lowered.iter().position(|h| h.as_str() == *alias))
            .collect()
    };
    let time_cols = column(&TIME_ALIASES);
    let angle_cols = column(&ANGLE_ALIASES);
    if angle_cols.is_empty() {
        return Err(InputError::NoAngleColumn.into());
    }

    // The first alias with a non-empty cell wins.
    let first_cell = |record: &csv::StringRecord, cols: &[usize]| -> Option<String> {
        cols.iter()
            .filter_map(|&i| record.get(i))
            .find(|cell| !cell.is_empty())
            .map(str::to_string)
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        let angle = first_cell(&record, &angle_cols)
            .and_then(|cell| cell.parse::<f64>().ok())
            .filter(|a| a.is_finite());
        let Some(angle) = angle else {
            skipped += 1;
            continue;
        };
        let time = first_cell(&record, &time_cols).and_then(|cell| parse_timestamp(&cell));
        rows.push(RawSample { time, angle });
    }

    info!(rows = rows.len(), skipped, "read wind samples");
    if rows.is_empty() {
        return Err(InputError::NoSamples.into());
    }
    Ok(rows)
}

/// Read and normalize a sample file.
pub fn load_samples<P: AsRef<Path>>(path: P) -> AppResult<SampleSet> {
    let file = std::fs::File::open(path.as_ref())?;
    let rows = read_raw_samples(file)?;
    SampleSet::from_raw(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn read(text: &str) -> AppResult<SampleSet> {
        let rows = read_raw_samples(text.as_bytes())?;
        SampleSet::from_raw(&rows)
    }

    #[test]
    fn parses_iso_and_epoch_timestamps() {
        assert_eq!(parse_timestamp("1970-01-01T00:01:00Z"), Some(60.0));
        assert_eq!(parse_timestamp("1970-01-01 00:00:02.5"), Some(2.5));
        assert_eq!(parse_timestamp("1970-01-01T01:00:00+01:00"), Some(0.0));
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400.0));
        assert_eq!(parse_timestamp("1700000000.25"), Some(1_700_000_000.25));
        assert_eq!(parse_timestamp("  "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn header_aliases_are_case_insensitive() {
        let set = read("Time,Wind_Dir\n0,10\n5,20\n").unwrap();
        assert_eq!(
            set.samples(),
            &[
                Sample { time: 0.0, angle: 10.0 },
                Sample { time: 5.0, angle: 20.0 }
            ]
        );
    }

    #[test]
    fn missing_angle_column_is_an_input_error() {
        let err = read("timestamp,speed\n0,3\n").unwrap_err();
        assert_eq!(err.as_input(), Some(&InputError::NoAngleColumn));
    }

    #[test]
    fn empty_source_has_no_header() {
        let err = read("").unwrap_err();
        assert_eq!(err.as_input(), Some(&InputError::NoHeader));
    }

    #[test]
    fn unparseable_angles_are_skipped() {
        let set = read("timestamp,wind_dir_deg\n0,10\n1,north\n2,\n3,30\n").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.samples()[1], Sample { time: 3.0, angle: 30.0 });
    }

    #[test]
    fn no_usable_angle_rows_is_an_input_error() {
        let err = read("timestamp,wind_dir_deg\n0,x\n").unwrap_err();
        assert_eq!(err.as_input(), Some(&InputError::NoSamples));
    }

    #[test]
    fn sorts_shifts_and_keeps_last_duplicate() {
        let set = read("timestamp,wind_dir_deg\n110,3\n100,1\n105,2\n105,9\n").unwrap();
        let times: Vec<f64> = set.samples().iter().map(|s| s.time).collect();
        let angles: Vec<f64> = set.samples().iter().map(|s| s.angle).collect();
        assert_eq!(times, vec![0.0, 5.0, 10.0]);
        assert_eq!(angles, vec![1.0, 9.0, 3.0]);
    }

    #[test]
    fn missing_timestamps_follow_previous_valid() {
        let rows = [
            RawSample { time: None, angle: 1.0 },
            RawSample { time: Some(10.0), angle: 2.0 },
            RawSample { time: None, angle: 3.0 },
            RawSample { time: Some(20.0), angle: 4.0 },
        ];
        assert_eq!(fill_missing_times(&rows), vec![11.0, 10.0, 11.0, 20.0]);
    }

    #[test]
    #[traced_test]
    fn no_timestamps_falls_back_to_one_hertz() {
        let set = read("wind_dir_deg\n10\n11\n12\n").unwrap();
        assert!(logs_contain("no timestamps found, assuming 1 Hz samples"));
        let times: Vec<f64> = set.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        assert_eq!(set.duration(), 2.0);
    }
}
