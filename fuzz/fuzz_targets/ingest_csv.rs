//! Fuzz target for CSV ingest.
//!
//! Arbitrary bytes must either produce a sample set or an error, never a
//! panic. Successful sets are checked for their ordering invariant.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wind_fft::data::ingest::{read_raw_samples, SampleSet};

fuzz_target!(|data: &[u8]| {
    let Ok(rows) = read_raw_samples(data) else {
        return;
    };
    let Ok(set) = SampleSet::from_raw(&rows) else {
        return;
    };

    let samples = set.samples();
    assert!(!samples.is_empty());
    assert_eq!(samples[0].time, 0.0, "time origin must be the earliest sample");
    for pair in samples.windows(2) {
        assert!(pair[0].time < pair[1].time, "times must strictly increase");
    }
});
