//! Signal processing stages and result storage.
pub mod change_point;
pub mod fft;
pub mod filter;
pub mod ingest;
pub mod resample;
pub mod storage;
pub mod trend;
pub mod welch;
