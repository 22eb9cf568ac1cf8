//! # wind_fft
//!
//! Analysis of wind-direction records: periodic oscillations, abrupt shifts
//! and how the dominant oscillation period evolves over time.
//!
//! ## Crate Structure
//!
//! - **`config`**: Layered analysis settings (defaults, TOML file, environment).
//! - **`data`**: The processing stages. `ingest` reads CSV records, `resample`
//!   puts them on a uniform grid, `filter` and `trend` prepare the signal,
//!   `fft`, `change_point` and `welch` implement the three analyses, and
//!   `storage` writes results.
//! - **`error`**: `WindError` and the fatal `InputError` conditions.
//! - **`logging`**: Tracing subscriber setup.
//! - **`pipeline`**: Runs every analysis over one shared resampled series.
//!
//! ```no_run
//! use wind_fft::{config::Settings, pipeline::WindPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(Some("wind_fft.toml"))?;
//! let report = WindPipeline::from_settings(&settings).run_file("debug_wind_data.csv")?;
//! for peak in &report.spectral.peaks {
//!     println!("{:.1} min, {:.2} deg", peak.period / 60.0, peak.amplitude);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::Settings;
pub use error::{AppResult, InputError, WindError};
pub use pipeline::{AnalysisReport, WindPipeline};
