//! Custom error types for the crate.
//!
//! `WindError` is the primary error type. It consolidates every failure the
//! library can report, from I/O and configuration problems to unusable input
//! data. Using `#[from]`, it can be created from the underlying error types so
//! the `?` operator works throughout the pipeline.
//!
//! ## Error Hierarchy
//!
//! - **`Input`**: the source data cannot support an analysis (no header row,
//!   no wind-direction column, fewer than two usable samples). These are fatal
//!   and abort the run before resampling. See [`InputError`].
//! - **`Config`**: wraps `figment` errors raised while parsing layered
//!   configuration (TOML file, environment variables).
//! - **`Configuration`**: semantic errors in a configuration that parsed
//!   correctly, caught by `Settings::validate`.
//! - **`Io`**, **`Csv`**, **`Json`**: reading the sample file or writing reports.
//!
//! Numeric degeneracy (non-positive `dt` or `tau`, non-finite thresholds) has
//! no variant here: those cases fall back to identity or zero results inside
//! the analysis stages.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, WindError>;

/// Errors reported by the library.
#[derive(Error, Debug)]
pub enum WindError {
    /// The input data cannot support an analysis
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but is invalid
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV or CSV write failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON report serialization failure
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Preconditions on the input data that make a run impossible.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// The source has no header row
    #[error("CSV has no headers")]
    NoHeader,

    /// No header matches a wind-direction alias
    #[error("no wind direction column found (expected one of: wind_dir_deg, wind_dir)")]
    NoAngleColumn,

    /// No row has a parseable direction
    #[error("no wind_dir_deg samples found")]
    NoSamples,

    /// Fewer than two samples survived ingest
    #[error("need at least two samples for spectral analysis, found {found}")]
    TooFewSamples {
        /// Samples available
        found: usize,
    },

    /// Nothing in the spectrum at or above the period cutoff
    #[error("no periods >= {min_period_sec} seconds to plot")]
    NoSpectralContent {
        /// Period cutoff, seconds
        min_period_sec: f64,
    },
}

impl WindError {
    /// Returns the input precondition that failed, if this is an input error.
    pub fn as_input(&self) -> Option<&InputError> {
        match self {
            WindError::Input(err) => Some(err),
            _ => None,
        }
    }
}
