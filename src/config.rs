//! Layered analysis configuration using Figment.
//!
//! Configuration is assembled from, in increasing precedence:
//! 1. Built-in defaults (the reference constants of the wind analysis)
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `WIND_FFT_`, using `__` between
//!    section and field (e.g. `WIND_FFT_CHANGE__DRIFT_DEG=1.5`)
//!
//! # Example
//! ```no_run
//! use wind_fft::config::Settings;
//!
//! let settings = Settings::load(Some("wind.toml"))?;
//! println!("peak count: {}", settings.spectral.peak_count);
//! # Ok::<(), wind_fft::error::WindError>(())
//! ```

use crate::error::{AppResult, WindError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "WIND_FFT_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ingest and resampling options
    pub input: InputSettings,
    /// Full-series spectral peak extraction
    pub spectral: SpectralSettings,
    /// Page-Hinkley change detection
    pub change: ChangeSettings,
    /// Sliding-window Welch tracker
    pub welch: WelchSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Ingest and resampling options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Unwrap angle discontinuities before interpolation
    pub unwrap: bool,
}

/// Full-series spectral analysis options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralSettings {
    /// Shortest period considered a wind oscillation (seconds)
    pub min_period_sec: f64,
    /// Highest frequency kept for reconstruction (Hz)
    pub max_recon_freq_hz: f64,
    /// Number of peaks retained for reconstruction
    pub peak_count: usize,
    /// Time constant of the general smoothing filter (seconds)
    pub filter_tau_sec: f64,
}

/// Page-Hinkley change detection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSettings {
    /// Time constant of the pre-detection filter (seconds)
    pub filter_tau_sec: f64,
    /// Smallest step the detector is tuned for (degrees)
    pub step_deg: f64,
    /// Desired detection delay for a step of `step_deg` (seconds)
    pub target_delay_sec: f64,
    /// Minimum magnitude of interest (degrees)
    pub drift_deg: f64,
    /// Scale applied to the alarm threshold
    pub threshold_scale: f64,
}

/// Sliding-window Welch tracker options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchSettings {
    /// Analysis window length (seconds)
    pub window_sec: f64,
    /// Stride between windows (seconds)
    pub step_sec: f64,
    /// Welch segment length inside a window (seconds)
    pub segment_sec: f64,
}

/// Log output options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, compact, json)
    pub format: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self { unwrap: true }
    }
}

impl Default for SpectralSettings {
    fn default() -> Self {
        Self {
            min_period_sec: 60.0,
            max_recon_freq_hz: 1.0 / 60.0,
            peak_count: 2,
            filter_tau_sec: 10.0,
        }
    }
}

impl Default for ChangeSettings {
    fn default() -> Self {
        Self {
            filter_tau_sec: 5.0,
            step_deg: 4.0,
            target_delay_sec: 30.0,
            drift_deg: 2.0,
            threshold_scale: 1.0 / 3.0,
        }
    }
}

impl Default for WelchSettings {
    fn default() -> Self {
        Self {
            window_sec: 10.0 * 60.0,
            step_sec: 60.0,
            segment_sec: 8.0 * 60.0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Settings {
    /// Build the layered figment: defaults, optional TOML file, environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration.
    ///
    /// A missing TOML file is not an error; figment treats it as empty and
    /// the defaults apply. Degenerate numbers are not reported here; call
    /// [`Settings::warn_degenerate`] once logging is up.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> AppResult<Self> {
        let path: Option<&Path> = path.as_ref().map(|p| p.as_ref());
        let settings: Settings = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level.as_str()) {
            return Err(WindError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        let format = self.logging.format.to_lowercase();
        if !valid_formats.contains(&format.as_str()) {
            return Err(WindError::Configuration(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }

    /// Report numeric settings that will make a stage fall back to its
    /// identity or empty result. Returns the number of warnings emitted.
    pub fn warn_degenerate(&self) -> usize {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let mut warnings = 0;
        if !positive(self.spectral.filter_tau_sec) {
            warn!(
                tau = self.spectral.filter_tau_sec,
                "spectral filter time constant is not positive; smoothing disabled"
            );
            warnings += 1;
        }
        if !positive(self.change.filter_tau_sec) {
            warn!(
                tau = self.change.filter_tau_sec,
                "change filter time constant is not positive; smoothing disabled"
            );
            warnings += 1;
        }
        let change = &self.change;
        if !(change.drift_deg.is_finite() && change.drift_deg >= 0.0) {
            warn!(
                drift = change.drift_deg,
                "change drift is negative or not finite; using 0"
            );
            warnings += 1;
        }
        if !(change.step_deg - change.drift_deg).is_finite() || change.step_deg <= change.drift_deg {
            warn!(
                step = change.step_deg,
                drift = change.drift_deg,
                "step does not exceed drift; change threshold collapses to zero"
            );
            warnings += 1;
        }
        if !positive(change.target_delay_sec) {
            warn!(
                delay = change.target_delay_sec,
                "change target delay is not positive; change threshold collapses to zero"
            );
            warnings += 1;
        }
        if !positive(change.threshold_scale) {
            warn!(
                scale = change.threshold_scale,
                "change threshold scale is not positive; change threshold collapses to zero"
            );
            warnings += 1;
        }
        if self.spectral.peak_count == 0 {
            warn!("peak_count is 0; reconstruction will be the trend only");
            warnings += 1;
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn defaults_match_reference_constants() {
        let settings = Settings::default();
        assert!(settings.input.unwrap);
        assert_eq!(settings.spectral.min_period_sec, 60.0);
        assert_eq!(settings.spectral.max_recon_freq_hz, 1.0 / 60.0);
        assert_eq!(settings.spectral.peak_count, 2);
        assert_eq!(settings.change.drift_deg, 2.0);
        assert_eq!(settings.welch.segment_sec, 480.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(matches!(
            settings.validate(),
            Err(WindError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_log_format() {
        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn defaults_are_not_degenerate() {
        assert_eq!(Settings::default().warn_degenerate(), 0);
    }

    #[test]
    #[traced_test]
    fn degenerate_numbers_are_logged() {
        let mut settings = Settings::default();
        settings.spectral.filter_tau_sec = -1.0;
        settings.change.step_deg = 0.0;
        assert_eq!(settings.warn_degenerate(), 2);
        assert!(logs_contain("smoothing disabled"));
        assert!(logs_contain("step does not exceed drift"));
    }

    #[test]
    #[traced_test]
    fn negative_change_constants_are_logged() {
        let mut settings = Settings::default();
        settings.change.target_delay_sec = -30.0;
        settings.change.threshold_scale = -1.0;
        settings.change.drift_deg = -1.0;
        assert_eq!(settings.warn_degenerate(), 3);
        assert!(logs_contain("target delay is not positive"));
        assert!(logs_contain("threshold scale is not positive"));
        assert!(logs_contain("drift is negative"));
    }

    #[test]
    fn degenerate_numbers_still_validate() {
        let mut settings = Settings::default();
        settings.spectral.filter_tau_sec = -1.0;
        settings.change.step_deg = 0.0;
        assert!(settings.validate().is_ok());
    }
}
