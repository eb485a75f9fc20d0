//! Configuration for the load driver and CLI.
//!
//! Every section has defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! [window]
//! duration = "250ms"
//!
//! [load]
//! producers = 8
//!
//! [report]
//! format = "json"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, WindowError};
use crate::output::OutputFormat;

/// Length of a trailing time window
///
/// # Parsing formats
/// - `5s` - seconds
/// - `250ms` - milliseconds
/// - `750us` or `750μs` - microseconds
/// - `250` - milliseconds (no suffix)
///
/// # Example
/// ```
/// use std::time::Duration;
/// use timewindow::config::WindowDuration;
///
/// let window: WindowDuration = "250ms".parse().unwrap();
/// assert_eq!(window.as_duration(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct WindowDuration(Duration);

impl WindowDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for WindowDuration {
    fn default() -> Self {
        Self(Duration::from_secs(5))
    }
}

impl fmt::Display for WindowDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let us = self.0.as_micros();
        if us % 1_000_000 == 0 {
            write!(f, "{}s", us / 1_000_000)
        } else if us % 1_000 == 0 {
            write!(f, "{}ms", us / 1_000)
        } else {
            write!(f, "{}us", us)
        }
    }
}

impl FromStr for WindowDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        // "ms" must be checked before "s"
        let (num, micros_per_unit) = if let Some(num) = s.strip_suffix("ms") {
            (num, 1_000)
        } else if let Some(num) = s.strip_suffix("us").or_else(|| s.strip_suffix("μs")) {
            (num, 1)
        } else if let Some(num) = s.strip_suffix('s') {
            (num, 1_000_000)
        } else {
            (s, 1_000)
        };

        let count: u64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid window duration: {}", s))?;
        if count == 0 {
            return Err("window duration must be positive".to_string());
        }
        let micros = count
            .checked_mul(micros_per_unit)
            .ok_or_else(|| format!("window duration too large: {}", s))?;
        Ok(Self(Duration::from_micros(micros)))
    }
}

impl TryFrom<String> for WindowDuration {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Top-level run configuration
///
/// Use `RunConfig::default()` for sensible defaults or load overrides from
/// a TOML file with [`RunConfig::from_toml_file`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Sliding window parameters
    pub window: WindowConfig,
    /// Synthetic producer parameters
    pub load: LoadConfig,
    /// Report cadence and format
    pub report: ReportConfig,
}

/// Sliding window parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Trailing window length
    pub duration: WindowDuration,
    /// Value reported while the window holds no samples
    pub empty_default: f64,
}

/// Synthetic producer parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Number of concurrent producer threads
    pub producers: usize,
    /// Updates issued by each producer
    pub updates_per_producer: usize,
    /// Pause between consecutive updates of one producer in microseconds
    pub update_interval_us: u64,
    /// Centre of the generated values
    pub base_value: f64,
    /// Generated values fall within `base_value ± spread`
    pub spread: f64,
}

/// Report cadence and format
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// How often the average is polled and reported, in Hz
    pub output_rate_hz: f32,
    pub format: OutputFormat,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration: WindowDuration::default(),
            empty_default: 0.0,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            updates_per_producer: 1000,
            update_interval_us: 1000,
            base_value: 100.0,
            spread: 25.0,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_rate_hz: 10.0,
            format: OutputFormat::Text,
        }
    }
}

impl ReportConfig {
    /// Time between two reports
    ///
    /// # Errors
    /// `Config` if the rate is not positive or its period is not a
    /// representable, non-zero `Duration`.
    pub fn interval(&self) -> Result<Duration> {
        let rate = self.output_rate_hz;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(WindowError::Config(format!(
                "output rate must be positive, got {}",
                rate
            )));
        }
        let interval = Duration::try_from_secs_f32(1.0 / rate)
            .map_err(|_| WindowError::Config(format!("output rate too low: {}hz", rate)))?;
        if interval.is_zero() {
            return Err(WindowError::Config(format!(
                "output rate too high: {}hz",
                rate
            )));
        }
        Ok(interval)
    }
}

impl RunConfig {
    /// Parse and validate a TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| WindowError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WindowError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.load.producers == 0 {
            return Err(WindowError::Config(
                "at least one producer is required".into(),
            ));
        }
        self.report.interval()?;
        if !self.load.spread.is_finite() || self.load.spread < 0.0 {
            return Err(WindowError::Config(format!(
                "spread must be non-negative, got {}",
                self.load.spread
            )));
        }
        Ok(())
    }
}
