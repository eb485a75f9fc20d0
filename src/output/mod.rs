mod csv;
mod json;
mod text;

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One poll of a sliding window average
#[derive(Debug, Clone)]
pub struct AverageReport {
    /// Time since the run started
    pub elapsed: Duration,
    pub average: f64,
    /// Samples currently held by the window (stale ones included)
    pub retained: usize,
    /// Updates issued by all producers so far
    pub updates: u64,
}

pub trait Formatter: Send {
    fn format(&self, report: &AverageReport) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
