use super::{AverageReport, Formatter, iso8601_timestamp};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, report: &AverageReport) -> String {
        format!(
            "{},{:.3},{:.4},{},{}",
            iso8601_timestamp(),
            report.elapsed.as_secs_f64(),
            report.average,
            report.retained,
            report.updates
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,elapsed_s,average,retained,updates")
    }
}
