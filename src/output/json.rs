use super::{AverageReport, Formatter, iso8601_timestamp};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &AverageReport) -> String {
        // Non-finite averages have no JSON number form
        let average = if report.average.is_finite() {
            format!("{:.4}", report.average)
        } else {
            "null".to_string()
        };
        format!(
            r#"{{"ts":"{}","elapsed_s":{:.3},"average":{},"retained":{},"updates":{}}}"#,
            iso8601_timestamp(),
            report.elapsed.as_secs_f64(),
            average,
            report.retained,
            report.updates
        )
    }
}
