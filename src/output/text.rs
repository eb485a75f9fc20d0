use super::{AverageReport, Formatter};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &AverageReport) -> String {
        if self.verbose {
            format!(
                "[{:>8.3}s] Average: {:>9.3} over {} samples, updates: {}",
                report.elapsed.as_secs_f64(),
                report.average,
                report.retained,
                report.updates
            )
        } else {
            format!(
                "Average: {:>9.3} over {} samples",
                report.average, report.retained
            )
        }
    }
}
