use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick};
use rolling_stats::Stats;
use serde::Serialize;

use crate::config::{LoadConfig, RunConfig};
use crate::error::Result;
use crate::output::AverageReport;
use crate::window::SlidingWindowAverage;

#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

/// Outcome of a [`LoadDriver::run`]
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Updates issued by all producers
    pub updates: u64,
    /// Reports emitted, the final one included
    pub reports: usize,
    pub final_average: f64,
    /// Samples held by the window after the last update
    pub retained: usize,
    /// Statistics over every reported average
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_stats: Option<StatsSummary>,
}

/// Drives a shared sliding window average from several producer threads
/// while polling it at a fixed rate
pub struct LoadDriver {
    average: Arc<SlidingWindowAverage<f64>>,
    load: LoadConfig,
    report_interval: Duration,
}

impl LoadDriver {
    pub fn new(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let average = SlidingWindowAverage::with_default(
            config.window.duration.as_duration(),
            config.window.empty_default,
        )?;

        Ok(Self {
            average: Arc::new(average),
            load: config.load.clone(),
            report_interval: config.report.interval()?,
        })
    }

    /// The window shared with the producers
    pub fn average(&self) -> &Arc<SlidingWindowAverage<f64>> {
        &self.average
    }

    /// Run all producers to completion, reporting the average along the way
    pub fn run<F>(&self, mut on_report: F) -> Result<RunSummary>
    where
        F: FnMut(&AverageReport),
    {
        let start = Instant::now();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<u64>(self.load.producers);

        log::info!(
            "Starting {} producers, {} updates each",
            self.load.producers,
            self.load.updates_per_producer
        );

        let handles: Vec<_> = (0..self.load.producers)
            .map(|producer| {
                let average = Arc::clone(&self.average);
                let load = self.load.clone();
                let done_tx = done_tx.clone();
                thread::spawn(move || -> Result<()> {
                    let issued = produce(&average, &load, producer)?;
                    let _ = done_tx.send(issued);
                    Ok(())
                })
            })
            .collect();
        drop(done_tx);

        let ticker = tick(self.report_interval);
        let mut stats: Stats<f64> = Stats::new();
        let mut reports = 0;
        let mut updates = 0u64;
        let mut finished = 0;

        let mut polled = Ok(());
        while finished < self.load.producers {
            select! {
                recv(done_rx) -> msg => match msg {
                    Ok(issued) => {
                        updates += issued;
                        finished += 1;
                        log::debug!("Producer finished ({}/{})", finished, self.load.producers);
                    }
                    // A producer failed before reporting; join below surfaces why
                    Err(_) => break,
                },
                recv(ticker) -> _ => match self.poll(start, updates) {
                    Ok(report) => {
                        stats.update(report.average);
                        reports += 1;
                        on_report(&report);
                    }
                    Err(e) => {
                        polled = Err(e);
                        break;
                    }
                },
            }
        }

        // Producers are always joined; their failure is the root cause of a failed poll
        join_producers(handles).and(polled)?;

        let report = self.poll(start, updates)?;
        stats.update(report.average);
        reports += 1;
        on_report(&report);

        log::info!(
            "Finished {} updates in {:.3}s",
            updates,
            start.elapsed().as_secs_f64()
        );

        Ok(RunSummary {
            updates,
            reports,
            final_average: report.average,
            retained: report.retained,
            average_stats: StatsSummary::from_stats(&stats),
        })
    }

    fn poll(&self, start: Instant, updates: u64) -> Result<AverageReport> {
        Ok(AverageReport {
            elapsed: start.elapsed(),
            average: self.average.get()?,
            retained: self.average.len()?,
            updates,
        })
    }
}

fn join_producers(handles: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    let mut first_error = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!("Producer failed: {}", e);
                first_error.get_or_insert(e);
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn produce(average: &SlidingWindowAverage<f64>, load: &LoadConfig, producer: usize) -> Result<u64> {
    let interval = Duration::from_micros(load.update_interval_us);
    for i in 0..load.updates_per_producer {
        average.update(sample_value(load, producer, i))?;
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    Ok(load.updates_per_producer as u64)
}

/// Deterministic value within `base_value ± spread`
pub fn sample_value(load: &LoadConfig, producer: usize, index: usize) -> f64 {
    let phase = (producer * 31 + index * 17) % 101;
    load.base_value + load.spread * (phase as f64 / 50.0 - 1.0)
}
