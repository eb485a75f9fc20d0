use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use timewindow::RunConfig;
use timewindow::config::WindowDuration;
use timewindow::load::LoadDriver;
use timewindow::output::{OutputFormat, create_formatter};

#[derive(Parser, Debug)]
#[command(name = "timewindow")]
#[command(about = "Drive a sliding time-window average from concurrent producers", long_about = None)]
struct Args {
    /// TOML configuration file (command line flags override it)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Window length (e.g., "5s", "250ms", "750us")
    #[arg(short = 'w', long)]
    window: Option<WindowDuration>,

    /// Number of producer threads
    #[arg(short = 'p', long)]
    producers: Option<usize>,

    /// Updates issued by each producer
    #[arg(short = 'u', long)]
    updates: Option<usize>,

    /// Pause between updates of one producer in microseconds
    #[arg(long)]
    interval_us: Option<u64>,

    /// Report rate in Hz
    #[arg(short = 'r', long)]
    rate: Option<f32>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the run summary as JSON when done
    #[arg(long)]
    summary_json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;
    let driver = LoadDriver::new(&config).context("Invalid configuration")?;

    let formatter = create_formatter(config.report.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let summary = driver
        .run(|report| println!("{}", formatter.format(report)))
        .context("Load run failed")?;

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if config.report.format == OutputFormat::Text {
        println!();
        println!(
            "{} updates, {} reports, final average {:.3} over {} samples",
            summary.updates, summary.reports, summary.final_average, summary.retained
        );
        if let Some(stats) = summary.average_stats {
            println!(
                "Reported average: mean {:.3}, std dev {:.3}, min {:.3}, max {:.3}",
                stats.mean, stats.std_dev, stats.min, stats.max
            );
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<RunConfig> {
    let mut config = match args.config {
        Some(ref path) => RunConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(window) = args.window {
        config.window.duration = window;
    }
    if let Some(producers) = args.producers {
        config.load.producers = producers;
    }
    if let Some(updates) = args.updates {
        config.load.updates_per_producer = updates;
    }
    if let Some(interval_us) = args.interval_us {
        config.load.update_interval_us = interval_us;
    }
    if let Some(rate) = args.rate {
        config.report.output_rate_hz = rate;
    }
    if let Some(format) = args.format {
        config.report.format = format;
    }

    log::info!(
        "Window {}, {} producers x {} updates",
        config.window.duration,
        config.load.producers,
        config.load.updates_per_producer
    );

    Ok(config)
}
