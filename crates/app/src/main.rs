//! linksim CLI
//!
//! Simulate packet reception over a timeline of Markov channel models.
//!
//! # Example
//!
//! ```bash
//! # Write a sample catalog and list it
//! linksim --models-dir ./Models --generate-models 5 --list-models
//!
//! # Deterministic two-phase run
//! linksim --seed 42 -i "Generated 01@1000" -i "Generated 02@00:00:02:000"
//!
//! # Export the catalog as CSV
//! linksim --export-csv "Markov models.csv"
//! ```

mod config;
mod model_gen;
mod report;

use clap::Parser;
use config::{Args, Config};
use linksim_core::simulator::{MarkovSimulator, SimulatorConfig};
use linksim_core::stats::StatisticalSummarizer;
use linksim_core::{ModelCatalog, Timeline};
use report::{Report, ReportOptions};
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,linksim=info,linksim_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_args(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    if !config.has_work() {
        eprintln!("nothing to do: pass --interval, --list-models, --export-csv or --generate-models (see --help)");
        std::process::exit(2);
    }

    if config.print_config {
        config.print();
    }

    if let Err(e) = run(&config) {
        error!(error = %e, "Run failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    if let Some(count) = config.generate_models {
        let paths = model_gen::write_sample_catalog(&config.models_dir, config.seed, count)?;
        info!(count = paths.len(), dir = %config.models_dir.display(), "Generated sample models");
    }

    let catalog = ModelCatalog::load(&config.models_dir)?;

    if config.list_models {
        report::print_catalog(&catalog);
    }

    if let Some(path) = &config.export_csv {
        catalog.export_csv_file(path)?;
        if !config.json {
            println!("Models exported to {}", path.display());
        }
    }

    if config.intervals.is_empty() {
        return Ok(());
    }

    let timeline = build_timeline(config, &catalog)?;

    let sim_config = SimulatorConfig::seeded(config.seed).with_max_steps(config.max_steps);
    let mut simulator = MarkovSimulator::new(sim_config);
    let result = simulator.run(&timeline)?;

    let summary = StatisticalSummarizer::with_payload_bytes(config.payload_bytes).summarize(&result);
    let options = ReportOptions::from_config(config);

    if config.json {
        println!("{}", Report::new(config.seed, &result, &summary, options).to_json()?);
    } else {
        report::print_summary(config.seed, &result, &summary, options);
    }

    Ok(())
}

/// Resolve requested intervals against the catalog, in order.
fn build_timeline(config: &Config, catalog: &ModelCatalog) -> Result<Timeline, Box<dyn Error>> {
    let mut timeline = Timeline::new();

    for spec in &config.intervals {
        let model = catalog.find(&spec.title).ok_or_else(|| {
            let known: Vec<&str> = catalog.models().map(|m| m.title()).collect();
            format!("unknown model {:?} (available: {})", spec.title, known.join(", "))
        })?;
        let interval = timeline.push(model, spec.duration_ms)?;
        info!(
            model = %spec.title,
            start_time = interval.start_time(),
            duration_ms = spec.duration_ms,
            "Interval added"
        );
    }

    Ok(timeline)
}
