//! Rendering of simulation summaries.
//!
//! Two outputs are supported:
//! - A human-readable text summary on stdout
//! - A JSON document carrying the raw samples and every derived series, for
//!   plotting tools
//!
//! Both honor the reception/throughput toggles of the run configuration.

use crate::config::Config;
use linksim_core::simulator::{Sample, SimulationResult};
use linksim_core::stats::{Boundary, IntervalStats, ReceptionPoint, Summary, ThroughputPoint};
use linksim_core::ModelCatalog;
use serde::Serialize;

/// Which sections of a report to include.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub reception: bool,
    pub throughput: bool,
}

impl ReportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reception: config.show_reception,
            throughput: config.show_throughput,
        }
    }
}

/// JSON document for one run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub seed: u64,
    pub total_samples: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub intervals: &'a [IntervalStats],
    pub boundaries: &'a [Boundary],
    pub samples: Vec<&'a Sample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reception: Option<&'a [ReceptionPoint]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<&'a [ThroughputPoint]>,
}

impl<'a> Report<'a> {
    pub fn new(
        seed: u64,
        result: &'a SimulationResult,
        summary: &'a Summary,
        options: ReportOptions,
    ) -> Self {
        let stats = result.stats();
        Self {
            seed,
            total_samples: stats.steps,
            successes: stats.successes,
            success_rate: stats.success_rate(),
            intervals: &summary.intervals,
            boundaries: &summary.boundaries,
            samples: result.samples().collect(),
            reception: options.reception.then_some(summary.reception.as_slice()),
            throughput: options.throughput.then_some(summary.throughput.as_slice()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Print the catalog contents.
pub fn print_catalog(catalog: &ModelCatalog) {
    println!("=== Models ({}) ===", catalog.len());
    for entry in catalog.entries() {
        let model = &entry.model;
        println!("{}", model);
        if !model.description().is_empty() {
            println!("    {}", model.description());
        }
        if let Some(pi0) = model.stationary_success_probability() {
            println!("    stationary success probability: {:.3}", pi0);
        }
    }
    println!();
}

/// Print a human-readable summary to stdout.
pub fn print_summary(seed: u64, result: &SimulationResult, summary: &Summary, options: ReportOptions) {
    let stats = result.stats();

    println!("\n=== Simulation Summary ===");
    println!("Seed: {}", seed);
    println!(
        "Samples: {} ({} received, {} lost)",
        stats.steps,
        stats.successes,
        stats.failures()
    );
    println!();

    println!("=== Intervals ===");
    for interval in &summary.intervals {
        let rate = interval
            .success_rate()
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.2}%", r * 100.0));
        println!(
            "{:>10} ms  {:<24} {:>8} samples  {:>8}",
            interval.start_time_ms, interval.title, interval.samples, rate
        );
    }
    println!();

    if options.reception {
        println!("=== Reception ===");
        match summary.final_probability() {
            Some(point) => {
                println!("Success probability: {:.4}", point.probability);
                println!(
                    "95% CI: [{:.4}, {:.4}] (±{:.4})",
                    point.lower(),
                    point.upper(),
                    point.ci_half_width
                );
            }
            None => println!("No samples"),
        }
        println!();
    }

    if options.throughput {
        println!("=== Throughput ===");
        match summary.final_mean_throughput() {
            Some(mean) => {
                let peak = summary
                    .throughput
                    .iter()
                    .map(|p| p.instantaneous)
                    .fold(0.0, f64::max);
                println!("Average throughput: {:.2} B/s", mean);
                println!("Peak slot throughput: {:.2} B/s", peak);
            }
            None => println!("No samples"),
        }
        println!();
    }
}
