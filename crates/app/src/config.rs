//! Configuration for the linksim application.
//!
//! Handles parsing command-line arguments and resolving them into a run
//! configuration. The seed is always resolved (random when not given) and
//! printed, so every run can be reproduced.

use clap::Parser;
use linksim_core::stats::DEFAULT_PAYLOAD_BYTES;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default ceiling on Markov steps per run.
pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

/// Longest interval accepted on the command line (9 hours).
pub const MAX_INTERVAL_MS: u64 = 9 * 60 * 60 * 1000;

/// linksim: Markov chain simulation of wireless packet reception
///
/// Builds a timeline from channel models in a catalog directory, simulates
/// it slot by slot and reports reception probability and throughput.
#[derive(Parser, Debug)]
#[command(name = "linksim")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding channel model records
    #[arg(short = 'm', long, default_value = "./Models")]
    pub models_dir: PathBuf,

    /// Timeline interval as TITLE@DURATION; DURATION is milliseconds or hh:mm:ss:zzz.
    /// Repeat to append further intervals.
    #[arg(short = 'i', long = "interval", value_name = "TITLE@DURATION")]
    pub intervals: Vec<IntervalSpec>,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Refuse timelines that need more Markov steps than this
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: u64,

    /// Payload size per received slot, used for throughput
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_BYTES)]
    pub payload_bytes: f64,

    /// Write the catalog as CSV to this path
    #[arg(long, value_name = "PATH")]
    pub export_csv: Option<PathBuf>,

    /// Print the models found in the catalog
    #[arg(long)]
    pub list_models: bool,

    /// Write N seeded sample models into the catalog directory first
    #[arg(long, value_name = "N")]
    pub generate_models: Option<usize>,

    /// Skip the reception probability report
    #[arg(long)]
    pub no_reception: bool,

    /// Skip the throughput report
    #[arg(long)]
    pub no_throughput: bool,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,
}

/// One `TITLE@DURATION` interval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSpec {
    pub title: String,
    pub duration_ms: u64,
}

impl FromStr for IntervalSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (title, duration) = s
            .rsplit_once('@')
            .ok_or_else(|| format!("expected TITLE@DURATION, got {s:?}"))?;

        let title = title.trim();
        if title.is_empty() {
            return Err(format!("missing model title in {s:?}"));
        }

        let duration_ms = parse_duration_ms(duration.trim())?;
        if duration_ms == 0 || duration_ms > MAX_INTERVAL_MS {
            return Err(format!(
                "duration must be between 1 ms and 09:00:00:000, got {duration:?}"
            ));
        }

        Ok(Self {
            title: title.to_string(),
            duration_ms,
        })
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.title, self.duration_ms)
    }
}

/// Parse plain milliseconds or `hh:mm:ss:zzz`.
fn parse_duration_ms(s: &str) -> Result<u64, String> {
    if !s.contains(':') {
        return s.parse().map_err(|_| format!("invalid duration {s:?}"));
    }

    let parts: Vec<&str> = s.split(':').collect();
    let [h, m, sec, ms] = parts[..] else {
        return Err(format!("expected hh:mm:ss:zzz, got {s:?}"));
    };

    let field = |value: &str, max: u64| -> Result<u64, String> {
        value
            .parse::<u64>()
            .ok()
            .filter(|v| *v <= max)
            .ok_or_else(|| format!("invalid duration {s:?}"))
    };

    let h = field(h, 23)?;
    let m = field(m, 59)?;
    let sec = field(sec, 59)?;
    let ms = field(ms, 999)?;
    Ok(((h * 60 + m) * 60 + sec) * 1000 + ms)
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Catalog ===
    /// Directory holding model records
    pub models_dir: PathBuf,

    /// Sample models to generate before loading
    pub generate_models: Option<usize>,

    /// CSV export destination
    pub export_csv: Option<PathBuf>,

    /// Whether to list catalog contents
    pub list_models: bool,

    // === Simulation ===
    /// Requested timeline, in order
    pub intervals: Vec<IntervalSpec>,

    /// Resolved random seed
    pub seed: u64,

    /// Step ceiling per run
    pub max_steps: u64,

    /// Payload bytes per received slot
    pub payload_bytes: f64,

    // === Output ===
    pub show_reception: bool,
    pub show_throughput: bool,
    pub json: bool,
    pub print_config: bool,
}

impl Config {
    /// Resolve parsed arguments into a configuration.
    ///
    /// If no seed is given, a random one is drawn so the run can still be
    /// replayed from the printed value.
    pub fn from_args(args: Args) -> Result<Self, String> {
        if !args.payload_bytes.is_finite() || args.payload_bytes <= 0.0 {
            return Err(format!("payload bytes must be positive, got {}", args.payload_bytes));
        }
        if args.max_steps == 0 {
            return Err("max steps must be positive".to_string());
        }

        let seed = args.seed.unwrap_or_else(rand::random);

        Ok(Self {
            models_dir: args.models_dir,
            generate_models: args.generate_models,
            export_csv: args.export_csv,
            list_models: args.list_models,
            intervals: args.intervals,
            seed,
            max_steps: args.max_steps,
            payload_bytes: args.payload_bytes,
            show_reception: !args.no_reception,
            show_throughput: !args.no_throughput,
            json: args.json,
            print_config: args.print_config,
        })
    }

    /// Whether the configuration asks for anything at all.
    pub fn has_work(&self) -> bool {
        self.generate_models.is_some()
            || self.export_csv.is_some()
            || self.list_models
            || !self.intervals.is_empty()
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Models dir: {}", self.models_dir.display());
        if let Some(n) = self.generate_models {
            println!("Generate models: {n}");
        }
        if let Some(path) = &self.export_csv {
            println!("CSV export: {}", path.display());
        }
        println!();
        println!("=== Simulation ===");
        println!("Seed: {}", self.seed);
        println!("Max steps: {}", self.max_steps);
        println!("Payload: {} bytes", self.payload_bytes);
        for (i, interval) in self.intervals.iter().enumerate() {
            println!("Interval {}: {} for {} ms", i, interval.title, interval.duration_ms);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let args = Args::try_parse_from(std::iter::once("linksim").chain(args.iter().copied()))
            .expect("arguments should parse");
        Config::from_args(args).expect("config should resolve")
    }

    #[test]
    fn test_interval_spec_millis() {
        let spec: IntervalSpec = "Urban LoS@1500".parse().unwrap();
        assert_eq!(spec.title, "Urban LoS");
        assert_eq!(spec.duration_ms, 1500);
        assert_eq!(spec.to_string(), "Urban LoS@1500");
    }

    #[test]
    fn test_interval_spec_clock_format() {
        let spec: IntervalSpec = "Rural@00:01:02:250".parse().unwrap();
        assert_eq!(spec.duration_ms, 62_250);

        let spec: IntervalSpec = "A@B@09:00:00:000".parse().unwrap();
        assert_eq!(spec.title, "A@B");
        assert_eq!(spec.duration_ms, MAX_INTERVAL_MS);
    }

    #[test]
    fn test_interval_spec_errors() {
        assert!("NoSeparator".parse::<IntervalSpec>().is_err());
        assert!("@100".parse::<IntervalSpec>().is_err());
        assert!("A@0".parse::<IntervalSpec>().is_err());
        assert!("A@-5".parse::<IntervalSpec>().is_err());
        assert!("A@09:00:00:001".parse::<IntervalSpec>().is_err());
        assert!("A@00:61:00:000".parse::<IntervalSpec>().is_err());
        assert!("A@00:01:00".parse::<IntervalSpec>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.models_dir, PathBuf::from("./Models"));
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.payload_bytes, DEFAULT_PAYLOAD_BYTES);
        assert!(config.show_reception && config.show_throughput);
        assert!(!config.has_work());
    }

    #[test]
    fn test_full_arguments() {
        let config = parse(&[
            "--models-dir",
            "/tmp/models",
            "-i",
            "Urban@1000",
            "--interval",
            "Rural@00:00:02:000",
            "--seed",
            "42",
            "--no-throughput",
            "--json",
        ]);

        assert_eq!(config.seed, 42);
        assert_eq!(config.intervals.len(), 2);
        assert_eq!(config.intervals[1].duration_ms, 2000);
        assert!(config.show_reception);
        assert!(!config.show_throughput);
        assert!(config.json);
        assert!(config.has_work());
    }

    #[test]
    fn test_invalid_payload() {
        let args = Args::try_parse_from(["linksim", "--payload-bytes", "0"]).unwrap();
        assert!(Config::from_args(args).is_err());
    }

    #[test]
    fn test_bad_interval_rejected_by_parser() {
        assert!(Args::try_parse_from(["linksim", "-i", "Urban"]).is_err());
    }
}
