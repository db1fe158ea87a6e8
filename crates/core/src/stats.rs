//! Streaming statistics over a simulated sample stream.
//!
//! Reduces the chronologically ordered samples of a [`SimulationResult`] to
//! the series a presentation layer plots:
//!
//! - **Reception probability**: running success ratio `p = s / n` with a
//!   normal-approximation 95% confidence half-width
//!   `ci = 1.96 * sqrt(s * (n - s)) / (n * sqrt(n))`
//! - **Throughput**: instantaneous `payload_bytes / (tx_time_ms / 1000)` for a
//!   received slot (0 otherwise) and its running arithmetic mean
//! - **Boundaries**: `(start_time, title)` of every timeline entry
//!
//! # Design
//!
//! The summarizer holds only running counters and the previous mean, so it can
//! consume samples one at a time as they are produced. Nothing is divided by
//! the attempt count until at least one sample has been observed.

use crate::model::ChannelModel;
use crate::simulator::{Sample, SimulationResult};
use serde::Serialize;

/// Payload size assumed for every transmission, in bytes.
pub const DEFAULT_PAYLOAD_BYTES: f64 = 16.0;

/// z-score of a two-sided 95% confidence interval.
pub const Z_95: f64 = 1.96;

/// Running success probability at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReceptionPoint {
    pub timestamp_ms: f64,

    /// Cumulative success ratio `s / n`
    pub probability: f64,

    /// Confidence half-width around `probability`
    pub ci_half_width: f64,
}

impl ReceptionPoint {
    pub fn lower(&self) -> f64 {
        self.probability - self.ci_half_width
    }

    pub fn upper(&self) -> f64 {
        self.probability + self.ci_half_width
    }
}

/// Throughput at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThroughputPoint {
    pub timestamp_ms: f64,

    /// Bytes per second delivered by this slot alone
    pub instantaneous: f64,

    /// Arithmetic mean of all instantaneous values so far
    pub mean: f64,
}

/// Start of a timeline entry, for annotating plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boundary {
    pub start_time_ms: u64,
    pub title: String,
}

/// Per-interval outcome counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalStats {
    pub title: String,
    pub start_time_ms: u64,
    pub duration_ms: u64,
    pub samples: u64,
    pub successes: u64,
}

impl IntervalStats {
    /// Success ratio within this interval; `None` if it produced no samples.
    pub fn success_rate(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.successes as f64 / self.samples as f64)
        }
    }
}

/// Everything derived from one simulation result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub reception: Vec<ReceptionPoint>,
    pub throughput: Vec<ThroughputPoint>,
    pub boundaries: Vec<Boundary>,
    pub intervals: Vec<IntervalStats>,
}

impl Summary {
    /// Final cumulative success probability, if any sample exists.
    pub fn final_probability(&self) -> Option<&ReceptionPoint> {
        self.reception.last()
    }

    /// Final running mean throughput, if any sample exists.
    pub fn final_mean_throughput(&self) -> Option<f64> {
        self.throughput.last().map(|p| p.mean)
    }
}

/// Online reducer for reception probability and throughput.
#[derive(Debug, Clone)]
pub struct StatisticalSummarizer {
    payload_bytes: f64,
    successes: u64,
    attempts: u64,
    mean_throughput: f64,
}

impl StatisticalSummarizer {
    pub fn new() -> Self {
        Self::with_payload_bytes(DEFAULT_PAYLOAD_BYTES)
    }

    pub fn with_payload_bytes(payload_bytes: f64) -> Self {
        Self {
            payload_bytes,
            successes: 0,
            attempts: 0,
            mean_throughput: 0.0,
        }
    }

    pub fn payload_bytes(&self) -> f64 {
        self.payload_bytes
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Current reception estimate; `None` before the first sample.
    pub fn reception(&self, timestamp_ms: f64) -> Option<ReceptionPoint> {
        if self.attempts == 0 {
            return None;
        }

        let s = self.successes as f64;
        let n = self.attempts as f64;
        Some(ReceptionPoint {
            timestamp_ms,
            probability: s / n,
            ci_half_width: Z_95 * (s * (n - s)).sqrt() / (n * n.sqrt()),
        })
    }

    /// Current running mean throughput; `None` before the first sample.
    pub fn mean_throughput(&self) -> Option<f64> {
        (self.attempts > 0).then_some(self.mean_throughput)
    }

    /// Bytes per second a successful slot of `tx_time_ms` delivers.
    pub fn slot_throughput(&self, tx_time_ms: f64) -> f64 {
        self.payload_bytes / (tx_time_ms / 1000.0)
    }

    /// Fold one sample into the running statistics.
    ///
    /// `tx_time_ms` is the slot time of the model that produced the sample.
    pub fn observe(&mut self, sample: &Sample, tx_time_ms: f64) -> (ReceptionPoint, ThroughputPoint) {
        let t = self.attempts as f64;
        let instantaneous = if sample.success {
            self.slot_throughput(tx_time_ms)
        } else {
            0.0
        };

        self.mean_throughput = if self.attempts == 0 {
            instantaneous
        } else {
            (self.mean_throughput * t + instantaneous) / (t + 1.0)
        };

        self.attempts += 1;
        if sample.success {
            self.successes += 1;
        }

        let s = self.successes as f64;
        let n = self.attempts as f64;
        let reception = ReceptionPoint {
            timestamp_ms: sample.timestamp_ms,
            probability: s / n,
            ci_half_width: Z_95 * (s * (n - s)).sqrt() / (n * n.sqrt()),
        };
        let throughput = ThroughputPoint {
            timestamp_ms: sample.timestamp_ms,
            instantaneous,
            mean: self.mean_throughput,
        };
        (reception, throughput)
    }

    /// Fold one sample produced by `model`.
    pub fn observe_from(
        &mut self,
        model: &ChannelModel,
        sample: &Sample,
    ) -> (ReceptionPoint, ThroughputPoint) {
        self.observe(sample, model.tx_time_ms())
    }

    /// Reduce a whole simulation result in one forward pass.
    ///
    /// Counters continue from whatever this summarizer has already seen.
    pub fn summarize(&mut self, result: &SimulationResult) -> Summary {
        let total = result.total_samples();
        let mut summary = Summary {
            reception: Vec::with_capacity(total),
            throughput: Vec::with_capacity(total),
            boundaries: Vec::with_capacity(result.len()),
            intervals: Vec::with_capacity(result.len()),
        };

        for entry in result.entries() {
            let model = entry.model();
            summary.boundaries.push(Boundary {
                start_time_ms: entry.interval.start_time(),
                title: model.title().to_string(),
            });

            let mut successes = 0;
            for sample in &entry.samples {
                let (reception, throughput) = self.observe_from(model, sample);
                summary.reception.push(reception);
                summary.throughput.push(throughput);
                if sample.success {
                    successes += 1;
                }
            }

            summary.intervals.push(IntervalStats {
                title: model.title().to_string(),
                start_time_ms: entry.interval.start_time(),
                duration_ms: entry.interval.duration_ms(),
                samples: entry.samples.len() as u64,
                successes,
            });
        }

        summary
    }
}

impl Default for StatisticalSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Summarize `result` with the default payload size.
pub fn summarize(result: &SimulationResult) -> Summary {
    StatisticalSummarizer::new().summarize(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{run, MarkovSimulator, SimulatorConfig};
    use crate::timeline::Timeline;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn sample(t: f64, success: bool) -> Sample {
        Sample {
            timestamp_ms: t,
            success,
        }
    }

    #[test]
    fn test_empty_guard() {
        let summarizer = StatisticalSummarizer::new();
        assert!(summarizer.reception(0.0).is_none());
        assert!(summarizer.mean_throughput().is_none());

        let summary = summarize(&SimulationResult::default());
        assert!(summary.reception.is_empty());
        assert!(summary.final_probability().is_none());
        assert!(summary.final_mean_throughput().is_none());
    }

    #[test]
    fn test_reception_formula() {
        let mut summarizer = StatisticalSummarizer::new();
        let outcomes = [true, false, true, true];
        let mut last = None;
        for (i, &ok) in outcomes.iter().enumerate() {
            last = Some(summarizer.observe(&sample(i as f64, ok), 100.0).0);
        }

        let point = last.unwrap();
        assert_eq!(point.probability, 0.75);
        let expected_ci = 1.96 * (3.0f64 * 1.0).sqrt() / (4.0 * 2.0);
        assert!((point.ci_half_width - expected_ci).abs() < 1e-12);
        assert!((point.upper() - (0.75 + expected_ci)).abs() < 1e-12);
        assert!((point.lower() - (0.75 - expected_ci)).abs() < 1e-12);
        assert_eq!(summarizer.reception(3.0), Some(point));
    }

    #[test]
    fn test_all_success_has_zero_ci() {
        let mut summarizer = StatisticalSummarizer::new();
        for i in 0..5 {
            let (r, _) = summarizer.observe(&sample(i as f64, true), 10.0);
            assert_eq!(r.probability, 1.0);
            assert_eq!(r.ci_half_width, 0.0);
        }
    }

    #[test]
    fn test_throughput_values() {
        let mut summarizer = StatisticalSummarizer::new();

        let (_, first) = summarizer.observe(&sample(0.0, true), 100.0);
        // 16 bytes every 100 ms
        assert_eq!(first.instantaneous, 160.0);
        assert_eq!(first.mean, 160.0);

        let (_, second) = summarizer.observe(&sample(100.0, false), 100.0);
        assert_eq!(second.instantaneous, 0.0);
        assert_eq!(second.mean, 80.0);

        let mut custom = StatisticalSummarizer::with_payload_bytes(50.0);
        let (_, p) = custom.observe(&sample(0.0, true), 500.0);
        assert_eq!(p.instantaneous, 100.0);
    }

    #[test]
    fn test_running_mean_matches_recomputation() {
        let mut summarizer = StatisticalSummarizer::new();
        let stream = [
            (true, 100.0),
            (false, 100.0),
            (true, 40.0),
            (true, 250.0),
            (false, 40.0),
            (true, 100.0),
        ];

        let mut values = Vec::new();
        for (i, &(ok, tx)) in stream.iter().enumerate() {
            let (_, point) = summarizer.observe(&sample(i as f64, ok), tx);
            values.push(point.instantaneous);
            let exact = values.iter().sum::<f64>() / values.len() as f64;
            assert!((point.mean - exact).abs() < 1e-9, "t = {i}");
        }
    }

    #[test]
    fn test_summary_over_simulation() {
        let fast = Arc::new(ChannelModel::new("Fast", "", 50.0, [0.9, 0.1, 0.2, 0.8]));
        let slow = Arc::new(ChannelModel::new("Slow", "", 200.0, [0.5, 0.5, 0.5, 0.5]));
        let mut timeline = Timeline::new();
        timeline.push(Arc::clone(&fast), 1000).unwrap();
        timeline.push(slow, 2000).unwrap();
        timeline.push(fast, 500).unwrap();

        let result = run(&timeline, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        let summary = summarize(&result);

        assert_eq!(summary.reception.len(), 20 + 10 + 10);
        assert_eq!(summary.throughput.len(), summary.reception.len());

        let boundaries: Vec<(u64, &str)> = summary
            .boundaries
            .iter()
            .map(|b| (b.start_time_ms, b.title.as_str()))
            .collect();
        assert_eq!(boundaries, vec![(0, "Fast"), (1000, "Slow"), (3000, "Fast")]);

        let counted: u64 = summary.intervals.iter().map(|i| i.successes).sum();
        assert_eq!(counted, result.stats().successes);

        for (point, raw) in summary.reception.iter().zip(result.samples()) {
            assert_eq!(point.timestamp_ms, raw.timestamp_ms);
            assert!((0.0..=1.0).contains(&point.probability));
            assert!(point.ci_half_width >= 0.0);
        }

        // Throughput of a received slot depends on the owning model
        for (point, (model, raw)) in summary.throughput.iter().zip(result.samples_with_model()) {
            let expected = if raw.success { 16.0 / (model.tx_time_ms() / 1000.0) } else { 0.0 };
            assert_eq!(point.instantaneous, expected);
        }
    }

    #[test]
    fn test_ci_shrinks_with_more_samples() {
        let timeline = {
            let mut t = Timeline::new();
            let model = Arc::new(ChannelModel::new("Half", "", 1.0, [0.5, 0.5, 0.5, 0.5]));
            t.push(model, 10_000).unwrap();
            t
        };
        let result = MarkovSimulator::new(SimulatorConfig::seeded(21))
            .run(&timeline)
            .unwrap();
        let summary = summarize(&result);

        let early = summary.reception[99].ci_half_width;
        let late = summary.reception[9_999].ci_half_width;
        assert!(late < early / 3.0, "early = {early}, late = {late}");
    }

    #[test]
    fn test_interval_stats() {
        let stats = IntervalStats {
            title: "X".to_string(),
            start_time_ms: 0,
            duration_ms: 10,
            samples: 0,
            successes: 0,
        };
        assert!(stats.success_rate().is_none());

        let stats = IntervalStats {
            samples: 4,
            successes: 1,
            ..stats
        };
        assert_eq!(stats.success_rate(), Some(0.25));
    }
}
