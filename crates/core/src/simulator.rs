//! Markov chain link simulator.
//!
//! Drives a two-state chain through every interval of a timeline and records
//! one success/failure sample per transmission slot.
//!
//! # Algorithm
//!
//! For each interval, in timeline order:
//!
//! 1. `steps = floor(duration_ms / tx_time_ms)`; a partial final slot is dropped.
//! 2. At step `k`, emit a sample at `start_time + k * tx_time_ms` whose outcome
//!    is `state == 0`.
//! 3. Draw `u ~ U[0, 1)` and pick the next state from the current state's row
//!    `[p_i0, p_i1]`, treated as categorical weights.
//!
//! The chain starts in state 0 and its state carries over from one interval
//! to the next.
//!
//! # Determinism
//!
//! All randomness comes from a ChaCha8 RNG. Given the same seed and timeline,
//! outputs are bit-identical.

use crate::error::{ConfigurationError, Result};
use crate::model::{ChainState, ChannelModel};
use crate::timeline::{SimulationInterval, Timeline};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

/// Most samples reserved before an interval starts stepping.
const MAX_PREALLOCATED_SAMPLES: u64 = 1 << 20;

/// One observed transmission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Absolute time of the attempt in milliseconds
    pub timestamp_ms: f64,

    /// Whether the attempt was received
    pub success: bool,
}

/// Samples produced by one timeline interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSamples {
    pub interval: SimulationInterval,
    pub samples: Vec<Sample>,
}

impl IntervalSamples {
    pub fn model(&self) -> &ChannelModel {
        self.interval.model()
    }

    pub fn successes(&self) -> u64 {
        self.samples.iter().filter(|s| s.success).count() as u64
    }
}

/// Output of one simulation run: one entry per timeline interval, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationResult {
    entries: Vec<IntervalSamples>,
}

impl SimulationResult {
    pub fn entries(&self) -> &[IntervalSamples] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattened, chronologically ordered sample stream.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.entries.iter().flat_map(|e| e.samples.iter())
    }

    /// Samples paired with the model that produced them.
    pub fn samples_with_model(&self) -> impl Iterator<Item = (&ChannelModel, &Sample)> + '_ {
        self.entries
            .iter()
            .flat_map(|e| e.samples.iter().map(move |s| (e.model(), s)))
    }

    pub fn total_samples(&self) -> usize {
        self.entries.iter().map(|e| e.samples.len()).sum()
    }

    /// Aggregate counts over the whole run.
    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            steps: self.total_samples() as u64,
            successes: self.entries.iter().map(IntervalSamples::successes).sum(),
        }
    }
}

/// Aggregate statistics about a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulationStats {
    /// Markov steps taken (samples emitted)
    pub steps: u64,

    /// Steps spent in the success state
    pub successes: u64,
}

impl SimulationStats {
    pub fn failures(&self) -> u64 {
        self.steps - self.successes
    }

    /// Fraction of successful attempts.
    pub fn success_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.successes as f64 / self.steps as f64
        }
    }
}

/// Configuration for a simulator instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatorConfig {
    /// Random seed; `None` draws fresh entropy
    pub seed: Option<u64>,

    /// Refuse timelines needing more steps than this
    pub max_steps: Option<u64>,
}

impl SimulatorConfig {
    /// Deterministic configuration with no step ceiling.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            max_steps: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Simulator owning its random source.
///
/// # Thread Safety
/// `run` takes `&mut self`, so one RNG never serves two runs at once. Use one
/// instance per thread.
pub struct MarkovSimulator {
    config: SimulatorConfig,
    rng: ChaCha8Rng,
    runs: u64,
}

impl MarkovSimulator {
    /// Create a simulator; seeds from entropy when no seed is configured.
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            config,
            rng,
            runs: 0,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of completed runs on this instance.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Run the chain over `timeline`, enforcing the configured step ceiling.
    pub fn run(&mut self, timeline: &Timeline) -> Result<SimulationResult> {
        if let Some(max_steps) = self.config.max_steps {
            let steps = timeline.total_steps();
            if steps > max_steps {
                return Err(ConfigurationError::StepLimitExceeded { steps, max_steps }.into());
            }
        }

        let result = run(timeline, &mut self.rng)?;
        self.runs += 1;
        Ok(result)
    }
}

/// Check that every interval of `timeline` can be simulated.
pub fn validate(timeline: &Timeline) -> std::result::Result<(), ConfigurationError> {
    if timeline.is_empty() {
        return Err(ConfigurationError::EmptyTimeline);
    }
    timeline.iter().try_for_each(|interval| interval.model().validate())
}

/// Run the chain over `timeline` using `rng`.
///
/// The whole timeline is validated first; on error nothing is sampled.
///
/// # Errors
/// `ConfigurationError` for an empty timeline, a non-positive slot time, a
/// probability outside [0, 1], or a row with no outgoing weight.
pub fn run<R: Rng + ?Sized>(timeline: &Timeline, rng: &mut R) -> Result<SimulationResult> {
    validate(timeline)?;

    info!(
        intervals = timeline.len(),
        total_duration_ms = timeline.total_duration_ms(),
        total_steps = timeline.total_steps(),
        "Starting simulation"
    );

    let mut state = ChainState::Success;
    let mut entries = Vec::with_capacity(timeline.len());

    for interval in timeline {
        let samples = run_interval(interval, &mut state, rng);
        debug!(
            model = interval.model().title(),
            start_time = interval.start_time(),
            steps = samples.len(),
            end_state = state.index(),
            "Interval simulated"
        );
        entries.push(IntervalSamples {
            interval: interval.clone(),
            samples,
        });
    }

    let result = SimulationResult { entries };
    let stats = result.stats();
    info!(
        steps = stats.steps,
        successes = stats.successes,
        success_rate = stats.success_rate(),
        "Simulation complete"
    );

    Ok(result)
}

/// Step the chain through one interval, leaving `state` at its terminal value.
fn run_interval<R: Rng + ?Sized>(
    interval: &SimulationInterval,
    state: &mut ChainState,
    rng: &mut R,
) -> Vec<Sample> {
    let model = interval.model();
    let tx_time_ms = model.tx_time_ms();
    let start = interval.start_time() as f64;
    let steps = interval.step_count();

    let mut samples = Vec::with_capacity(sample_capacity(steps));
    for step in 0..steps {
        samples.push(Sample {
            timestamp_ms: start + step as f64 * tx_time_ms,
            success: state.is_success(),
        });
        *state = next_state(model, *state, rng);
    }
    samples
}

/// Up-front reservation for an interval's samples; larger intervals grow.
fn sample_capacity(steps: u64) -> usize {
    steps.min(MAX_PREALLOCATED_SAMPLES) as usize
}

/// Draw the successor of `state` from its transition row.
fn next_state<R: Rng + ?Sized>(model: &ChannelModel, state: ChainState, rng: &mut R) -> ChainState {
    let [to_success, to_failure] = model.row(state);
    let roll: f64 = rng.gen();
    if roll * (to_success + to_failure) < to_success {
        ChainState::Success
    } else {
        ChainState::Failure
    }
}
