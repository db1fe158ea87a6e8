//! Simulation timeline: an ordered, append-only list of intervals.
//!
//! Each interval runs one channel model for a fixed duration. The timeline
//! assigns every interval its absolute start offset at insertion time:
//!
//! ```text
//! start_time[i] = duration_ms[0] + ... + duration_ms[i - 1]
//! ```
//!
//! Offsets never change afterwards; the only supported operation is
//! appending, so multi-phase scenarios are built by forward composition
//! (model A for 1000 ms, then model B for 2000 ms, ...).

use crate::error::ConfigurationError;
use crate::model::ChannelModel;
use std::sync::Arc;

/// A contiguous timeline segment governed by one channel model.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInterval {
    model: Arc<ChannelModel>,
    duration_ms: u64,
    start_time: u64,
}

impl SimulationInterval {
    /// Create an interval that has not yet been placed on a timeline.
    ///
    /// # Errors
    /// Returns `ZeroDuration` if `duration_ms` is zero.
    pub fn new(
        model: Arc<ChannelModel>,
        duration_ms: u64,
    ) -> std::result::Result<Self, ConfigurationError> {
        if duration_ms == 0 {
            return Err(ConfigurationError::ZeroDuration);
        }

        Ok(Self {
            model,
            duration_ms,
            start_time: 0,
        })
    }

    pub fn model(&self) -> &ChannelModel {
        &self.model
    }

    /// Shared handle to the model, for building further intervals.
    pub fn model_handle(&self) -> Arc<ChannelModel> {
        Arc::clone(&self.model)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Absolute start offset in milliseconds (zero until added to a timeline).
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn end_time(&self) -> u64 {
        self.start_time + self.duration_ms
    }

    /// Number of whole transmission slots that fit in this interval.
    ///
    /// A partial final slot is never sampled. Returns 0 for a model with a
    /// non-positive slot time; such models are rejected before a run.
    pub fn step_count(&self) -> u64 {
        let tx = self.model.tx_time_ms();
        if !tx.is_finite() || tx <= 0.0 {
            return 0;
        }
        (self.duration_ms as f64 / tx).floor() as u64
    }
}

/// Ordered sequence of simulation intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    intervals: Vec<SimulationInterval>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interval, fixing its start time after all prior intervals.
    pub fn add(&mut self, mut interval: SimulationInterval) -> &SimulationInterval {
        interval.start_time = self.total_duration_ms();
        self.intervals.push(interval);
        &self.intervals[self.intervals.len() - 1]
    }

    /// Convenience wrapper: build an interval for `model` and append it.
    pub fn push(
        &mut self,
        model: Arc<ChannelModel>,
        duration_ms: u64,
    ) -> std::result::Result<&SimulationInterval, ConfigurationError> {
        let interval = SimulationInterval::new(model, duration_ms)?;
        Ok(self.add(interval))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[SimulationInterval] {
        &self.intervals
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SimulationInterval> {
        self.intervals.iter()
    }

    /// Sum of all interval durations in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.intervals.last().map_or(0, SimulationInterval::end_time)
    }

    /// Total number of Markov steps a run over this timeline performs.
    pub fn total_steps(&self) -> u64 {
        self.intervals
            .iter()
            .map(SimulationInterval::step_count)
            .fold(0u64, u64::saturating_add)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a SimulationInterval;
    type IntoIter = std::slice::Iter<'a, SimulationInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
