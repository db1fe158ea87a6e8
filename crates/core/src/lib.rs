//! linksim-core: Markov chain model of wireless packet reception
//!
//! This library provides the core components for studying link-level metrics
//! under changing channel conditions:
//! - Describes a link as a two-state Markov chain (success / failure per slot)
//! - Composes channel models into a timeline of timed intervals
//! - Simulates the chain slot by slot with seeded randomness
//! - Reduces the sample stream to reception probability and throughput series
//!
//! # Architecture
//!
//! - `model`: Channel model record parsing and repair
//! - `timeline`: Append-only interval timeline with absolute start offsets
//! - `simulator`: Markov chain driver producing success/failure samples
//! - `stats`: Streaming reception probability, confidence band and throughput
//! - `catalog`: Model directory loading and CSV export
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Deterministic**: Seeded randomness makes runs reproducible
//! - **Pure runs**: A run reads its timeline and RNG and returns a new result;
//!   nothing is mutated in place and no presentation state is held

pub mod catalog;
pub mod error;
pub mod model;
pub mod simulator;
pub mod stats;
pub mod timeline;

// Re-export commonly used types
pub use catalog::ModelCatalog;
pub use error::{ConfigurationError, Error, ParseError, Result};
pub use model::{ChainState, ChannelModel};
pub use simulator::{MarkovSimulator, Sample, SimulationResult, SimulatorConfig};
pub use stats::{StatisticalSummarizer, Summary};
pub use timeline::{SimulationInterval, Timeline};
