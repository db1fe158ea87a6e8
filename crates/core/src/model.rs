//! Two-state Markov channel models.
//!
//! A channel model describes a wireless link as a Markov chain over two
//! latent states, stepped once per transmission slot:
//!
//! - **State 0**: the transmission attempt succeeds
//! - **State 1**: the transmission attempt fails
//!
//! # Record Format
//!
//! Models are persisted as plain text, seven `key = value` lines in a fixed
//! order:
//!
//! ```text
//! Title = Urban LoS
//! Description = Line of sight, light traffic
//! TX time (ms) = 100
//! P00 = 0.9
//! P01 = 0.1
//! P10 = 0.2
//! P11 = 0.8
//! ```
//!
//! Keys are not checked; only position matters. Each line is split on the
//! first `=` and both sides are trimmed.
//!
//! # Repair
//!
//! Upstream estimation sometimes produces slightly negative probabilities.
//! Any probability below zero is clamped to [`PROBABILITY_EPSILON`]. The other
//! entry in the same row is left alone, so a repaired row may not sum to 1.

use crate::error::{ConfigurationError, ParseError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Value substituted for a negative transition probability.
pub const PROBABILITY_EPSILON: f64 = 0.001;

/// Field names of the persisted record, in file order.
pub const RECORD_FIELDS: [&str; 7] = [
    "Title",
    "Description",
    "TX time (ms)",
    "P00",
    "P01",
    "P10",
    "P11",
];

const PROBABILITY_FIELDS: [[&str; 2]; 2] = [["P00", "P01"], ["P10", "P11"]];

/// Latent state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainState {
    /// State 0: transmission succeeds
    Success,
    /// State 1: transmission fails
    Failure,
}

impl ChainState {
    /// Row/column index of this state in the transition matrix.
    pub fn index(self) -> usize {
        match self {
            ChainState::Success => 0,
            ChainState::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == ChainState::Success
    }
}

/// An immutable two-state Markov channel description.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelModel {
    title: String,
    description: String,
    tx_time_ms: f64,
    /// `transitions[i][j]` is the probability of moving from state i to j
    transitions: [[f64; 2]; 2],
}

impl ChannelModel {
    /// Create a model from its parts, repairing negative probabilities.
    ///
    /// `probabilities` is `[p00, p01, p10, p11]`. Title and description are
    /// trimmed, as the record format cannot carry surrounding whitespace.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        tx_time_ms: f64,
        probabilities: [f64; 4],
    ) -> Self {
        let title = title.into().trim().to_string();
        let description = description.into().trim().to_string();
        let [p00, p01, p10, p11] = probabilities;
        let mut transitions = [[p00, p01], [p10, p11]];

        for (row, names) in transitions.iter_mut().zip(PROBABILITY_FIELDS) {
            for (value, field) in row.iter_mut().zip(names) {
                if *value < 0.0 {
                    warn!(
                        model = %title,
                        probability = field,
                        original = *value,
                        repaired = PROBABILITY_EPSILON,
                        "Clamping negative transition probability"
                    );
                    *value = PROBABILITY_EPSILON;
                }
            }
        }

        Self {
            title,
            description,
            tx_time_ms,
            transitions,
        }
    }

    /// Parse a model from the seven-line record format.
    ///
    /// # Errors
    /// - `MissingLine` if the record has fewer than seven lines
    /// - `MissingSeparator` if one of the first seven lines has no `=`
    /// - `InvalidNumber` if a numeric field is malformed or not finite
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        let mut lines = text.lines();
        let mut values = [""; 7];

        for (idx, field) in RECORD_FIELDS.iter().copied().enumerate() {
            let line = lines.next().ok_or(ParseError::MissingLine {
                line: idx + 1,
                field,
            })?;
            let (_, value) = line.split_once('=').ok_or(ParseError::MissingSeparator {
                line: idx + 1,
                field,
            })?;
            values[idx] = value.trim();
        }

        let tx_time_ms = parse_number(RECORD_FIELDS[2], values[2])?;
        let mut probabilities = [0.0; 4];
        for (slot, idx) in probabilities.iter_mut().zip(3..7) {
            *slot = parse_number(RECORD_FIELDS[idx], values[idx])?;
        }

        Ok(Self::new(values[0], values[1], tx_time_ms, probabilities))
    }

    /// Read and parse a model record from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Render the model back into the record format accepted by [`parse`].
    ///
    /// [`parse`]: ChannelModel::parse
    pub fn to_record(&self) -> String {
        format!(
            "Title = {}\nDescription = {}\nTX time (ms) = {}\nP00 = {}\nP01 = {}\nP10 = {}\nP11 = {}\n",
            self.title,
            self.description,
            self.tx_time_ms,
            self.p00(),
            self.p01(),
            self.p10(),
            self.p11(),
        )
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Duration of one transmission slot (one Markov step) in milliseconds.
    pub fn tx_time_ms(&self) -> f64 {
        self.tx_time_ms
    }

    pub fn p00(&self) -> f64 {
        self.transitions[0][0]
    }

    pub fn p01(&self) -> f64 {
        self.transitions[0][1]
    }

    pub fn p10(&self) -> f64 {
        self.transitions[1][0]
    }

    pub fn p11(&self) -> f64 {
        self.transitions[1][1]
    }

    /// Transition row `[p_i0, p_i1]` for leaving `state`.
    pub fn row(&self, state: ChainState) -> [f64; 2] {
        self.transitions[state.index()]
    }

    /// Long-run probability of being in the success state, `p10 / (p01 + p10)`.
    ///
    /// Returns `None` when neither state can be left (`p01 + p10 == 0`).
    pub fn stationary_success_probability(&self) -> Option<f64> {
        let denom = self.p01() + self.p10();
        if denom <= 0.0 {
            None
        } else {
            Some(self.p10() / denom)
        }
    }

    /// Check that the model can drive a simulation.
    ///
    /// The repair step makes out-of-range values below zero impossible, but
    /// values above one and non-positive slot times are still rejected here.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if !self.tx_time_ms.is_finite() || self.tx_time_ms <= 0.0 {
            return Err(ConfigurationError::InvalidTxTime {
                title: self.title.clone(),
                tx_time_ms: self.tx_time_ms,
            });
        }

        for (state, (row, names)) in self.transitions.iter().zip(PROBABILITY_FIELDS).enumerate() {
            for (&value, field) in row.iter().zip(names) {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigurationError::ProbabilityOutOfRange {
                        title: self.title.clone(),
                        field,
                        value,
                    });
                }
            }
            if row[0] + row[1] <= 0.0 {
                return Err(ConfigurationError::DegenerateRow {
                    title: self.title.clone(),
                    state: state as u8,
                });
            }
        }

        Ok(())
    }
}

impl FromStr for ChannelModel {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ChannelModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (tx {} ms) [[{}, {}], [{}, {}]]",
            self.title,
            self.tx_time_ms,
            self.p00(),
            self.p01(),
            self.p10(),
            self.p11()
        )
    }
}

fn parse_number(field: &'static str, value: &str) -> std::result::Result<f64, ParseError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "Title = Urban LoS\n\
                          Description = Line of sight\n\
                          TX time (ms) = 100\n\
                          P00 = 0.9\n\
                          P01 = 0.1\n\
                          P10 = 0.2\n\
                          P11 = 0.8\n";

    #[test]
    fn test_parse_record() {
        let model = ChannelModel::parse(RECORD).unwrap();

        assert_eq!(model.title(), "Urban LoS");
        assert_eq!(model.description(), "Line of sight");
        assert_eq!(model.tx_time_ms(), 100.0);
        assert_eq!(model.row(ChainState::Success), [0.9, 0.1]);
        assert_eq!(model.row(ChainState::Failure), [0.2, 0.8]);
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let text = RECORD.replace("Line of sight", "a = b");
        let model = ChannelModel::parse(&text).unwrap();
        assert_eq!(model.description(), "a = b");
    }

    #[test]
    fn test_parse_ignores_keys_and_trailing_lines() {
        let text = "a=T\nb=D\nc=50\nd=1\ne=0\nf=0.5\ng=0.5\nextra line without separator\n";
        let model = ChannelModel::parse(text).unwrap();
        assert_eq!(model.title(), "T");
        assert_eq!(model.tx_time_ms(), 50.0);
    }

    #[test]
    fn test_parse_short_record() {
        let text: String = RECORD.lines().take(5).map(|l| format!("{l}\n")).collect();
        let err = ChannelModel::parse(&text).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingLine {
                line: 6,
                field: "P10"
            }
        );
    }

    #[test]
    fn test_parse_missing_separator() {
        let text = RECORD.replace("P01 = 0.1", "P01 0.1");
        let err = ChannelModel::parse(&text).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingSeparator {
                line: 5,
                field: "P01"
            }
        );
    }

    #[test]
    fn test_parse_invalid_number() {
        let text = RECORD.replace("100", "fast");
        let err = ChannelModel::parse(&text).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidNumber { field: "TX time (ms)", ref value } if value == "fast"
        ));

        let text = RECORD.replace("0.8", "NaN");
        assert!(ChannelModel::parse(&text).is_err());
    }

    #[test]
    fn test_negative_probability_is_clamped() {
        let text = RECORD.replace("P00 = 0.9", "P00 = -0.2");
        let model = ChannelModel::parse(&text).unwrap();

        assert_eq!(model.p00(), PROBABILITY_EPSILON);
        // Paired value is not renormalized
        assert_eq!(model.p01(), 0.1);
        assert!((model.p00() + model.p01() - 1.0).abs() > 0.5);
    }

    #[test]
    fn test_record_round_trip() {
        let model = ChannelModel::new("Rural", "Open field", 250.0, [-0.5, 0.7, 0.4, 0.6]);
        let reparsed = ChannelModel::parse(&model.to_record()).unwrap();

        assert_eq!(reparsed, model);
        assert_eq!(reparsed.p00(), PROBABILITY_EPSILON);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed_once() {
        let model = ChannelModel::new("  Rural ", "\tOpen field  ", 250.0, [0.3, 0.7, 0.4, 0.6]);
        assert_eq!(model.title(), "Rural");
        assert_eq!(model.description(), "Open field");

        let reparsed = ChannelModel::parse(&model.to_record()).unwrap();
        assert_eq!(reparsed, model);
    }

    #[test]
    fn test_stationary_probability() {
        let model = ChannelModel::parse(RECORD).unwrap();
        let pi0 = model.stationary_success_probability().unwrap();
        assert!((pi0 - 2.0 / 3.0).abs() < 1e-12);

        let absorbing = ChannelModel::new("Stuck", "", 10.0, [1.0, 0.0, 0.0, 1.0]);
        assert!(absorbing.stationary_success_probability().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(ChannelModel::parse(RECORD).unwrap().validate().is_ok());

        let zero_tx = ChannelModel::new("Z", "", 0.0, [0.5, 0.5, 0.5, 0.5]);
        assert!(matches!(
            zero_tx.validate(),
            Err(ConfigurationError::InvalidTxTime { .. })
        ));

        let too_big = ChannelModel::new("B", "", 10.0, [1.5, 0.5, 0.5, 0.5]);
        assert!(matches!(
            too_big.validate(),
            Err(ConfigurationError::ProbabilityOutOfRange { field: "P00", .. })
        ));

        let dead_row = ChannelModel::new("D", "", 10.0, [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(
            dead_row.validate(),
            Err(ConfigurationError::DegenerateRow {
                title: "D".to_string(),
                state: 1
            })
        );
    }
}
