//! Model invariant violations.

use core::fmt;

/// A broken invariant found by [`SoundBank::validate`](crate::SoundBank::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Bank declares zero channels
    NoChannels,
    /// Sequence order is empty
    EmptyOrder,
    /// Restart position points past the order list
    RestartOutOfRange { restart: u8, order_len: usize },
    /// Order entry names a pattern that does not exist
    OrderOutOfRange { position: usize, pattern: u8, patterns: usize },
    /// Sample loop runs past the payload
    LoopOutOfRange { sample: usize },
    /// Instrument key map names a sample that does not exist
    SampleOutOfRange { instrument: usize, sample: u8, samples: usize },
    /// Pattern rows/channels disagree with the bank or its own data
    PatternShape { pattern: usize },
    /// Cell carries a note outside the playable range
    InvalidNote { pattern: usize, row: u16, channel: u8 },
    /// Cell names an instrument that does not exist
    InstrumentOutOfRange { pattern: usize, row: u16, channel: u8, instrument: u8, instruments: usize },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NoChannels => write!(f, "bank has no channels"),
            ModelError::EmptyOrder => write!(f, "sequence order is empty"),
            ModelError::RestartOutOfRange { restart, order_len } => {
                write!(f, "restart position {} past order length {}", restart, order_len)
            }
            ModelError::OrderOutOfRange { position, pattern, patterns } => write!(
                f,
                "order position {} names pattern {} (only {} patterns)",
                position, pattern, patterns
            ),
            ModelError::LoopOutOfRange { sample } => {
                write!(f, "sample {} loop runs past its payload", sample)
            }
            ModelError::SampleOutOfRange { instrument, sample, samples } => write!(
                f,
                "instrument {} maps sample {} (only {} samples)",
                instrument, sample, samples
            ),
            ModelError::PatternShape { pattern } => {
                write!(f, "pattern {} shape disagrees with the bank", pattern)
            }
            ModelError::InvalidNote { pattern, row, channel } => write!(
                f,
                "pattern {} row {} channel {}: note out of range",
                pattern, row, channel
            ),
            ModelError::InstrumentOutOfRange { pattern, row, channel, instrument, instruments } => {
                write!(
                    f,
                    "pattern {} row {} channel {}: instrument {} (only {} instruments)",
                    pattern, row, channel, instrument, instruments
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ModelError {}
