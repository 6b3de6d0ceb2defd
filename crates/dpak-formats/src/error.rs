//! Conversion failures and recoverable diagnostics.

use core::fmt;

use dpak_ir::ModelError;
use thiserror::Error;

use crate::profile::DriverTag;

/// A failure that aborts conversion of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// A read would run past the end of the region being parsed
    #[error("read of {len} bytes at {offset:#x} runs past the end of a {available}-byte region")]
    BufferTooShort { offset: usize, len: usize, available: usize },

    /// An index names something that does not exist
    #[error("{what} {index} referenced but only {count} exist")]
    CorruptReference { what: &'static str, index: usize, count: usize },

    /// The driver revision is known to be incompatible
    #[error("driver revision {tag} is not supported")]
    UnsupportedDriverVariant { tag: DriverTag },

    /// A pattern cell unpacked to an impossible field combination
    #[error("pattern {pattern}, row {row}, channel {channel}: {detail}")]
    MalformedPattern { pattern: usize, row: u16, channel: u8, detail: String },

    /// A header value no valid bank can hold
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A sample payload is over the configured size limit
    #[error("sample {index} is {len} bytes, over the {limit}-byte limit")]
    SampleTooLarge { index: usize, len: usize, limit: usize },

    /// A count is past what the XM format can express
    #[error("{what} count {count} exceeds the XM limit of {max}")]
    LimitExceeded { what: &'static str, count: usize, max: usize },
}

/// Fieldless mirror of [`ConvertError`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BufferTooShort,
    CorruptReference,
    UnsupportedDriverVariant,
    MalformedPattern,
    MalformedHeader,
    SampleTooLarge,
    LimitExceeded,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::BufferTooShort { .. } => ErrorKind::BufferTooShort,
            ConvertError::CorruptReference { .. } => ErrorKind::CorruptReference,
            ConvertError::UnsupportedDriverVariant { .. } => ErrorKind::UnsupportedDriverVariant,
            ConvertError::MalformedPattern { .. } => ErrorKind::MalformedPattern,
            ConvertError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            ConvertError::SampleTooLarge { .. } => ErrorKind::SampleTooLarge,
            ConvertError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<ModelError> for ConvertError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::OrderOutOfRange { pattern, patterns, .. } => ConvertError::CorruptReference {
                what: "pattern",
                index: pattern as usize,
                count: patterns,
            },
            ModelError::SampleOutOfRange { sample, samples, .. } => ConvertError::CorruptReference {
                what: "sample",
                index: sample as usize,
                count: samples,
            },
            ModelError::InstrumentOutOfRange { instrument, instruments, .. } => {
                ConvertError::CorruptReference {
                    what: "instrument",
                    index: instrument as usize,
                    count: instruments,
                }
            }
            ModelError::InvalidNote { pattern, row, channel } => ConvertError::MalformedPattern {
                pattern,
                row,
                channel,
                detail: "note out of range".into(),
            },
            other => ConvertError::MalformedHeader(other.to_string()),
        }
    }
}

/// What kind of recovery a [`Diagnostic`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Driver effect with no XM counterpart, replaced by no effect
    UnsupportedEffect,
    /// Tag missing from the driver table, parsed with the classic layout
    UnknownDriverTag,
    /// Order list cut at an entry naming a pattern past the last declared one
    OrderTruncated,
    /// Sample loop pulled back inside its payload
    LoopClamped,
    /// Oversize sample cut to the configured limit
    SampleTruncated,
    /// Unplayed sample whose payload lies outside the bank, left empty
    SampleOutOfBounds,
}

/// A recovered problem, kept with the track it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    /// Record a diagnostic and log it.
    pub(crate) fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(?kind, "{}", message);
        Self { kind, message }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
