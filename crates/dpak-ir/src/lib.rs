//! Intermediate model for dpak-rip.
//!
//! Every driver revision parser emits a [`SoundBank`], and the XM writer
//! consumes one. Types here carry no knowledge of either binary layout.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bank;
mod effects;
mod error;
mod instrument;
mod pattern;
mod sample;

pub use bank::SoundBank;
pub use effects::{Effect, VolumeCommand};
pub use error::ModelError;
pub use instrument::{Envelope, EnvelopePoint, Instrument};
pub use pattern::{Cell, Note, Pattern};
pub use sample::{PcmEncoding, Sample, SampleLoop};
