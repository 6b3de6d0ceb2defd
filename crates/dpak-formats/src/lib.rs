//! Format handling for dpak-rip.
//!
//! Locates DPAK sound banks inside GBA ROM images, parses each song into
//! the [`dpak_ir::SoundBank`] model, and writes XM modules.

mod container;
pub mod driver;
mod effect_parser;
mod error;
pub mod profile;
mod reader;
pub mod scanner;
mod xm_format;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

pub use driver::{parse_track, DriverCell, ParsedTrack};
pub use error::{ConvertError, Diagnostic, DiagnosticKind, ErrorKind};
pub use profile::{DriverProfile, DriverTable, DriverTag, Layout, UnknownTagPolicy};
pub use scanner::{scan, Candidate, Candidates};
pub use xm_format::{
    delta_decode, delta_encode, pack_pattern, write_xm, OversizePolicy, XmOptions, XmOutput,
    XM_HEADER_LEN, XM_MAGIC, XM_NOTE_OFF,
};
