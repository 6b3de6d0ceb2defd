//! ROM to XM conversion pipeline.
//!
//! Scans a ROM for sound banks, parses every song found and writes each
//! one as an XM module. A failed song never stops the rest: every
//! candidate yields exactly one [`TrackReport`], indexed in discovery
//! order.

mod options;
mod report;

use dpak_formats::{parse_track, scan, write_xm, Candidate, ConvertError, ParsedTrack};
use rayon::prelude::*;
use tracing::{info, warn};

pub use options::{ConvertOptions, OptionsError};
pub use report::{ConvertedTrack, Outcome, TrackReport};

/// Converts ROM images with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert lazily, one candidate per step.
    pub fn tracks<'a>(&'a self, rom: &'a [u8]) -> impl Iterator<Item = TrackReport> + 'a {
        scan(rom)
            .enumerate()
            .map(move |(index, candidate)| self.convert_candidate(rom, index, candidate))
    }

    /// Convert every candidate in parallel. Reports keep discovery order.
    pub fn convert_all(&self, rom: &[u8]) -> Vec<TrackReport> {
        let candidates: Vec<Candidate> = scan(rom).collect();
        candidates
            .into_par_iter()
            .enumerate()
            .map(|(index, candidate)| self.convert_candidate(rom, index, candidate))
            .collect()
    }

    pub fn convert_candidate(&self, rom: &[u8], index: usize, candidate: Candidate) -> TrackReport {
        let outcome = self.convert(rom, &candidate);
        match &outcome {
            Ok(track) => info!(
                "track {:02}: {} ({} bytes, {} diagnostics)",
                index,
                track.title,
                track.xm.len(),
                track.diagnostics.len()
            ),
            Err(e) => warn!("track {:02}: {}", index, e),
        }
        TrackReport { index, candidate, outcome }
    }

    fn convert(&self, rom: &[u8], candidate: &Candidate) -> Result<ConvertedTrack, ConvertError> {
        let ParsedTrack { mut bank, tag, mut diagnostics } =
            parse_track(rom, candidate, &self.options.drivers)?;

        let blanked_samples = if self.options.prune_unused_samples {
            bank.blank_unreachable_samples()
        } else {
            0
        };

        let out = write_xm(&bank, &self.options.xm)?;
        diagnostics.extend(out.diagnostics);
        Ok(ConvertedTrack {
            title: bank.title.to_string(),
            tag,
            xm: out.bytes,
            diagnostics,
            blanked_samples,
        })
    }
}
