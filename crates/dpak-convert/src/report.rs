//! Per-track results and the run summary.

use core::fmt;

use dpak_formats::{Candidate, ConvertError, Diagnostic, DriverTag};

/// A track that made it all the way to XM.
#[derive(Debug, Clone)]
pub struct ConvertedTrack {
    pub title: String,
    pub tag: DriverTag,
    pub xm: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
    /// Samples emptied because no cell could play them
    pub blanked_samples: usize,
}

/// Result of converting one candidate.
#[derive(Debug, Clone)]
pub struct TrackReport {
    /// Discovery order of the candidate in the ROM
    pub index: usize,
    pub candidate: Candidate,
    pub outcome: Result<ConvertedTrack, ConvertError>,
}

impl TrackReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for TrackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "track {:02} (bank {:#x}, song {}): ",
            self.index, self.candidate.bank.start, self.candidate.song
        )?;
        match &self.outcome {
            Ok(track) => {
                write!(f, "{} [{}], {} bytes", track.title, track.tag, track.xm.len())?;
                if !track.diagnostics.is_empty() {
                    write!(f, ", {} warnings", track.diagnostics.len())?;
                }
                Ok(())
            }
            Err(e) => write!(f, "{}: {}", e.kind(), e),
        }
    }
}

/// How a whole run went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No candidate anywhere
    NothingFound,
    /// Candidates existed but none converted
    AllFailed { failed: usize },
    Converted { converted: usize, failed: usize },
}

impl Outcome {
    pub fn of(reports: &[TrackReport]) -> Self {
        let converted = reports.iter().filter(|r| r.is_success()).count();
        Self::from_counts(converted, reports.len() - converted)
    }

    fn from_counts(converted: usize, failed: usize) -> Self {
        match (converted, failed) {
            (0, 0) => Outcome::NothingFound,
            (0, failed) => Outcome::AllFailed { failed },
            (converted, failed) => Outcome::Converted { converted, failed },
        }
    }

    fn counts(self) -> (usize, usize) {
        match self {
            Outcome::NothingFound => (0, 0),
            Outcome::AllFailed { failed } => (0, failed),
            Outcome::Converted { converted, failed } => (converted, failed),
        }
    }

    /// Combine the outcomes of several ROMs.
    pub fn merge(self, other: Outcome) -> Outcome {
        let (a, b) = (self.counts(), other.counts());
        Self::from_counts(a.0 + b.0, a.1 + b.1)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NothingFound => write!(f, "no supported audio data found"),
            Outcome::AllFailed { failed } => write!(f, "all {} tracks failed", failed),
            Outcome::Converted { converted, failed } => {
                write!(f, "{} tracks converted, {} failed", converted, failed)
            }
        }
    }
}
