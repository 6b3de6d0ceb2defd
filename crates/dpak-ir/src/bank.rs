//! Sound bank: the root of the intermediate model.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::error::ModelError;
use crate::instrument::Instrument;
use crate::pattern::Pattern;
use crate::sample::Sample;

/// One musical track, fully decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundBank {
    /// Track title
    pub title: ArrayString<20>,
    /// Initial speed (ticks per row, 1-31)
    pub initial_speed: u8,
    /// Initial tempo in BPM (32-255 typical)
    pub initial_tempo: u8,
    /// Order position playback restarts from after the last entry
    pub restart_position: u8,
    /// Number of channels every pattern carries
    pub channels: u8,
    /// Samples
    pub samples: Vec<Sample>,
    /// Instruments
    pub instruments: Vec<Instrument>,
    /// Patterns
    pub patterns: Vec<Pattern>,
    /// Sequence order: pattern indices in playback order
    pub order: Vec<u8>,
}

impl Default for SoundBank {
    fn default() -> Self {
        Self {
            title: ArrayString::new(),
            initial_speed: 6,
            initial_tempo: 125,
            restart_position: 0,
            channels: 4,
            samples: Vec::new(),
            instruments: Vec::new(),
            patterns: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl SoundBank {
    /// Create a new empty bank.
    pub fn new(title: &str, channels: u8) -> Self {
        let mut bank = Self { channels, ..Self::default() };
        let _ = bank.title.try_push_str(title);
        bank
    }

    /// Check every structural invariant of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.channels == 0 {
            return Err(ModelError::NoChannels);
        }
        if self.order.is_empty() {
            return Err(ModelError::EmptyOrder);
        }
        if self.restart_position as usize >= self.order.len() {
            return Err(ModelError::RestartOutOfRange {
                restart: self.restart_position,
                order_len: self.order.len(),
            });
        }

        for (position, &pattern) in self.order.iter().enumerate() {
            if pattern as usize >= self.patterns.len() {
                return Err(ModelError::OrderOutOfRange {
                    position,
                    pattern,
                    patterns: self.patterns.len(),
                });
            }
        }

        for (index, sample) in self.samples.iter().enumerate() {
            if let Some(l) = sample.looping {
                if l.end() as usize > sample.len() {
                    return Err(ModelError::LoopOutOfRange { sample: index });
                }
            }
        }

        for (index, inst) in self.instruments.iter().enumerate() {
            if let Some(&bad) = inst
                .referenced_samples()
                .iter()
                .find(|&&s| s as usize >= self.samples.len())
            {
                return Err(ModelError::SampleOutOfRange {
                    instrument: index,
                    sample: bad,
                    samples: self.samples.len(),
                });
            }
        }

        for (index, pat) in self.patterns.iter().enumerate() {
            if pat.rows == 0
                || pat.rows > Pattern::MAX_ROWS
                || pat.channels != self.channels
                || pat.data.len() != pat.rows as usize * pat.channels as usize
            {
                return Err(ModelError::PatternShape { pattern: index });
            }
            for (row, channel, cell) in pat.events() {
                if !cell.note.is_valid() {
                    return Err(ModelError::InvalidNote { pattern: index, row, channel });
                }
                if let Some(inst) = cell.instrument_index() {
                    if inst >= self.instruments.len() {
                        return Err(ModelError::InstrumentOutOfRange {
                            pattern: index,
                            row,
                            channel,
                            instrument: cell.instrument,
                            instruments: self.instruments.len(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Replace samples that no pattern cell can reach with empty payloads.
    ///
    /// A sample is reachable when some cell names an instrument whose key
    /// map references it. Returns the number of samples blanked.
    pub fn blank_unreachable_samples(&mut self) -> usize {
        let mut used_instruments = alloc::vec![false; self.instruments.len()];
        for pat in &self.patterns {
            for (_, _, cell) in pat.events() {
                if let Some(slot) = cell.instrument_index().and_then(|i| used_instruments.get_mut(i)) {
                    *slot = true;
                }
            }
        }

        let mut reachable = alloc::vec![false; self.samples.len()];
        for (inst, _) in self
            .instruments
            .iter()
            .zip(&used_instruments)
            .filter(|&(_, &used)| used)
        {
            for s in inst.referenced_samples() {
                if let Some(slot) = reachable.get_mut(s as usize) {
                    *slot = true;
                }
            }
        }

        let mut blanked = 0;
        for (sample, _) in self.samples.iter_mut().zip(&reachable).filter(|&(_, &r)| !r) {
            if !sample.is_empty() {
                sample.blank();
                blanked += 1;
            }
        }
        blanked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Note;
    use crate::sample::SampleLoop;

    fn two_instrument_bank() -> SoundBank {
        let mut bank = SoundBank::new("test", 2);
        for name in ["a", "b", "c"] {
            let mut s = Sample::new(name);
            s.data = vec![1; 32];
            bank.samples.push(s);
        }
        let mut first = Instrument::new("first");
        first.set_single_sample(0);
        let mut second = Instrument::new("second");
        second.map_range(0, 47, 1);
        second.map_range(48, 95, 2);
        bank.instruments.push(first);
        bank.instruments.push(second);

        let mut pat = Pattern::new(4, 2);
        pat.cell_mut(0, 0).note = Note::On(48);
        pat.cell_mut(0, 0).instrument = 2;
        bank.patterns.push(pat);
        bank.order.push(0);
        bank
    }

    #[test]
    fn valid_bank_passes() {
        assert_eq!(two_instrument_bank().validate(), Ok(()));
    }

    #[test]
    fn bad_sample_reference_is_reported() {
        let mut bank = two_instrument_bank();
        bank.instruments[0].set_single_sample(99);
        assert_eq!(
            bank.validate(),
            Err(ModelError::SampleOutOfRange { instrument: 0, sample: 99, samples: 3 })
        );
    }

    #[test]
    fn loop_past_payload_is_reported() {
        let mut bank = two_instrument_bank();
        bank.samples[1].looping = Some(SampleLoop { start: 16, length: 17 });
        assert_eq!(bank.validate(), Err(ModelError::LoopOutOfRange { sample: 1 }));
    }

    #[test]
    fn order_must_name_existing_patterns() {
        let mut bank = two_instrument_bank();
        bank.order.push(4);
        assert!(matches!(bank.validate(), Err(ModelError::OrderOutOfRange { pattern: 4, .. })));
    }

    #[test]
    fn cells_must_name_existing_instruments() {
        let mut bank = two_instrument_bank();
        bank.patterns[0].cell_mut(3, 1).instrument = 3;
        assert!(matches!(
            bank.validate(),
            Err(ModelError::InstrumentOutOfRange { row: 3, channel: 1, .. })
        ));
    }

    #[test]
    fn unreachable_samples_are_blanked() {
        let mut bank = two_instrument_bank();
        // Only instrument 2 is played, which reaches samples 1 and 2.
        assert_eq!(bank.blank_unreachable_samples(), 1);
        assert!(bank.samples[0].is_empty());
        assert!(!bank.samples[1].is_empty());
        assert!(!bank.samples[2].is_empty());
        assert_eq!(bank.validate(), Ok(()));
    }
}
