//! Instrument and envelope types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::pattern::Note;

/// An instrument definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    /// Instrument name
    pub name: ArrayString<22>,
    /// Sample mapping: note (0-95) -> index into the bank's samples
    pub sample_map: [Option<u8>; Note::COUNT as usize],
    /// Volume envelope
    pub volume_envelope: Option<Envelope>,
    /// Panning envelope
    pub panning_envelope: Option<Envelope>,
    /// Fadeout speed (0 = no fade)
    pub fadeout: u16,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            sample_map: [None; Note::COUNT as usize],
            volume_envelope: None,
            panning_envelope: None,
            fadeout: 0,
        }
    }
}

impl Instrument {
    /// Create a new instrument with default settings.
    pub fn new(name: &str) -> Self {
        let mut inst = Self::default();
        let _ = inst.name.try_push_str(name);
        inst
    }

    /// Set all notes to map to a single sample.
    pub fn set_single_sample(&mut self, sample_index: u8) {
        self.sample_map.fill(Some(sample_index));
    }

    /// Map notes `first..=last` to a sample. Notes past 95 are ignored.
    pub fn map_range(&mut self, first: u8, last: u8, sample_index: u8) {
        let last = last.min(Note::COUNT - 1);
        for note in first..=last {
            self.sample_map[note as usize] = Some(sample_index);
        }
    }

    /// Distinct sample indices this instrument can play, ascending.
    pub fn referenced_samples(&self) -> Vec<u8> {
        let mut used: Vec<u8> = self.sample_map.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

/// An envelope (volume or panning).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Envelope points
    pub points: Vec<EnvelopePoint>,
    /// Sustain point index (None = no sustain)
    pub sustain: Option<u8>,
    /// Loop start point index (None = no loop)
    pub loop_start: Option<u8>,
    /// Loop end point index
    pub loop_end: Option<u8>,
    /// Is the envelope enabled?
    pub enabled: bool,
}

impl Envelope {
    /// Most points an envelope may carry.
    pub const MAX_POINTS: usize = 12;

    /// Create a new empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point to the envelope.
    pub fn add_point(&mut self, tick: u16, value: u8) {
        self.points.push(EnvelopePoint { tick, value });
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Tick position (0-65535)
    pub tick: u16,
    /// Value (0-64)
    pub value: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_covers_every_note() {
        let mut inst = Instrument::new("lead");
        inst.set_single_sample(3);
        assert!(inst.sample_map.iter().all(|&s| s == Some(3)));
        assert_eq!(inst.referenced_samples(), vec![3]);
    }

    #[test]
    fn ranges_split_the_keyboard() {
        let mut inst = Instrument::new("split");
        inst.map_range(0, 47, 2);
        inst.map_range(48, 200, 0);
        assert_eq!(inst.sample_map[47], Some(2));
        assert_eq!(inst.sample_map[48], Some(0));
        assert_eq!(inst.sample_map[95], Some(0));
        assert_eq!(inst.referenced_samples(), vec![0, 2]);
    }

    #[test]
    fn unmapped_instrument_references_nothing() {
        let inst = Instrument::new("empty");
        assert!(inst.referenced_samples().is_empty());
    }
}
