//! Sample data types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// A sample definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<22>,
    /// Signed 8-bit PCM frames
    pub data: Vec<i8>,
    /// Forward loop, if any
    pub looping: Option<SampleLoop>,
    /// Default volume (0-64)
    pub volume: u8,
    /// Default panning (0-255, 128 = center)
    pub panning: u8,
    /// Finetune in 1/128 semitone steps
    pub finetune: i8,
    /// Semitone offset applied on playback
    pub relative_note: i8,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: Vec::new(),
            looping: None,
            volume: 64,
            panning: 128,
            finetune: 0,
            relative_note: 0,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Get the length of the sample in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the sample has a non-empty loop.
    pub fn has_loop(&self) -> bool {
        self.looping.is_some_and(|l| l.length > 0)
    }

    /// Pull the loop back inside the payload.
    ///
    /// Returns true if the loop had to change.
    pub fn clamp_loop(&mut self) -> bool {
        let Some(l) = self.looping else {
            return false;
        };
        let len = self.data.len() as u32;
        if l.end() <= len {
            return false;
        }
        self.looping = if l.start >= len {
            None
        } else {
            Some(SampleLoop { start: l.start, length: len - l.start })
        };
        true
    }

    /// Cut the payload to `len` frames, keeping the loop inside it.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.clamp_loop();
    }

    /// Drop the payload and loop, leaving the header behind.
    pub fn blank(&mut self) {
        self.data.clear();
        self.looping = None;
        self.volume = 0;
    }
}

/// Forward loop region, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleLoop {
    pub start: u32,
    pub length: u32,
}

impl SampleLoop {
    /// One past the last looped frame.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }
}

/// Sign convention of raw 8-bit PCM as stored by a driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PcmEncoding {
    /// Two's complement, silence at 0
    #[default]
    Signed,
    /// Offset binary, silence at 0x80
    Unsigned,
}

impl PcmEncoding {
    /// Convert raw driver bytes to signed PCM.
    pub fn to_signed(self, raw: &[u8]) -> Vec<i8> {
        match self {
            PcmEncoding::Signed => raw.iter().map(|&b| b as i8).collect(),
            PcmEncoding::Unsigned => raw.iter().map(|&b| (b ^ 0x80) as i8).collect(),
        }
    }

    /// Convert signed PCM back to the driver's convention.
    pub fn from_signed(self, pcm: &[i8]) -> Vec<u8> {
        match self {
            PcmEncoding::Signed => pcm.iter().map(|&s| s as u8).collect(),
            PcmEncoding::Unsigned => pcm.iter().map(|&s| (s as u8) ^ 0x80).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looped(len: usize, start: u32, length: u32) -> Sample {
        let mut s = Sample::new("test");
        s.data = vec![0; len];
        s.looping = Some(SampleLoop { start, length });
        s
    }

    #[test]
    fn loop_inside_payload_is_untouched() {
        let mut s = looped(100, 10, 90);
        assert!(!s.clamp_loop());
        assert_eq!(s.looping, Some(SampleLoop { start: 10, length: 90 }));
    }

    #[test]
    fn loop_past_end_is_shortened() {
        let mut s = looped(100, 40, 100);
        assert!(s.clamp_loop());
        assert_eq!(s.looping, Some(SampleLoop { start: 40, length: 60 }));
    }

    #[test]
    fn loop_starting_past_end_is_dropped() {
        let mut s = looped(16, 32, 8);
        assert!(s.clamp_loop());
        assert_eq!(s.looping, None);
    }

    #[test]
    fn truncate_keeps_loop_valid() {
        let mut s = looped(1000, 200, 800);
        s.truncate(500);
        assert_eq!(s.len(), 500);
        assert_eq!(s.looping, Some(SampleLoop { start: 200, length: 300 }));
    }

    #[test]
    fn unsigned_pcm_is_recentred() {
        let pcm = PcmEncoding::Unsigned.to_signed(&[0x80, 0xFF, 0x00, 0x7F]);
        assert_eq!(pcm, vec![0, 127, -128, -1]);
        assert_eq!(PcmEncoding::Unsigned.from_signed(&pcm), vec![0x80, 0xFF, 0x00, 0x7F]);
    }

    #[test]
    fn signed_pcm_is_reinterpreted() {
        let pcm = PcmEncoding::Signed.to_signed(&[0x00, 0x7F, 0x80, 0xFF]);
        assert_eq!(pcm, vec![0, 127, -128, -1]);
    }

    #[test]
    fn blank_clears_payload_and_loop() {
        let mut s = looped(64, 0, 64);
        s.blank();
        assert!(s.is_empty());
        assert!(!s.has_loop());
        assert_eq!(s.volume, 0);
    }
}
