//! Synthetic DPAK banks for tests.
//!
//! Serializes songs and samples with the same layouts the parser reads,
//! using each revision's own cell encoder.

use dpak_ir::PcmEncoding;

use crate::container::{DPAK_ENTRY_LEN, DPAK_HEADER_LEN, DPAK_MAGIC, MUSC_HEADER_LEN, MUSC_MAGIC};
use crate::driver::{Classic, DriverCell, Extended, Revision, DEFAULT_ROWS};
use crate::profile::{DriverTag, Layout};

/// One sample table entry and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    /// Signed PCM; length must be even
    pub pcm: Vec<i8>,
    /// How the payload is stored in the bank
    pub encoding: PcmEncoding,
    pub pitch: u8,
    pub volume: u8,
    /// Loop in bytes; both must be even
    pub loop_start: u32,
    pub loop_length: u32,
}

impl SampleSpec {
    pub fn new(pcm: Vec<i8>) -> Self {
        Self {
            pcm,
            encoding: PcmEncoding::Signed,
            pitch: 0,
            volume: 64,
            loop_start: 0,
            loop_length: 0,
        }
    }
}

/// One extended-layout instrument table entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentSpec {
    /// (last note, sample index) pairs
    pub ranges: Vec<(u8, u8)>,
    pub volume_envelope: Vec<(u16, u8)>,
    pub panning_envelope: Vec<(u16, u8)>,
    pub sustain: Option<u8>,
    pub fadeout: u16,
}

impl InstrumentSpec {
    /// Every note plays `sample`.
    pub fn single(sample: u8) -> Self {
        Self { ranges: vec![(95, sample)], ..Default::default() }
    }
}

/// One song, in either layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongSpec {
    pub tag: DriverTag,
    pub layout: Layout,
    pub channels: u8,
    pub rows: u16,
    pub speed: u8,
    pub tempo: u8,
    pub restart: u8,
    /// Declared pattern count; `None` uses `patterns.len()`
    pub pattern_count: Option<u8>,
    pub order: Vec<u8>,
    /// Row-major cells, `rows * channels` per pattern
    pub patterns: Vec<Vec<DriverCell>>,
    /// Extended layout only
    pub instruments: Vec<InstrumentSpec>,
}

impl SongSpec {
    /// One empty 64-row pattern played once.
    pub fn classic(channels: u8) -> Self {
        Self {
            tag: DriverTag::MV01,
            layout: Layout::Classic,
            channels,
            rows: DEFAULT_ROWS,
            speed: 6,
            tempo: 125,
            restart: 0,
            pattern_count: None,
            order: vec![0],
            patterns: vec![empty_pattern(DEFAULT_ROWS, channels)],
            instruments: Vec::new(),
        }
    }

    /// One empty pattern played once, no instruments.
    pub fn extended(channels: u8, rows: u16) -> Self {
        Self {
            tag: DriverTag::MV02,
            layout: Layout::Extended,
            rows,
            patterns: vec![empty_pattern(rows, channels)],
            ..Self::classic(channels)
        }
    }

    /// Mutable cell of `pattern` at (row, channel).
    pub fn cell_mut(&mut self, pattern: usize, row: u16, channel: u8) -> &mut DriverCell {
        let channels = self.channels as usize;
        &mut self.patterns[pattern][row as usize * channels + channel as usize]
    }

    fn encode(&self) -> Vec<u8> {
        let pattern_count = self.pattern_count.unwrap_or(self.patterns.len() as u8);
        let mut out = self.tag.0.to_vec();
        if self.layout != Layout::Extended {
            out.extend_from_slice(&[pattern_count, 0, self.channels, 0]);
            out.extend_from_slice(&self.body::<Classic>());
            return out;
        }

        let body = self.body::<Extended>();
        let table = Extended::HEADER_LEN + body.len();
        out.extend_from_slice(&[
            pattern_count,
            self.instruments.len() as u8,
            self.channels,
            self.speed,
            self.tempo,
            self.restart,
        ]);
        out.extend_from_slice(&(table as u16).to_le_bytes());
        out.extend_from_slice(&[(self.rows % 256) as u8, 0, 0, 0]);
        out.extend_from_slice(&body);
        for inst in &self.instruments {
            out.extend_from_slice(&[
                inst.ranges.len() as u8,
                inst.volume_envelope.len() as u8,
                inst.panning_envelope.len() as u8,
                inst.sustain.unwrap_or(0xFF),
            ]);
            out.extend_from_slice(&inst.fadeout.to_le_bytes());
            out.extend_from_slice(&[0, 0]);
            for &(last, sample) in &inst.ranges {
                out.extend_from_slice(&[last, sample]);
            }
            for &(tick, value) in inst.volume_envelope.iter().chain(&inst.panning_envelope) {
                out.extend_from_slice(&tick.to_le_bytes());
                out.extend_from_slice(&[value, 0]);
            }
        }
        out
    }

    /// Order table and pattern data, which follow the header.
    fn body<R: Revision>(&self) -> Vec<u8> {
        let data_start = R::HEADER_LEN + 2 * self.order.len();
        assert!(data_start <= 0xFF, "order table too long");

        let mut body = Vec::new();
        for &p in &self.order {
            body.extend_from_slice(&[data_start as u8, p.wrapping_mul(8)]);
        }
        for pattern in &self.patterns {
            assert_eq!(pattern.len(), self.rows as usize * self.channels as usize);
            for cell in pattern {
                body.extend_from_slice(&R::encode_cell(cell));
            }
        }
        body
    }
}

/// Pattern of empty cells.
pub fn empty_pattern(rows: u16, channels: u8) -> Vec<DriverCell> {
    vec![DriverCell::default(); rows as usize * channels as usize]
}

/// Serialize a MUSC chunk: header, song table, songs, PCM, sample table.
pub fn build_musc(songs: &[SongSpec], samples: &[SampleSpec]) -> Vec<u8> {
    let song_table = MUSC_HEADER_LEN;
    let mut out = Vec::new();
    out.extend_from_slice(MUSC_MAGIC);
    out.extend_from_slice(&(song_table as u32).to_le_bytes());
    // Sample table offset, patched below
    out.extend_from_slice(&0u32.to_le_bytes());

    out.extend_from_slice(&(songs.len() as u32).to_le_bytes());
    let encoded: Vec<Vec<u8>> = songs.iter().map(SongSpec::encode).collect();
    let mut at = 4 + 4 * songs.len();
    for song in &encoded {
        out.extend_from_slice(&(at as u32).to_le_bytes());
        at += song.len();
    }
    for song in &encoded {
        out.extend_from_slice(song);
    }

    let mut payloads = Vec::with_capacity(samples.len());
    for s in samples {
        assert!(s.pcm.len() % 2 == 0, "sample payload must be whole words");
        payloads.push(out.len());
        out.extend_from_slice(&s.encoding.from_signed(&s.pcm));
    }

    let sample_table = out.len();
    out[8..12].copy_from_slice(&(sample_table as u32).to_le_bytes());
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    for (s, &payload) in samples.iter().zip(&payloads) {
        let field_end = out.len() + 4;
        let pointer = (payload as i32 - field_end as i32).to_le_bytes();
        out.extend_from_slice(&[0, pointer[0], pointer[1], pointer[2]]);
        out.extend_from_slice(&((s.pcm.len() / 2) as u16).to_le_bytes());
        out.extend_from_slice(&[s.pitch, s.volume]);
        out.extend_from_slice(&((s.loop_start / 2) as u16).to_le_bytes());
        out.extend_from_slice(&((s.loop_length / 2) as u16).to_le_bytes());
    }
    out
}

/// Serialize a DPAK container holding `chunks` back to back.
pub fn build_dpak(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(DPAK_MAGIC);
    out.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    out.extend_from_slice(b"Torus\0\0\0\0\0");

    let mut at = DPAK_HEADER_LEN + DPAK_ENTRY_LEN * chunks.len();
    for (kind, chunk) in chunks.iter().enumerate() {
        for v in [kind, at, chunk.len(), 0] {
            out.extend_from_slice(&(v as u32).to_le_bytes());
        }
        at += chunk.len();
    }
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out
}

/// A zero-filled ROM of at least `len` bytes with `bytes` at `offset`.
pub fn place(offset: usize, bytes: &[u8], len: usize) -> Vec<u8> {
    let mut rom = vec![0u8; len.max(offset + bytes.len())];
    rom[offset..offset + bytes.len()].copy_from_slice(bytes);
    rom
}
