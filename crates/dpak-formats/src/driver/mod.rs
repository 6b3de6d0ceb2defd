//! Sound driver song parser.
//!
//! A song begins with a 4-byte revision tag. The tag is resolved through a
//! [`DriverTable`] to one of a closed set of layouts, each of which knows
//! its header shape and cell encoding. Everything else (sample table, order
//! list, pattern grid) is shared.

mod classic;
mod extended;

pub(crate) use classic::Classic;
pub(crate) use extended::Extended;

use dpak_ir::{Cell, Effect, Instrument, Note, Pattern, Sample, SampleLoop, SoundBank, VolumeCommand};
use tracing::debug;

use crate::container::{read_sample_table, MusicBank, SampleRecord};
use crate::effect_parser::parse_effect;
use crate::profile::{DriverProfile, DriverTable, DriverTag, Layout, UnknownTagPolicy};
use crate::reader::ByteReader;
use crate::scanner::Candidate;
use crate::{ConvertError, Diagnostic, DiagnosticKind};

/// Rows per pattern when the header does not say.
pub const DEFAULT_ROWS: u16 = 64;

/// One pattern cell as the driver stores it, before effect mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCell {
    pub note: Note,
    /// 1-based, 0 = none
    pub instrument: u8,
    /// Volume column (0-64); only the extended layout has one
    pub volume: Option<u8>,
    /// ProTracker command nibble
    pub effect: u8,
    pub param: u8,
}

/// Where a song's instruments come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstrumentSource {
    /// One instrument synthesized per sample
    PerSample,
    /// Instrument table at `offset` from the song start
    Table { offset: usize, count: u8 },
}

/// Decoded song header, common to every layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SongHeader {
    pub pattern_count: u8,
    pub channels: u8,
    pub rows: u16,
    pub speed: u8,
    pub tempo: u8,
    pub restart: u8,
    pub instruments: InstrumentSource,
}

/// One driver layout: header shape and cell codec.
pub(crate) trait Revision {
    /// Bytes before the order table
    const HEADER_LEN: usize;

    fn read_header(song: &[u8]) -> Result<SongHeader, ConvertError>;

    /// Unpack one 4-byte cell. The error names the impossible field.
    fn decode_cell(raw: [u8; 4]) -> Result<DriverCell, &'static str>;

    #[cfg(any(test, feature = "fixture"))]
    fn encode_cell(cell: &DriverCell) -> [u8; 4];
}

/// Note byte shared by both layouts: 0 none, 1-96 notes, 97 off.
pub(crate) fn decode_note(v: u8) -> Result<Note, &'static str> {
    match v {
        0 => Ok(Note::None),
        1..=96 => Ok(Note::On(v - 1)),
        97 => Ok(Note::Off),
        _ => Err("note out of range"),
    }
}

#[cfg(any(test, feature = "fixture"))]
pub(crate) fn encode_note(note: Note) -> u8 {
    match note {
        Note::None => 0,
        Note::On(n) => n.min(Note::COUNT - 1) + 1,
        Note::Off => 97,
    }
}

/// A parsed song plus everything recovered along the way.
#[derive(Debug, Clone)]
pub struct ParsedTrack {
    pub bank: SoundBank,
    pub tag: DriverTag,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse one candidate into a [`SoundBank`].
pub fn parse_track(
    rom: &[u8],
    candidate: &Candidate,
    drivers: &DriverTable,
) -> Result<ParsedTrack, ConvertError> {
    let chunk = rom.get(candidate.bank.clone()).ok_or(ConvertError::BufferTooShort {
        offset: candidate.bank.start,
        len: candidate.bank.len(),
        available: rom.len(),
    })?;
    let tag = DriverTag(ByteReader::at(chunk, candidate.offset).read_array()?);

    let mut diagnostics = Vec::new();
    let profile = match drivers.lookup(tag) {
        Some(p) if p.layout == Layout::Unsupported => {
            return Err(ConvertError::UnsupportedDriverVariant { tag })
        }
        Some(p) => p.clone(),
        None if drivers.unknown_tags == UnknownTagPolicy::Reject => {
            return Err(ConvertError::UnsupportedDriverVariant { tag })
        }
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnknownDriverTag,
                format!("song {}: unknown driver tag {}, assuming classic layout", candidate.song, tag),
            ));
            DriverProfile::new(tag, Layout::Classic, Default::default())
        }
    };
    debug!("song {} at {:#x}: {} {:?}", candidate.song, candidate.offset, tag, profile.layout);

    let mut parser = SongParser { chunk, candidate, profile: &profile, diagnostics };
    let bank = match profile.layout {
        Layout::Classic => parser.parse::<Classic>()?,
        Layout::Extended => parser.parse::<Extended>()?,
        Layout::Unsupported => return Err(ConvertError::UnsupportedDriverVariant { tag }),
    };
    Ok(ParsedTrack { bank, tag, diagnostics: parser.diagnostics })
}

struct SongParser<'a> {
    chunk: &'a [u8],
    candidate: &'a Candidate,
    profile: &'a DriverProfile,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SongParser<'a> {
    fn song(&self) -> &'a [u8] {
        &self.chunk[self.candidate.offset..]
    }

    fn parse<R: Revision>(&mut self) -> Result<SoundBank, ConvertError> {
        let header = R::read_header(self.song())?;
        if header.channels == 0 {
            return Err(ConvertError::MalformedHeader("song declares zero channels".into()));
        }
        if header.channels > self.profile.max_channels {
            return Err(ConvertError::MalformedHeader(format!(
                "{} channels, driver maximum is {}",
                header.channels, self.profile.max_channels
            )));
        }

        let title = format!("Torus Module {:02}", self.candidate.song);
        let mut bank = SoundBank::new(&title, header.channels);
        bank.initial_speed = header.speed;
        bank.initial_tempo = header.tempo;
        bank.restart_position = header.restart;

        let music = MusicBank::read(self.chunk)?;
        let records = read_sample_table(self.chunk, music.sample_table)?;
        let (order, data_start) = self.read_order(R::HEADER_LEN, header.pattern_count)?;
        let pattern_count = order.iter().max().map_or(0, |&p| p as usize + 1);
        bank.order = order;
        bank.patterns = self.read_patterns::<R>(data_start, pattern_count, &header)?;

        bank.instruments = match header.instruments {
            InstrumentSource::PerSample => synthesize_instruments(&bank.patterns, records.len())?,
            InstrumentSource::Table { offset, count } => {
                extended::read_instruments(self.song(), offset, count, records.len())?
            }
        };
        bank.samples = self.read_samples(&records, &bank.instruments)?;

        bank.validate()?;
        Ok(bank)
    }

    /// Decode every table entry. A payload outside the chunk fails the song
    /// only when some instrument maps that sample.
    fn read_samples(
        &mut self,
        records: &[SampleRecord],
        instruments: &[Instrument],
    ) -> Result<Vec<Sample>, ConvertError> {
        let mut mapped = vec![false; records.len()];
        for s in instruments.iter().flat_map(Instrument::referenced_samples) {
            if let Some(slot) = mapped.get_mut(s as usize) {
                *slot = true;
            }
        }

        let mut samples = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let mut sample = Sample::new(&format!("SAMPLE_{:02}", i));
            sample.volume = rec.volume.min(64);
            sample.finetune = self.profile.finetune(rec.pitch);
            sample.relative_note = self.profile.relative_note;
            match rec.payload(self.chunk) {
                Ok(raw) => sample.data = self.profile.pcm.to_signed(raw),
                Err(e) if mapped[i] => return Err(e),
                Err(_) => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::SampleOutOfBounds,
                        format!(
                            "sample {}: {} bytes at {:#x} lie outside the {}-byte bank, left empty",
                            i,
                            rec.len,
                            rec.start,
                            self.chunk.len()
                        ),
                    ));
                    samples.push(sample);
                    continue;
                }
            }
            if rec.loop_length > 0 {
                sample.looping = Some(SampleLoop { start: rec.loop_start, length: rec.loop_length });
            }
            if sample.clamp_loop() {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::LoopClamped,
                    format!(
                        "sample {}: loop {}+{} clamped to {}-byte payload",
                        i,
                        rec.loop_start,
                        rec.loop_length,
                        sample.len()
                    ),
                ));
            }
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Read the order list that follows the header.
    ///
    /// Returns the kept pattern indices and where pattern data starts.
    fn read_order(
        &mut self,
        header_len: usize,
        pattern_count: u8,
    ) -> Result<(Vec<u8>, usize), ConvertError> {
        let mut r = ByteReader::at(self.song(), header_len);
        let data_start = r.read_u8()? as usize;
        if data_start < header_len + 2 {
            return Err(ConvertError::MalformedHeader(format!(
                "order table ends at {:#x}, before its first entry",
                data_start
            )));
        }
        let entries = (data_start - header_len) / 2;
        r.seek(header_len);

        let mut order = Vec::with_capacity(entries);
        for position in 0..entries {
            let [_, raw] = r.read_array::<2>()?;
            let pattern = raw / 8;
            if pattern > pattern_count {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::OrderTruncated,
                    format!(
                        "order cut at position {} of {}: pattern {} past last declared pattern {}",
                        position, entries, pattern, pattern_count
                    ),
                ));
                break;
            }
            order.push(pattern);
        }
        if order.is_empty() {
            return Err(ConvertError::MalformedHeader("order list is empty".into()));
        }
        Ok((order, data_start))
    }

    fn read_patterns<R: Revision>(
        &mut self,
        start: usize,
        count: usize,
        header: &SongHeader,
    ) -> Result<Vec<Pattern>, ConvertError> {
        let mut r = ByteReader::at(self.song(), start);
        let mut patterns = Vec::with_capacity(count);
        for p in 0..count {
            let mut pattern = Pattern::new(header.rows, header.channels);
            for row in 0..header.rows {
                for channel in 0..header.channels {
                    let raw = r.read_array::<4>()?;
                    let dc = R::decode_cell(raw).map_err(|detail| ConvertError::MalformedPattern {
                        pattern: p,
                        row,
                        channel,
                        detail: detail.into(),
                    })?;
                    *pattern.cell_mut(row, channel) =
                        to_cell(dc, (p, row, channel), &mut self.diagnostics);
                }
            }
            patterns.push(pattern);
        }
        Ok(patterns)
    }
}

/// Map a driver cell into the model, replacing unsupported effects.
fn to_cell(dc: DriverCell, at: (usize, u16, u8), diagnostics: &mut Vec<Diagnostic>) -> Cell {
    let effect = parse_effect(dc.effect, dc.param).unwrap_or_else(|| {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnsupportedEffect,
            format!(
                "pattern {} row {} channel {}: effect {:X}{:02X} dropped",
                at.0, at.1, at.2, dc.effect, dc.param
            ),
        ));
        Effect::None
    });
    Cell {
        note: dc.note,
        instrument: dc.instrument,
        volume: dc.volume.map_or(VolumeCommand::None, VolumeCommand::Volume),
        effect,
    }
}

/// One instrument per sample, up to the highest instrument any cell plays.
fn synthesize_instruments(patterns: &[Pattern], samples: usize) -> Result<Vec<Instrument>, ConvertError> {
    let highest = patterns
        .iter()
        .flat_map(|p| p.events())
        .map(|(_, _, cell)| cell.instrument as usize)
        .max()
        .unwrap_or(0);
    if highest > samples {
        return Err(ConvertError::CorruptReference {
            what: "sample",
            index: highest - 1,
            count: samples,
        });
    }
    Ok((0..highest)
        .map(|i| {
            let mut inst = Instrument::new(&format!("INSTRUMENT_{:02}", i));
            inst.set_single_sample(i as u8);
            inst
        })
        .collect())
}
