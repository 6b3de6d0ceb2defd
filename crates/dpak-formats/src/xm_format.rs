//! FastTracker 2 XM writer.
//!
//! Serializes a [`SoundBank`] as an XM 1.04 module: preheader and header,
//! packed patterns, then one instrument block per instrument with its
//! sample headers and delta-encoded PCM.

use std::borrow::Cow;

use dpak_ir::{Cell, Envelope, Instrument, Note, Pattern, Sample, SoundBank, VolumeCommand};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::effect_parser::effect_command;
use crate::{ConvertError, Diagnostic, DiagnosticKind};

pub const XM_MAGIC: &[u8; 17] = b"Extended Module: ";
pub const XM_VERSION: u16 = 0x0104;
/// Header size field: counts itself through the end of the order table
pub const XM_HEADER_LEN: u32 = 276;
pub const XM_NOTE_OFF: u8 = 97;

const PATTERN_HEADER_LEN: u32 = 9;
const INSTRUMENT_HEADER_LEN: u32 = 243;
const INSTRUMENT_HEADER_LEN_EMPTY: u32 = 29;
const SAMPLE_HEADER_LEN: u32 = 40;

const MAX_CHANNELS: usize = 32;
const MAX_PATTERNS: usize = 256;
const MAX_INSTRUMENTS: usize = 128;
const MAX_INSTRUMENT_SAMPLES: usize = 16;
const MAX_ORDER: usize = 256;
const MAX_ROWS: usize = 256;

/// What to do with a sample over [`XmOptions::max_sample_len`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OversizePolicy {
    /// Fail the track with `SampleTooLarge`
    #[default]
    Reject,
    /// Cut the payload and clamp its loop
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmOptions {
    /// Largest sample payload written, in bytes
    pub max_sample_len: usize,
    pub oversize: OversizePolicy,
    pub tracker_name: String,
}

impl Default for XmOptions {
    fn default() -> Self {
        Self {
            max_sample_len: 1 << 20,
            oversize: OversizePolicy::Reject,
            tracker_name: "dpak-rip".into(),
        }
    }
}

/// A written module.
#[derive(Debug, Clone)]
pub struct XmOutput {
    pub bytes: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Serialize `bank` as an XM module.
pub fn write_xm(bank: &SoundBank, options: &XmOptions) -> Result<XmOutput, ConvertError> {
    check_limits(bank)?;
    bank.validate()?;

    let mut diagnostics = Vec::new();
    let samples = prepare_samples(bank, options, &mut diagnostics)?;

    let mut out = Vec::new();
    write_header(&mut out, bank, &options.tracker_name);
    for pattern in &bank.patterns {
        write_pattern(&mut out, pattern);
    }
    for inst in &bank.instruments {
        write_instrument(&mut out, inst, &samples);
    }

    info!(
        "wrote {:?}: {} patterns, {} instruments, {} bytes",
        bank.title.as_str(),
        bank.patterns.len(),
        bank.instruments.len(),
        out.len()
    );
    Ok(XmOutput { bytes: out, diagnostics })
}

fn limit(what: &'static str, count: usize, max: usize) -> Result<(), ConvertError> {
    if count > max {
        Err(ConvertError::LimitExceeded { what, count, max })
    } else {
        Ok(())
    }
}

fn check_limits(bank: &SoundBank) -> Result<(), ConvertError> {
    limit("channel", bank.channels as usize, MAX_CHANNELS)?;
    limit("pattern", bank.patterns.len(), MAX_PATTERNS)?;
    limit("instrument", bank.instruments.len(), MAX_INSTRUMENTS)?;
    limit("order entry", bank.order.len(), MAX_ORDER)?;
    for pattern in &bank.patterns {
        if pattern.rows == 0 {
            return Err(ConvertError::LimitExceeded { what: "row", count: 0, max: MAX_ROWS });
        }
        limit("row", pattern.rows as usize, MAX_ROWS)?;
    }
    for inst in &bank.instruments {
        limit("instrument sample", inst.referenced_samples().len(), MAX_INSTRUMENT_SAMPLES)?;
        for env in inst.volume_envelope.iter().chain(&inst.panning_envelope) {
            limit("envelope point", env.points.len(), Envelope::MAX_POINTS)?;
        }
    }
    Ok(())
}

/// Apply the size limit to every sample an instrument embeds.
fn prepare_samples<'a>(
    bank: &'a SoundBank,
    options: &XmOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<Cow<'a, Sample>>, ConvertError> {
    let mut embedded = vec![false; bank.samples.len()];
    for s in bank.instruments.iter().flat_map(Instrument::referenced_samples) {
        embedded[s as usize] = true;
    }

    let mut samples = Vec::with_capacity(bank.samples.len());
    for (index, sample) in bank.samples.iter().enumerate() {
        if !embedded[index] || sample.len() <= options.max_sample_len {
            samples.push(Cow::Borrowed(sample));
            continue;
        }
        match options.oversize {
            OversizePolicy::Reject => {
                return Err(ConvertError::SampleTooLarge {
                    index,
                    len: sample.len(),
                    limit: options.max_sample_len,
                })
            }
            OversizePolicy::Truncate => {
                let mut cut = sample.clone();
                cut.truncate(options.max_sample_len);
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::SampleTruncated,
                    format!(
                        "sample {}: {} bytes cut to {}",
                        index,
                        sample.len(),
                        options.max_sample_len
                    ),
                ));
                samples.push(Cow::Owned(cut));
            }
        }
    }
    Ok(samples)
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Null-padded fixed-width text field.
fn put_str(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + width - n, 0);
}

fn write_header(out: &mut Vec<u8>, bank: &SoundBank, tracker_name: &str) {
    out.extend_from_slice(XM_MAGIC);
    put_str(out, &bank.title, 20);
    out.push(0x1A);
    put_str(out, tracker_name, 20);
    put_u16(out, XM_VERSION);

    put_u32(out, XM_HEADER_LEN);
    put_u16(out, bank.order.len() as u16);
    put_u16(out, bank.restart_position as u16);
    put_u16(out, bank.channels as u16);
    put_u16(out, bank.patterns.len() as u16);
    put_u16(out, bank.instruments.len() as u16);
    // Linear frequency table
    put_u16(out, 1);
    put_u16(out, bank.initial_speed as u16);
    put_u16(out, bank.initial_tempo as u16);

    let mut order = [0u8; MAX_ORDER];
    order[..bank.order.len()].copy_from_slice(&bank.order);
    out.extend_from_slice(&order);
}

fn write_pattern(out: &mut Vec<u8>, pattern: &Pattern) {
    let packed = pack_pattern(pattern);
    put_u32(out, PATTERN_HEADER_LEN);
    out.push(0);
    put_u16(out, pattern.rows);
    put_u16(out, packed.len() as u16);
    out.extend_from_slice(&packed);
}

/// The five XM column bytes of a cell: note, instrument, volume, effect, param.
fn cell_fields(cell: &Cell) -> [u8; 5] {
    let note = match cell.note {
        Note::None => 0,
        Note::On(n) => n + 1,
        Note::Off => XM_NOTE_OFF,
    };
    let volume = match cell.volume {
        VolumeCommand::None => 0,
        VolumeCommand::Volume(v) => 0x10 + v.min(64),
        VolumeCommand::VolumeSlideDown(v) => 0x60 | v.min(15),
        VolumeCommand::VolumeSlideUp(v) => 0x70 | v.min(15),
        VolumeCommand::Panning(v) => 0xC0 | v.min(15),
    };
    let (effect, param) = effect_command(cell.effect);
    [note, cell.instrument, volume, effect, param]
}

/// Pack a pattern with XM's flag-byte compression.
///
/// A cell with every column set is written as five raw bytes. Any other
/// cell gets a flag byte (0x80 | present columns) followed by the present
/// columns, so an empty cell costs one byte.
pub fn pack_pattern(pattern: &Pattern) -> Vec<u8> {
    let mut out = Vec::with_capacity(pattern.data.len());
    for cell in &pattern.data {
        let fields = cell_fields(cell);
        if fields.iter().all(|&f| f != 0) {
            out.extend_from_slice(&fields);
            continue;
        }
        let mut flags = 0x80u8;
        for (bit, &f) in fields.iter().enumerate() {
            if f != 0 {
                flags |= 1 << bit;
            }
        }
        out.push(flags);
        out.extend(fields.iter().copied().filter(|&f| f != 0));
    }
    out
}

fn envelope_flags(env: &Envelope) -> u8 {
    let mut flags = 0;
    if env.enabled && !env.points.is_empty() {
        flags |= 1;
    }
    if env.sustain.is_some() {
        flags |= 2;
    }
    if env.loop_start.is_some() && env.loop_end.is_some() {
        flags |= 4;
    }
    flags
}

fn write_envelope_points(out: &mut Vec<u8>, env: Option<&Envelope>) {
    let points = env.map_or(&[][..], |e| &e.points[..]);
    for i in 0..Envelope::MAX_POINTS {
        match points.get(i) {
            Some(p) => {
                put_u16(out, p.tick);
                put_u16(out, p.value.min(64) as u16);
            }
            None => put_u32(out, 0),
        }
    }
}

fn write_instrument(out: &mut Vec<u8>, inst: &Instrument, samples: &[Cow<'_, Sample>]) {
    let local = inst.referenced_samples();
    let header_len = if local.is_empty() {
        INSTRUMENT_HEADER_LEN_EMPTY
    } else {
        INSTRUMENT_HEADER_LEN
    };
    put_u32(out, header_len);
    put_str(out, &inst.name, 22);
    out.push(0);
    put_u16(out, local.len() as u16);
    if local.is_empty() {
        return;
    }

    put_u32(out, SAMPLE_HEADER_LEN);
    for slot in &inst.sample_map {
        let idx = slot.and_then(|g| local.binary_search(&g).ok()).unwrap_or(0);
        out.push(idx as u8);
    }

    let vol = inst.volume_envelope.as_ref();
    let pan = inst.panning_envelope.as_ref();
    write_envelope_points(out, vol);
    write_envelope_points(out, pan);
    for env in [vol, pan] {
        out.push(env.map_or(0, |e| e.points.len() as u8));
    }
    for env in [vol, pan] {
        out.push(env.and_then(|e| e.sustain).unwrap_or(0));
        out.push(env.and_then(|e| e.loop_start).unwrap_or(0));
        out.push(env.and_then(|e| e.loop_end).unwrap_or(0));
    }
    for env in [vol, pan] {
        out.push(env.map_or(0, envelope_flags));
    }
    // Vibrato type, sweep, depth, rate
    out.extend_from_slice(&[0; 4]);
    put_u16(out, inst.fadeout);
    put_u16(out, 0);

    let embedded: Vec<&Sample> = local.iter().map(|&g| samples[g as usize].as_ref()).collect();
    for s in &embedded {
        write_sample_header(out, s);
    }
    for s in &embedded {
        out.extend_from_slice(&delta_encode(&s.data));
    }
}

fn write_sample_header(out: &mut Vec<u8>, s: &Sample) {
    let (start, length) = s
        .looping
        .filter(|l| l.length > 0)
        .map_or((0, 0), |l| (l.start, l.length));
    put_u32(out, s.len() as u32);
    put_u32(out, start);
    put_u32(out, length);
    out.push(s.volume.min(64));
    out.push(s.finetune as u8);
    // Forward loop, 8-bit
    out.push(if length > 0 { 1 } else { 0 });
    out.push(s.panning);
    out.push(s.relative_note as u8);
    out.push(0);
    put_str(out, &s.name, 22);
}

/// Delta-encode signed PCM the way XM stores it.
pub fn delta_encode(pcm: &[i8]) -> Vec<u8> {
    let mut prev = 0i8;
    pcm.iter()
        .map(|&s| {
            let d = s.wrapping_sub(prev);
            prev = s;
            d as u8
        })
        .collect()
}

/// Inverse of [`delta_encode`].
pub fn delta_decode(deltas: &[u8]) -> Vec<i8> {
    let mut acc = 0i8;
    deltas
        .iter()
        .map(|&d| {
            acc = acc.wrapping_add(d as i8);
            acc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpak_ir::{Effect, SampleLoop};

    fn bank() -> SoundBank {
        let mut bank = SoundBank::new("test", 2);
        let mut sample = Sample::new("s");
        sample.data = vec![0, 10, -10, 127, -128];
        bank.samples.push(sample);
        let mut inst = Instrument::new("i");
        inst.set_single_sample(0);
        bank.instruments.push(inst);
        bank.patterns.push(Pattern::new(4, 2));
        bank.order.push(0);
        bank
    }

    #[test]
    fn header_layout() {
        let xm = write_xm(&bank(), &XmOptions::default()).unwrap().bytes;
        assert_eq!(&xm[..17], XM_MAGIC);
        assert_eq!(&xm[17..21], b"test");
        assert_eq!(xm[37], 0x1A);
        assert_eq!(&xm[38..46], b"dpak-rip");
        assert_eq!(u16::from_le_bytes([xm[58], xm[59]]), XM_VERSION);
        assert_eq!(u32::from_le_bytes([xm[60], xm[61], xm[62], xm[63]]), XM_HEADER_LEN);
        // Song length, restart, channels, patterns, instruments
        assert_eq!(&xm[64..74], &[1, 0, 0, 0, 2, 0, 1, 0, 1, 0]);
        // First pattern header sits right after the order table
        assert_eq!(&xm[336..341], &[9, 0, 0, 0, 0]);
    }

    #[test]
    fn empty_cells_pack_to_one_byte() {
        let packed = pack_pattern(&Pattern::new(4, 2));
        assert_eq!(packed, vec![0x80; 8]);
    }

    #[test]
    fn full_cell_is_written_raw() {
        let mut p = Pattern::new(1, 1);
        *p.cell_mut(0, 0) = Cell {
            note: Note::On(48),
            instrument: 1,
            volume: VolumeCommand::Volume(32),
            effect: Effect::SetVolume(20),
        };
        assert_eq!(pack_pattern(&p), vec![49, 1, 0x30, 0xC, 20]);
    }

    #[test]
    fn partial_cell_gets_flag_byte() {
        let mut p = Pattern::new(1, 1);
        p.cell_mut(0, 0).note = Note::Off;
        p.cell_mut(0, 0).effect = Effect::SetSpeed(3);
        assert_eq!(pack_pattern(&p), vec![0x80 | 0x01 | 0x08 | 0x10, XM_NOTE_OFF, 0xF, 3]);
    }

    #[test]
    fn volumes_are_clamped() {
        let mut p = Pattern::new(1, 1);
        p.cell_mut(0, 0).volume = VolumeCommand::Volume(200);
        assert_eq!(pack_pattern(&p), vec![0x80 | 0x04, 0x50]);
    }

    #[test]
    fn delta_codec() {
        let pcm = vec![0, 10, -10, 127, -128, 0];
        let deltas = delta_encode(&pcm);
        assert_eq!(deltas, vec![0, 10, 236, 137, 1, 128]);
        assert_eq!(delta_decode(&deltas), pcm);
    }

    #[test]
    fn oversize_sample_rejected_by_default() {
        let options = XmOptions { max_sample_len: 4, ..Default::default() };
        assert_eq!(
            write_xm(&bank(), &options).unwrap_err(),
            ConvertError::SampleTooLarge { index: 0, len: 5, limit: 4 }
        );
    }

    #[test]
    fn oversize_sample_truncated_on_request() {
        let mut bank = bank();
        bank.samples[0].looping = Some(SampleLoop { start: 1, length: 4 });
        let options = XmOptions {
            max_sample_len: 3,
            oversize: OversizePolicy::Truncate,
            ..Default::default()
        };
        let out = write_xm(&bank, &options).unwrap();
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::SampleTruncated);

        // Last sample header, then 3 bytes of PCM.
        let header = out.bytes.len() - 3 - 40;
        let field = |at: usize| {
            u32::from_le_bytes(out.bytes[header + at..header + at + 4].try_into().unwrap())
        };
        assert_eq!((field(0), field(4), field(8)), (3, 1, 2));
    }

    #[test]
    fn unreferenced_oversize_sample_is_ignored() {
        let mut bank = bank();
        let mut big = Sample::new("big");
        big.data = vec![0; 64];
        bank.samples.push(big);
        let options = XmOptions { max_sample_len: 8, ..Default::default() };
        assert!(write_xm(&bank, &options).is_ok());
    }

    #[test]
    fn too_many_channels() {
        let mut bank = bank();
        bank.channels = 33;
        bank.patterns = vec![Pattern::new(4, 33)];
        assert_eq!(
            write_xm(&bank, &XmOptions::default()).unwrap_err(),
            ConvertError::LimitExceeded { what: "channel", count: 33, max: 32 }
        );
    }

    #[test]
    fn instrument_without_samples_has_short_header() {
        let mut bank = bank();
        bank.instruments.push(Instrument::new("empty"));
        let xm = write_xm(&bank, &XmOptions::default()).unwrap().bytes;
        let tail = &xm[xm.len() - 29..];
        assert_eq!(&tail[..4], &29u32.to_le_bytes());
        assert_eq!(&tail[4..9], b"empty");
        assert_eq!(&tail[27..29], &[0, 0]);
    }
}
