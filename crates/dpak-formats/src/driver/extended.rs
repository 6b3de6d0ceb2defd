//! Extended layout: tempo fields, instrument table, bit-packed cells.
//!
//! Cell word (little-endian u32):
//!
//! | bits  | field                          |
//! |-------|--------------------------------|
//! | 0-6   | note (0 none, 1-96, 97 off)    |
//! | 7-12  | instrument                     |
//! | 13-19 | volume (0 none, 1-65 = 0-64)   |
//! | 20-23 | effect command                 |
//! | 24-31 | effect parameter               |

use binrw::BinRead;
use dpak_ir::{Envelope, Instrument, Note};

use super::{decode_note, DriverCell, InstrumentSource, Revision, SongHeader};
use crate::container::read_record;
use crate::reader::ByteReader;
use crate::ConvertError;

pub(crate) struct Extended;

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct ExtendedHeader {
    _tag: [u8; 4],
    pattern_count: u8,
    instrument_count: u8,
    channels: u8,
    speed: u8,
    tempo: u8,
    restart: u8,
    instrument_table: u16,
    #[br(pad_after = 3)]
    rows: u8,
}

impl Revision for Extended {
    const HEADER_LEN: usize = 16;

    fn read_header(song: &[u8]) -> Result<SongHeader, ConvertError> {
        let h: ExtendedHeader = read_record(song, 0, Self::HEADER_LEN)?;
        if h.speed == 0 || h.tempo == 0 {
            return Err(ConvertError::MalformedHeader(format!(
                "speed {} tempo {}",
                h.speed, h.tempo
            )));
        }
        Ok(SongHeader {
            pattern_count: h.pattern_count,
            channels: h.channels,
            rows: if h.rows == 0 { 256 } else { h.rows as u16 },
            speed: h.speed,
            tempo: h.tempo,
            restart: h.restart,
            instruments: InstrumentSource::Table {
                offset: h.instrument_table as usize,
                count: h.instrument_count,
            },
        })
    }

    fn decode_cell(raw: [u8; 4]) -> Result<DriverCell, &'static str> {
        let word = u32::from_le_bytes(raw);
        let volume = match (word >> 13) & 0x7F {
            0 => None,
            v @ 1..=65 => Some(v as u8 - 1),
            _ => return Err("volume out of range"),
        };
        Ok(DriverCell {
            note: decode_note((word & 0x7F) as u8)?,
            instrument: ((word >> 7) & 0x3F) as u8,
            volume,
            effect: ((word >> 20) & 0x0F) as u8,
            param: (word >> 24) as u8,
        })
    }

    #[cfg(any(test, feature = "fixture"))]
    fn encode_cell(cell: &DriverCell) -> [u8; 4] {
        let volume = cell.volume.map_or(0, |v| v.min(64) as u32 + 1);
        let word = super::encode_note(cell.note) as u32
            | (cell.instrument as u32 & 0x3F) << 7
            | volume << 13
            | (cell.effect as u32 & 0x0F) << 20
            | (cell.param as u32) << 24;
        word.to_le_bytes()
    }
}

const NO_SUSTAIN: u8 = 0xFF;

/// Read `count` instrument table entries starting at `offset` in the song.
pub(crate) fn read_instruments(
    song: &[u8],
    offset: usize,
    count: u8,
    samples: usize,
) -> Result<Vec<Instrument>, ConvertError> {
    let mut r = ByteReader::at(song, offset);
    (0..count as usize)
        .map(|i| read_instrument(&mut r, i, samples))
        .collect()
}

fn read_instrument(
    r: &mut ByteReader<'_>,
    index: usize,
    samples: usize,
) -> Result<Instrument, ConvertError> {
    let [ranges, vol_points, pan_points, sustain] = r.read_array()?;
    let fadeout = r.read_u16_le()?;
    r.skip(2)?;

    let mut inst = Instrument::new(&format!("INSTRUMENT_{:02}", index));
    inst.fadeout = fadeout;

    let mut first: u16 = 0;
    let mut last_sample = None;
    for _ in 0..ranges {
        let [last, sample] = r.read_array()?;
        if sample as usize >= samples {
            return Err(ConvertError::CorruptReference {
                what: "sample",
                index: sample as usize,
                count: samples,
            });
        }
        if first < Note::COUNT as u16 && last as u16 >= first {
            inst.map_range(first as u8, last, sample);
        }
        first = first.max(last as u16 + 1);
        last_sample = Some(sample);
    }
    if let Some(sample) = last_sample.filter(|_| first < Note::COUNT as u16) {
        inst.map_range(first as u8, Note::COUNT - 1, sample);
    }

    inst.volume_envelope = read_envelope(r, vol_points, sustain)?;
    inst.panning_envelope = read_envelope(r, pan_points, NO_SUSTAIN)?;
    Ok(inst)
}

fn read_envelope(
    r: &mut ByteReader<'_>,
    points: u8,
    sustain: u8,
) -> Result<Option<Envelope>, ConvertError> {
    if points as usize > Envelope::MAX_POINTS {
        return Err(ConvertError::LimitExceeded {
            what: "envelope point",
            count: points as usize,
            max: Envelope::MAX_POINTS,
        });
    }
    if points == 0 {
        return Ok(None);
    }
    let mut env = Envelope::new();
    for _ in 0..points {
        let tick = r.read_u16_le()?;
        let value = r.read_u8()?;
        r.skip(1)?;
        env.add_point(tick, value);
    }
    env.sustain = (sustain != NO_SUSTAIN && sustain < points).then_some(sustain);
    env.enabled = true;
    Ok(Some(env))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(rows: u8) -> Vec<u8> {
        let mut h = b"MV02".to_vec();
        h.extend_from_slice(&[3, 2, 8, 4, 150, 1]);
        h.extend_from_slice(&0x40u16.to_le_bytes());
        h.extend_from_slice(&[rows, 0, 0, 0]);
        h
    }

    #[test]
    fn header_fields() {
        let h = Extended::read_header(&header(32)).unwrap();
        assert_eq!(h.pattern_count, 3);
        assert_eq!(h.channels, 8);
        assert_eq!(h.rows, 32);
        assert_eq!((h.speed, h.tempo, h.restart), (4, 150, 1));
        assert_eq!(h.instruments, InstrumentSource::Table { offset: 0x40, count: 2 });
        assert_eq!(Extended::read_header(&header(0)).unwrap().rows, 256);
    }

    #[test]
    fn zero_speed_is_malformed() {
        let mut h = header(64);
        h[7] = 0;
        assert!(matches!(Extended::read_header(&h), Err(ConvertError::MalformedHeader(_))));
    }

    #[test]
    fn cell_bit_fields() {
        // note 49, instrument 5, volume 0x20, effect A, param 0x0F
        let word: u32 = 49 | 5 << 7 | (0x20 + 1) << 13 | 0xA << 20 | 0x0F << 24;
        let cell = Extended::decode_cell(word.to_le_bytes()).unwrap();
        assert_eq!(
            cell,
            DriverCell {
                note: Note::On(48),
                instrument: 5,
                volume: Some(0x20),
                effect: 0xA,
                param: 0x0F,
            }
        );
        assert_eq!(Extended::encode_cell(&cell), word.to_le_bytes());
    }

    #[test]
    fn volume_past_64_is_rejected() {
        let word: u32 = 66 << 13;
        assert_eq!(Extended::decode_cell(word.to_le_bytes()), Err("volume out of range"));
    }

    fn entry(ranges: &[(u8, u8)], vol: &[(u16, u8)], sustain: u8) -> Vec<u8> {
        let mut out = vec![ranges.len() as u8, vol.len() as u8, 0, sustain];
        out.extend_from_slice(&0x100u16.to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        for &(last, sample) in ranges {
            out.extend_from_slice(&[last, sample]);
        }
        for &(tick, value) in vol {
            out.extend_from_slice(&tick.to_le_bytes());
            out.extend_from_slice(&[value, 0]);
        }
        out
    }

    #[test]
    fn ranges_fill_key_map() {
        let data = entry(&[(47, 0), (59, 2)], &[(0, 64), (10, 32)], 1);
        let insts = read_instruments(&data, 0, 1, 4).unwrap();
        let inst = &insts[0];
        assert_eq!(inst.sample_map[0], Some(0));
        assert_eq!(inst.sample_map[47], Some(0));
        assert_eq!(inst.sample_map[48], Some(2));
        assert_eq!(inst.sample_map[95], Some(2));
        assert_eq!(inst.fadeout, 0x100);
        let env = inst.volume_envelope.as_ref().unwrap();
        assert_eq!(env.points.len(), 2);
        assert_eq!(env.sustain, Some(1));
        assert!(inst.panning_envelope.is_none());
    }

    #[test]
    fn sample_past_table_is_corrupt_reference() {
        let data = entry(&[(95, 99)], &[], NO_SUSTAIN);
        assert_eq!(
            read_instruments(&data, 0, 1, 4).unwrap_err(),
            ConvertError::CorruptReference { what: "sample", index: 99, count: 4 }
        );
    }

    #[test]
    fn too_many_envelope_points() {
        let points: Vec<(u16, u8)> = (0..13).map(|i| (i * 4, 32)).collect();
        let data = entry(&[], &points, NO_SUSTAIN);
        assert!(matches!(
            read_instruments(&data, 0, 1, 0),
            Err(ConvertError::LimitExceeded { count: 13, max: 12, .. })
        ));
    }
}
