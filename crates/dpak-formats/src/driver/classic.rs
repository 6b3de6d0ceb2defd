//! Classic layout: 8-byte header, byte-aligned cells.

use super::{decode_note, DriverCell, InstrumentSource, Revision, SongHeader, DEFAULT_ROWS};
use crate::reader::ByteReader;
use crate::ConvertError;

pub(crate) struct Classic;

impl Revision for Classic {
    const HEADER_LEN: usize = 8;

    fn read_header(song: &[u8]) -> Result<SongHeader, ConvertError> {
        let mut r = ByteReader::new(song);
        r.skip(4)?;
        let [pattern_count, _unknown, channels, _pad] = r.read_array()?;
        Ok(SongHeader {
            pattern_count,
            channels,
            rows: DEFAULT_ROWS,
            speed: 6,
            tempo: 125,
            restart: 0,
            instruments: InstrumentSource::PerSample,
        })
    }

    /// Effect byte (high nibble), instrument, note, parameter.
    fn decode_cell(raw: [u8; 4]) -> Result<DriverCell, &'static str> {
        let [effect, instrument, note, param] = raw;
        Ok(DriverCell {
            note: decode_note(note)?,
            instrument,
            volume: None,
            effect: effect >> 4,
            param,
        })
    }

    #[cfg(any(test, feature = "fixture"))]
    fn encode_cell(cell: &DriverCell) -> [u8; 4] {
        [cell.effect << 4, cell.instrument, super::encode_note(cell.note), cell.param]
    }
}
