//! DPAK container and MUSC chunk structures.

use std::io::Cursor;
use std::ops::Range;

use binrw::{BinRead, Endian};

use crate::reader::{i24_from_le, ByteReader};
use crate::ConvertError;

pub(crate) const DPAK_MAGIC: &[u8; 4] = b"DPAK";
pub(crate) const MUSC_MAGIC: &[u8; 4] = b"MUSC";

pub(crate) const DPAK_HEADER_LEN: usize = 16;
pub(crate) const DPAK_ENTRY_LEN: usize = 16;
pub(crate) const MUSC_HEADER_LEN: usize = 12;
pub(crate) const SAMPLE_ENTRY_LEN: usize = 12;

/// Most entries a DPAK table or song table may hold.
pub(crate) const MAX_ENTRIES: usize = 256;
pub(crate) const MAX_SAMPLES: usize = 256;

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little, magic = b"DPAK")]
pub(crate) struct DpakHeader {
    /// Followed by the producer string
    #[br(pad_after = 10)]
    pub entry_count: u16,
}

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
pub(crate) struct DpakEntry {
    pub kind: u32,
    /// Relative to the DPAK header
    pub offset: u32,
    #[br(pad_after = 4)]
    pub size: u32,
}

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little, magic = b"MUSC")]
pub(crate) struct MuscHeader {
    pub song_table: u32,
    pub sample_table: u32,
}

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
pub(crate) struct RawSampleEntry {
    /// Signed, relative to the end of this field
    #[br(pad_before = 1)]
    pub pointer: [u8; 3],
    pub length_words: u16,
    pub pitch: u8,
    pub volume: u8,
    pub loop_start_words: u16,
    pub loop_length_words: u16,
}

/// Read a fixed-size record at `offset` after checking it fits.
pub(crate) fn read_record<T>(data: &[u8], offset: usize, len: usize) -> Result<T, ConvertError>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    ByteReader::at(data, offset).need(len)?;
    let mut cursor = Cursor::new(&data[offset..offset + len]);
    T::read_options(&mut cursor, Endian::Little, ())
        .map_err(|e| ConvertError::MalformedHeader(format!("record at {:#x}: {}", offset, e)))
}

/// Chunk extents of the DPAK container at `offset`, relative to `data`.
pub(crate) fn read_chunks(data: &[u8], offset: usize) -> Result<Vec<Range<usize>>, ConvertError> {
    let header: DpakHeader = read_record(data, offset, DPAK_HEADER_LEN)?;
    let count = header.entry_count as usize;
    if count == 0 || count > MAX_ENTRIES {
        return Err(ConvertError::MalformedHeader(format!(
            "DPAK entry count {} outside 1..={}",
            count, MAX_ENTRIES
        )));
    }

    (0..count)
        .map(|i| {
            let at = offset + DPAK_HEADER_LEN + i * DPAK_ENTRY_LEN;
            let entry: DpakEntry = read_record(data, at, DPAK_ENTRY_LEN)?;
            let start = offset + entry.offset as usize;
            ByteReader::at(data, start).need(entry.size as usize)?;
            Ok(start..start + entry.size as usize)
        })
        .collect()
}

/// Whether a chunk holds music.
pub(crate) fn is_music(chunk: &[u8]) -> bool {
    chunk.starts_with(MUSC_MAGIC)
}

/// A MUSC chunk with its song table resolved.
#[derive(Debug, Clone)]
pub(crate) struct MusicBank {
    pub sample_table: usize,
    /// Song offsets relative to the chunk
    pub songs: Vec<usize>,
}

impl MusicBank {
    pub(crate) fn read(chunk: &[u8]) -> Result<Self, ConvertError> {
        let header: MuscHeader = read_record(chunk, 0, MUSC_HEADER_LEN)?;
        let song_table = header.song_table as usize;
        let sample_table = header.sample_table as usize;

        let mut r = ByteReader::at(chunk, song_table);
        let count = r.read_u32_le()? as usize;
        if count == 0 || count > MAX_ENTRIES {
            return Err(ConvertError::MalformedHeader(format!(
                "song count {} outside 1..={}",
                count, MAX_ENTRIES
            )));
        }
        let mut songs = Vec::with_capacity(count);
        for _ in 0..count {
            let song = song_table + r.read_u32_le()? as usize;
            if song >= chunk.len() {
                return Err(ConvertError::BufferTooShort {
                    offset: song,
                    len: 1,
                    available: chunk.len(),
                });
            }
            songs.push(song);
        }

        ByteReader::at(chunk, sample_table).need(4)?;
        Ok(Self { sample_table, songs })
    }
}

/// One decoded sample table entry, in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SampleRecord {
    /// Payload offset within the chunk; pointers before the chunk clamp to 0
    pub start: usize,
    pub len: usize,
    pub pitch: u8,
    pub volume: u8,
    pub loop_start: u32,
    pub loop_length: u32,
}

impl SampleRecord {
    /// The payload bytes, if they lie inside `chunk`.
    pub(crate) fn payload<'c>(&self, chunk: &'c [u8]) -> Result<&'c [u8], ConvertError> {
        ByteReader::at(chunk, self.start).read_bytes(self.len)
    }
}

/// Walk the sample table until the chunk ends or the table is full.
///
/// Entries are kept even when their payload falls outside the chunk; the
/// table has no terminator, so trailing bytes read as entries too.
pub(crate) fn read_sample_table(
    chunk: &[u8],
    table: usize,
) -> Result<Vec<SampleRecord>, ConvertError> {
    // Leading word is unused by the driver.
    let mut pos = table + 4;
    let mut records = Vec::new();
    while records.len() < MAX_SAMPLES && pos + SAMPLE_ENTRY_LEN <= chunk.len() {
        let raw: RawSampleEntry = read_record(chunk, pos, SAMPLE_ENTRY_LEN)?;
        let start = (pos + 4) as i64 + i24_from_le(raw.pointer) as i64;
        records.push(SampleRecord {
            start: start.max(0) as usize,
            len: raw.length_words as usize * 2,
            pitch: raw.pitch,
            volume: raw.volume,
            loop_start: raw.loop_start_words as u32 * 2,
            loop_length: raw.loop_length_words as u32 * 2,
        });
        pos += SAMPLE_ENTRY_LEN;
    }
    Ok(records)
}
