//! Locate sound banks in a raw ROM image.
//!
//! The scanner searches for the `DPAK` magic at every byte offset and keeps
//! only containers whose chunk table and MUSC song table hold together.
//! Each song of each accepted bank becomes one [`Candidate`].

use std::collections::VecDeque;
use std::ops::Range;

use tracing::debug;

use crate::container::{is_music, read_chunks, MusicBank, DPAK_MAGIC};

/// One song inside one MUSC bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Offset of the owning DPAK header in the ROM
    pub container: usize,
    /// Extent of the MUSC chunk in the ROM
    pub bank: Range<usize>,
    /// Index of the song within the bank
    pub song: usize,
    /// Offset of the song header, relative to the bank
    pub offset: usize,
}

/// Scan `rom` for candidates, in ascending offset order.
pub fn scan(rom: &[u8]) -> Candidates<'_> {
    Candidates {
        rom,
        pos: 0,
        pending: VecDeque::new(),
    }
}

/// Lazy iterator returned by [`scan`].
pub struct Candidates<'a> {
    rom: &'a [u8],
    pos: usize,
    pending: VecDeque<Candidate>,
}

impl Candidates<'_> {
    /// Find the next DPAK magic at or after the cursor.
    fn next_container(&mut self) -> Option<usize> {
        let rest = self.rom.get(self.pos..)?;
        match rest.windows(DPAK_MAGIC.len()).position(|w| w == DPAK_MAGIC) {
            Some(i) => {
                let at = self.pos + i;
                self.pos = at + 1;
                Some(at)
            }
            None => {
                self.pos = self.rom.len();
                None
            }
        }
    }

    fn queue_container(&mut self, container: usize) {
        let chunks = match read_chunks(self.rom, container) {
            Ok(chunks) => chunks,
            Err(e) => {
                debug!("rejecting DPAK magic at {:#x}: {}", container, e);
                return;
            }
        };

        for bank in chunks {
            let chunk = &self.rom[bank.clone()];
            if !is_music(chunk) {
                continue;
            }
            match MusicBank::read(chunk) {
                Ok(music) => {
                    debug!(
                        "MUSC bank at {:#x} with {} songs",
                        bank.start,
                        music.songs.len()
                    );
                    self.pending.extend(music.songs.iter().enumerate().map(|(song, &offset)| {
                        Candidate { container, bank: bank.clone(), song, offset }
                    }));
                }
                Err(e) => debug!("rejecting MUSC chunk at {:#x}: {}", bank.start, e),
            }
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some(c) = self.pending.pop_front() {
                return Some(c);
            }
            let container = self.next_container()?;
            self.queue_container(container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{build_dpak, build_musc, place, SongSpec};

    fn bank(songs: usize) -> Vec<u8> {
        let specs: Vec<SongSpec> = (0..songs).map(|_| SongSpec::classic(1)).collect();
        build_dpak(&[build_musc(&specs, &[])])
    }

    #[test]
    fn empty_rom_has_no_candidates() {
        assert_eq!(scan(&[]).count(), 0);
        assert_eq!(scan(&[0u8; 4096]).count(), 0);
    }

    #[test]
    fn finds_bank_at_any_alignment() {
        let rom = place(0x1003, &bank(1), 0x2000);
        let found: Vec<_> = scan(&rom).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].container, 0x1003);
        assert_eq!(found[0].song, 0);
        assert!(rom[found[0].bank.clone()].starts_with(b"MUSC"));
    }

    #[test]
    fn one_candidate_per_song_in_offset_order() {
        let mut rom = place(0x100, &bank(2), 0x800);
        let second = bank(1);
        rom[0x600..0x600 + second.len()].copy_from_slice(&second);

        let found: Vec<_> = scan(&rom).map(|c| (c.container, c.song)).collect();
        assert_eq!(found, vec![(0x100, 0), (0x100, 1), (0x600, 0)]);
    }

    #[test]
    fn stray_magic_is_skipped() {
        let mut rom = vec![0u8; 0x400];
        rom[0x10..0x14].copy_from_slice(b"DPAK");
        rom[0x14] = 0xFF; // 255 entries cannot fit
        let bank = bank(1);
        rom[0x200..0x200 + bank.len()].copy_from_slice(&bank);
        let found: Vec<_> = scan(&rom).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].container, 0x200);
    }

    #[test]
    fn truncated_container_is_skipped() {
        let bank = bank(1);
        let rom = &bank[..bank.len() - 1];
        assert_eq!(scan(rom).count(), 0);
    }
}
