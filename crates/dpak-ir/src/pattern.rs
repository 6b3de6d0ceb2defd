//! Pattern grid and its cells.

use alloc::vec::Vec;

use crate::effects::{Effect, VolumeCommand};

/// Note column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    #[default]
    None,
    /// Semitone index, 0 = C-0, 48 = C-4
    On(u8),
    /// Key release
    Off,
}

impl Note {
    /// Playable notes, eight octaves.
    pub const COUNT: u8 = 96;

    pub const fn is_valid(self) -> bool {
        match self {
            Note::On(n) => n < Self::COUNT,
            _ => true,
        }
    }
}

/// One channel of one row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub note: Note,
    /// 1-based, 0 = none
    pub instrument: u8,
    pub volume: VolumeCommand,
    pub effect: Effect,
}

impl Cell {
    pub const fn empty() -> Self {
        Self {
            note: Note::None,
            instrument: 0,
            volume: VolumeCommand::None,
            effect: Effect::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Zero-based instrument index, if the cell names one.
    pub fn instrument_index(&self) -> Option<usize> {
        (self.instrument != 0).then(|| self.instrument as usize - 1)
    }
}

/// `rows` x `channels` cells, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// 1-256
    pub rows: u16,
    pub channels: u8,
    pub data: Vec<Cell>,
}

impl Pattern {
    pub const MAX_ROWS: u16 = 256;

    pub fn new(rows: u16, channels: u8) -> Self {
        Self {
            rows,
            channels,
            data: alloc::vec![Cell::empty(); rows as usize * channels as usize],
        }
    }

    fn index(&self, row: u16, channel: u8) -> usize {
        debug_assert!(row < self.rows && channel < self.channels);
        row as usize * self.channels as usize + channel as usize
    }

    pub fn cell(&self, row: u16, channel: u8) -> &Cell {
        &self.data[self.index(row, channel)]
    }

    pub fn cell_mut(&mut self, row: u16, channel: u8) -> &mut Cell {
        let i = self.index(row, channel);
        &mut self.data[i]
    }

    /// Every non-empty cell with its (row, channel) position.
    pub fn events(&self) -> impl Iterator<Item = (u16, u8, &Cell)> + '_ {
        let channels = self.channels.max(1) as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(move |(i, cell)| ((i / channels) as u16, (i % channels) as u8, cell))
    }
}
