//! Pattern commands shared by the driver and XM.

/// XM volume column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeCommand {
    #[default]
    None,
    /// 0-64
    Volume(u8),
    VolumeSlideDown(u8),
    VolumeSlideUp(u8),
    /// 0-15
    Panning(u8),
}

/// Effect column, one variant per ProTracker command.
///
/// The driver plays the classic ProTracker set; `E0x` (filter) and `EFx`
/// (invert loop) have no variant and are dropped by the parser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,
    /// `0xy`
    Arpeggio { x: u8, y: u8 },
    /// `1xx`
    PortaUp(u8),
    /// `2xx`
    PortaDown(u8),
    /// `3xx`
    TonePorta(u8),
    /// `4xy`
    Vibrato { speed: u8, depth: u8 },
    /// `5xy`, signed slide (up positive)
    TonePortaVolSlide(i8),
    /// `6xy`, signed slide
    VibratoVolSlide(i8),
    /// `7xy`
    Tremolo { speed: u8, depth: u8 },
    /// `8xx`, 0-255
    SetPan(u8),
    /// `9xx`, in 256-byte steps
    SampleOffset(u8),
    /// `Axy`, signed slide
    VolumeSlide(i8),
    /// `Bxx`
    PositionJump(u8),
    /// `Cxx`, 0-64
    SetVolume(u8),
    /// `Dxx`, target row (stored as decimal digits)
    PatternBreak(u8),
    /// `E1x`
    FinePortaUp(u8),
    /// `E2x`
    FinePortaDown(u8),
    /// `E3x`
    Glissando(u8),
    /// `E4x`
    SetVibratoWaveform(u8),
    /// `E5x`, -8 to 7
    SetFinetune(i8),
    /// `E6x`
    PatternLoop(u8),
    /// `E7x`
    SetTremoloWaveform(u8),
    /// `E8x`
    SetPanPosition(u8),
    /// `E9x`
    RetriggerNote(u8),
    /// `EAx`
    FineVolumeSlideUp(u8),
    /// `EBx`
    FineVolumeSlideDown(u8),
    /// `ECx`
    NoteCut(u8),
    /// `EDx`
    NoteDelay(u8),
    /// `EEx`
    PatternDelay(u8),
    /// `Fxx` below 0x20
    SetSpeed(u8),
    /// `Fxx` from 0x20
    SetTempo(u8),
}
