//! ProTracker effect command mapping.
//!
//! The driver and XM share the ProTracker command set (command nibble plus
//! parameter byte), so both directions live here.

use dpak_ir::Effect;

/// Parse a ProTracker effect command.
///
/// Returns `None` for commands with no XM counterpart (E0x filter, EFx
/// invert loop).
pub fn parse_effect(cmd: u8, param: u8) -> Option<Effect> {
    let effect = match cmd & 0x0F {
        0x0 if param != 0 => Effect::Arpeggio {
            x: (param >> 4) & 0x0F,
            y: param & 0x0F,
        },
        0x0 => Effect::None,
        0x1 => Effect::PortaUp(param),
        0x2 => Effect::PortaDown(param),
        0x3 => Effect::TonePorta(param),
        0x4 => Effect::Vibrato {
            speed: (param >> 4) & 0x0F,
            depth: param & 0x0F,
        },
        0x5 => Effect::TonePortaVolSlide(param_to_slide(param)),
        0x6 => Effect::VibratoVolSlide(param_to_slide(param)),
        0x7 => Effect::Tremolo {
            speed: (param >> 4) & 0x0F,
            depth: param & 0x0F,
        },
        0x8 => Effect::SetPan(param),
        0x9 => Effect::SampleOffset(param),
        0xA => Effect::VolumeSlide(param_to_slide(param)),
        0xB => Effect::PositionJump(param),
        0xC => Effect::SetVolume(param.min(64)),
        0xD => Effect::PatternBreak(((param >> 4) * 10 + (param & 0x0F)).min(63)),
        0xE => return parse_extended_effect(param),
        _ => {
            if param < 32 {
                Effect::SetSpeed(param)
            } else {
                Effect::SetTempo(param)
            }
        }
    };
    Some(effect)
}

/// Parse extended effect (Exx).
pub fn parse_extended_effect(param: u8) -> Option<Effect> {
    let cmd = (param >> 4) & 0x0F;
    let val = param & 0x0F;

    let effect = match cmd {
        0x1 => Effect::FinePortaUp(val),
        0x2 => Effect::FinePortaDown(val),
        0x3 => Effect::Glissando(val),
        0x4 => Effect::SetVibratoWaveform(val),
        0x5 => Effect::SetFinetune(if val > 7 { val as i8 - 16 } else { val as i8 }),
        0x6 => Effect::PatternLoop(val),
        0x7 => Effect::SetTremoloWaveform(val),
        0x8 => Effect::SetPanPosition(val),
        0x9 => Effect::RetriggerNote(val),
        0xA => Effect::FineVolumeSlideUp(val),
        0xB => Effect::FineVolumeSlideDown(val),
        0xC => Effect::NoteCut(val),
        0xD => Effect::NoteDelay(val),
        0xE => Effect::PatternDelay(val),
        _ => return None,
    };
    Some(effect)
}

/// Convert volume slide parameter to signed value.
pub fn param_to_slide(param: u8) -> i8 {
    let up = (param >> 4) & 0x0F;
    let down = param & 0x0F;
    if up > 0 {
        up as i8
    } else {
        -(down as i8)
    }
}

fn slide_to_param(slide: i8) -> u8 {
    if slide > 0 {
        (slide.min(15) as u8) << 4
    } else {
        slide.unsigned_abs().min(15)
    }
}

/// Command nibble and parameter for an effect.
pub fn effect_command(effect: Effect) -> (u8, u8) {
    let nibbles = |hi: u8, lo: u8| (hi.min(15) << 4) | lo.min(15);
    let ext = |sub: u8, val: u8| (0xE, (sub << 4) | val.min(15));
    match effect {
        Effect::None => (0, 0),
        Effect::Arpeggio { x, y } => (0x0, nibbles(x, y)),
        Effect::PortaUp(v) => (0x1, v),
        Effect::PortaDown(v) => (0x2, v),
        Effect::TonePorta(v) => (0x3, v),
        Effect::Vibrato { speed, depth } => (0x4, nibbles(speed, depth)),
        Effect::TonePortaVolSlide(s) => (0x5, slide_to_param(s)),
        Effect::VibratoVolSlide(s) => (0x6, slide_to_param(s)),
        Effect::Tremolo { speed, depth } => (0x7, nibbles(speed, depth)),
        Effect::SetPan(v) => (0x8, v),
        Effect::SampleOffset(v) => (0x9, v),
        Effect::VolumeSlide(s) => (0xA, slide_to_param(s)),
        Effect::PositionJump(v) => (0xB, v),
        Effect::SetVolume(v) => (0xC, v.min(64)),
        Effect::PatternBreak(row) => {
            let row = row.min(63);
            (0xD, ((row / 10) << 4) | (row % 10))
        }
        Effect::FinePortaUp(v) => ext(0x1, v),
        Effect::FinePortaDown(v) => ext(0x2, v),
        Effect::Glissando(v) => ext(0x3, v),
        Effect::SetVibratoWaveform(v) => ext(0x4, v),
        Effect::SetFinetune(v) => (0xE, 0x50 | (v.clamp(-8, 7) as u8 & 0x0F)),
        Effect::PatternLoop(v) => ext(0x6, v),
        Effect::SetTremoloWaveform(v) => ext(0x7, v),
        Effect::SetPanPosition(v) => ext(0x8, v),
        Effect::RetriggerNote(v) => ext(0x9, v),
        Effect::FineVolumeSlideUp(v) => ext(0xA, v),
        Effect::FineVolumeSlideDown(v) => ext(0xB, v),
        Effect::NoteCut(v) => ext(0xC, v),
        Effect::NoteDelay(v) => ext(0xD, v),
        Effect::PatternDelay(v) => ext(0xE, v),
        Effect::SetSpeed(v) => (0xF, v),
        Effect::SetTempo(v) => (0xF, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_commands() {
        assert_eq!(parse_effect(0x0, 0x00), Some(Effect::None));
        assert_eq!(parse_effect(0x0, 0x37), Some(Effect::Arpeggio { x: 3, y: 7 }));
        assert_eq!(parse_effect(0xA, 0x04), Some(Effect::VolumeSlide(-4)));
        assert_eq!(parse_effect(0xC, 0x50), Some(Effect::SetVolume(64)));
        assert_eq!(parse_effect(0xD, 0x12), Some(Effect::PatternBreak(12)));
        assert_eq!(parse_effect(0xF, 0x06), Some(Effect::SetSpeed(6)));
        assert_eq!(parse_effect(0xF, 0x7D), Some(Effect::SetTempo(125)));
    }

    #[test]
    fn filter_and_invert_loop_are_unsupported() {
        assert_eq!(parse_effect(0xE, 0x01), None);
        assert_eq!(parse_effect(0xE, 0xF3), None);
        assert_eq!(parse_effect(0xE, 0x31), Some(Effect::Glissando(1)));
    }

    #[test]
    fn finetune_is_signed_nibble() {
        assert_eq!(parse_effect(0xE, 0x5F), Some(Effect::SetFinetune(-1)));
        assert_eq!(effect_command(Effect::SetFinetune(-1)), (0xE, 0x5F));
        assert_eq!(effect_command(Effect::SetFinetune(3)), (0xE, 0x53));
    }

    #[test]
    fn command_reparses_to_same_effect() {
        let effects = [
            Effect::Arpeggio { x: 1, y: 2 },
            Effect::PortaUp(0x20),
            Effect::Vibrato { speed: 4, depth: 8 },
            Effect::TonePortaVolSlide(-3),
            Effect::VibratoVolSlide(5),
            Effect::VolumeSlide(15),
            Effect::SetVolume(40),
            Effect::PatternBreak(48),
            Effect::NoteDelay(2),
            Effect::PatternDelay(1),
            Effect::SetSpeed(3),
            Effect::SetTempo(150),
        ];
        for e in effects {
            let (cmd, param) = effect_command(e);
            assert_eq!(parse_effect(cmd, param), Some(e), "{:?}", e);
        }
    }

    #[test]
    fn ambiguous_params_are_written_as_played() {
        // Both slide nibbles: the up nibble wins.
        assert_eq!(effect_command(parse_effect(0xA, 0x34).unwrap()), (0xA, 0x30));
        assert_eq!(effect_command(parse_effect(0x5, 0x0F).unwrap()), (0x5, 0x0F));
        // Non-decimal digits: the row the digits compute.
        assert_eq!(effect_command(parse_effect(0xD, 0x1F).unwrap()), (0xD, 0x25));
        assert_eq!(effect_command(parse_effect(0xD, 0xFF).unwrap()), (0xD, 0x63));
        assert_eq!(effect_command(parse_effect(0xC, 0x50).unwrap()), (0xC, 0x40));
    }

    #[test]
    fn commands_clamp_out_of_range_values() {
        assert_eq!(effect_command(Effect::SetVolume(200)), (0xC, 64));
        assert_eq!(effect_command(Effect::PatternBreak(99)), (0xD, 0x63));
    }
}
