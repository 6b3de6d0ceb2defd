//! Driver revision table.
//!
//! Every song starts with a 4-byte tag naming the driver revision that
//! wrote it. The table maps tags to a cell layout plus the constants needed
//! to normalise samples (PCM sign, finetune scale, relative note). It is
//! plain data so new revisions can be described from a config file.

use core::fmt;

use dpak_ir::PcmEncoding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Four-byte driver revision tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriverTag(pub [u8; 4]);

impl DriverTag {
    pub const MV01: DriverTag = DriverTag(*b"MV01");
    pub const MV02: DriverTag = DriverTag(*b"MV02");
    pub const MVX1: DriverTag = DriverTag(*b"MVX1");

    fn is_printable(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_graphic())
    }
}

impl fmt::Display for DriverTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08X}", u32::from_be_bytes(self.0))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver tag {0:?} is neither 4 ASCII characters nor 0x-prefixed hex")]
pub struct TagParseError(String);

impl TryFrom<String> for DriverTag {
    type Error = TagParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl core::str::FromStr for DriverTag {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex) = s.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16)
                .ok()
                .filter(|_| hex.len() == 8)
                .map(|v| DriverTag(v.to_be_bytes()))
                .ok_or_else(|| TagParseError(s.to_owned()));
        }
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| TagParseError(s.to_owned()))?;
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            Ok(DriverTag(bytes))
        } else {
            Err(TagParseError(s.to_owned()))
        }
    }
}

impl From<DriverTag> for String {
    fn from(tag: DriverTag) -> Self {
        tag.to_string()
    }
}

/// Song layout a revision uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// 8-byte header, fixed 64 rows, one instrument per sample, byte cells
    Classic,
    /// 16-byte header with tempo and instrument table, bit-packed cells
    Extended,
    /// Known revision that cannot be converted
    Unsupported,
}

/// How one driver revision is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub tag: DriverTag,
    pub layout: Layout,
    #[serde(default)]
    pub pcm: PcmEncoding,
    /// Multiplier from the driver's pitch byte to XM finetune
    #[serde(default = "default_finetune_scale")]
    pub finetune_scale: i16,
    #[serde(default = "default_relative_note")]
    pub relative_note: i8,
    #[serde(default = "default_max_channels")]
    pub max_channels: u8,
}

fn default_finetune_scale() -> i16 {
    1
}

fn default_relative_note() -> i8 {
    24
}

fn default_max_channels() -> u8 {
    16
}

impl DriverProfile {
    /// Profile with default constants.
    pub fn new(tag: DriverTag, layout: Layout, pcm: PcmEncoding) -> Self {
        Self {
            tag,
            layout,
            pcm,
            finetune_scale: default_finetune_scale(),
            relative_note: default_relative_note(),
            max_channels: default_max_channels(),
        }
    }

    /// XM finetune for a sample header pitch byte.
    pub fn finetune(&self, pitch: u8) -> i8 {
        let scaled = (pitch as i8 as i16).saturating_mul(self.finetune_scale);
        scaled.clamp(i8::MIN as i16, i8::MAX as i16) as i8
    }
}

/// What to do with a tag missing from the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownTagPolicy {
    /// Parse with the classic layout and record a diagnostic
    #[default]
    AssumeClassic,
    /// Fail with `UnsupportedDriverVariant`
    Reject,
}

/// Every revision the converter knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverTable {
    pub unknown_tags: UnknownTagPolicy,
    pub profiles: Vec<DriverProfile>,
}

impl Default for DriverTable {
    fn default() -> Self {
        Self {
            unknown_tags: UnknownTagPolicy::default(),
            profiles: vec![
                DriverProfile::new(DriverTag::MV01, Layout::Classic, PcmEncoding::Signed),
                DriverProfile::new(DriverTag::MV02, Layout::Extended, PcmEncoding::Unsigned),
                DriverProfile::new(DriverTag::MVX1, Layout::Unsupported, PcmEncoding::Signed),
            ],
        }
    }
}

impl DriverTable {
    /// Profile registered for `tag`. Later entries win over earlier ones.
    pub fn lookup(&self, tag: DriverTag) -> Option<&DriverProfile> {
        self.profiles.iter().rev().find(|p| p.tag == tag)
    }

    /// Register or replace a profile.
    pub fn insert(&mut self, profile: DriverProfile) {
        self.profiles.retain(|p| p.tag != profile.tag);
        self.profiles.push(profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_display() {
        assert_eq!(DriverTag(*b"MV01").to_string(), "MV01");
        assert_eq!(DriverTag([0, 1, 0xAB, 0xCD]).to_string(), "0x0001ABCD");
    }

    #[test]
    fn tag_parse() {
        assert_eq!("MV02".parse::<DriverTag>().unwrap(), DriverTag::MV02);
        assert_eq!("0x0001ABCD".parse::<DriverTag>().unwrap(), DriverTag([0, 1, 0xAB, 0xCD]));
        assert!("MV0".parse::<DriverTag>().is_err());
        assert!("MV 1".parse::<DriverTag>().is_err());
        assert!("0x12".parse::<DriverTag>().is_err());
    }

    #[test]
    fn builtin_table() {
        let table = DriverTable::default();
        assert_eq!(table.lookup(DriverTag::MV01).unwrap().layout, Layout::Classic);
        assert_eq!(table.lookup(DriverTag::MV02).unwrap().pcm, PcmEncoding::Unsigned);
        assert_eq!(table.lookup(DriverTag::MVX1).unwrap().layout, Layout::Unsupported);
        assert!(table.lookup(DriverTag(*b"ZZZZ")).is_none());
    }

    #[test]
    fn insert_replaces_same_tag() {
        let mut table = DriverTable::default();
        table.insert(DriverProfile::new(DriverTag::MV01, Layout::Unsupported, PcmEncoding::Signed));
        assert_eq!(table.profiles.len(), 3);
        assert_eq!(table.lookup(DriverTag::MV01).unwrap().layout, Layout::Unsupported);
    }

    #[test]
    fn finetune_scaling_saturates() {
        let mut p = DriverProfile::new(DriverTag::MV01, Layout::Classic, PcmEncoding::Signed);
        assert_eq!(p.finetune(0x10), 16);
        assert_eq!(p.finetune(0xF0), -16);
        p.finetune_scale = 16;
        assert_eq!(p.finetune(0x10), 127);
        assert_eq!(p.finetune(0xF0), -128);
    }

    #[test]
    fn table_from_toml() {
        let table: DriverTable = toml::from_str(
            r#"
            unknown_tags = "reject"

            [[profiles]]
            tag = "MV03"
            layout = "extended"
            pcm = "unsigned"
            finetune_scale = 2

            [[profiles]]
            tag = "0x00FF00FF"
            layout = "unsupported"
            "#,
        )
        .unwrap();
        assert_eq!(table.unknown_tags, UnknownTagPolicy::Reject);
        let p = table.lookup(DriverTag(*b"MV03")).unwrap();
        assert_eq!(p.layout, Layout::Extended);
        assert_eq!(p.finetune_scale, 2);
        assert_eq!(p.relative_note, 24);
        assert_eq!(table.lookup(DriverTag([0, 0xFF, 0, 0xFF])).unwrap().layout, Layout::Unsupported);
        assert!(table.lookup(DriverTag::MV01).is_none());
    }

    #[test]
    fn bad_tag_in_toml_is_an_error() {
        let parsed: Result<DriverTable, _> = toml::from_str(
            r#"
            [[profiles]]
            tag = "TOOLONG"
            layout = "classic"
            "#,
        );
        assert!(parsed.is_err());
    }
}
