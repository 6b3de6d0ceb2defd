//! Conversion settings, loadable from TOML.

use std::collections::HashSet;

use dpak_formats::{DriverTable, XmOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything that changes how a ROM is converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Blank samples no pattern cell can reach before writing
    pub prune_unused_samples: bool,
    pub xm: XmOptions,
    pub drivers: DriverTable,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            prune_unused_samples: true,
            xm: XmOptions::default(),
            drivers: DriverTable::default(),
        }
    }
}

impl ConvertOptions {
    /// Parse and check a TOML config. Omitted keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, OptionsError> {
        let options: ConvertOptions = toml::from_str(s)?;
        options.check()?;
        Ok(options)
    }

    fn check(&self) -> Result<(), OptionsError> {
        if self.xm.max_sample_len == 0 {
            return Err(OptionsError::Invalid("xm.max_sample_len must be positive".into()));
        }
        let mut seen = HashSet::new();
        for p in &self.drivers.profiles {
            if !seen.insert(p.tag) {
                return Err(OptionsError::Invalid(format!("driver tag {} listed twice", p.tag)));
            }
            if p.max_channels == 0 {
                return Err(OptionsError::Invalid(format!(
                    "driver {}: max_channels must be positive",
                    p.tag
                )));
            }
        }
        Ok(())
    }
}
