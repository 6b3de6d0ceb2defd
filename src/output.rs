//! Where converted tracks land on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Writes the tracks of one ROM under `<out>/<stem>/`.
pub struct TrackWriter {
    dir: PathBuf,
    stem: String,
}

impl TrackWriter {
    pub fn new(out: &Path, rom: &Path) -> Self {
        let stem = rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "rom".to_string());
        Self { dir: out.join(&stem), stem }
    }

    /// `<out>/<stem>/<stem>_<NN>.xm`
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{:02}.xm", self.stem, index))
    }

    pub fn write(&self, index: usize, xm: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(index);
        fs::write(&path, xm).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
