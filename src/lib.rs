//! dpak-rip: find DPAK sound banks in GBA ROM images and write each song
//! as an XM module.

pub mod output;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dpak_convert::{ConvertOptions, Converter, Outcome, TrackReport};
use dpak_formats::OversizePolicy;

use crate::output::TrackWriter;

#[derive(Parser, Debug)]
#[command(name = "dpak-rip")]
#[command(about = "Rip DPAK sound banks out of GBA ROMs as XM modules")]
#[command(version)]
pub struct Cli {
    /// ROM images to scan
    #[arg(required = true)]
    pub roms: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// TOML conversion config
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Cut oversized samples instead of failing the track
    #[arg(long)]
    pub truncate_samples: bool,

    /// Embed samples that no pattern cell can play
    #[arg(long)]
    pub keep_unused_samples: bool,

    /// Convert one track at a time
    #[arg(long)]
    pub sequential: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (if any) with command-line overrides applied.
    pub fn options(&self) -> Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                ConvertOptions::from_toml_str(&text)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?
            }
            None => ConvertOptions::default(),
        };
        if self.truncate_samples {
            options.xm.oversize = OversizePolicy::Truncate;
        }
        if self.keep_unused_samples {
            options.prune_unused_samples = false;
        }
        Ok(options)
    }
}

/// Convert every ROM on the command line, writing tracks as they succeed.
pub fn run(cli: &Cli) -> Result<Outcome> {
    let converter = Converter::new(cli.options()?);
    let mut outcome = Outcome::NothingFound;

    for rom_path in &cli.roms {
        let rom = fs::read(rom_path)
            .with_context(|| format!("Failed to read ROM: {}", rom_path.display()))?;
        tracing::info!("scanning {} ({} bytes)", rom_path.display(), rom.len());

        let reports: Vec<TrackReport> = if cli.sequential {
            converter.tracks(&rom).collect()
        } else {
            converter.convert_all(&rom)
        };

        let writer = TrackWriter::new(&cli.output, rom_path);
        for report in &reports {
            match &report.outcome {
                Ok(track) => {
                    let path = writer.write(report.index, &track.xm)?;
                    println!("{} -> {}", report, path.display());
                }
                Err(_) => println!("{}", report),
            }
        }

        let rom_outcome = Outcome::of(&reports);
        println!("{}: {}", rom_path.display(), rom_outcome);
        outcome = outcome.merge(rom_outcome);
    }
    Ok(outcome)
}

/// 0 if anything converted, 1 if every track failed, 2 if there was nothing
/// to convert.
pub fn exit_code(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Converted { .. } => 0,
        Outcome::AllFailed { .. } => 1,
        Outcome::NothingFound => 2,
    }
}
