//! dutyrec CLI - Inspect duty recordings
//!
//! # Commands
//!
//! - `dutyrec info` - Show header, flags, chapters and pull statistics
//! - `dutyrec segments` - List data segments, optionally from a chapter
//! - `dutyrec validate` - Check a file's structure end to end
//! - `dutyrec plan` - Preview the quick-load bursts for a chapter jump
//!
//! # Usage
//!
//! ```bash
//! dutyrec info replay.dat --json
//! dutyrec segments replay.dat --chapter 3 --limit 20
//! dutyrec validate replay.dat
//! dutyrec plan replay.dat --target 10 --from 1
//! ```

mod info;
mod plan;
mod segments;
mod validate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dutyrec_core::replay::{Replay, parse_replay};
use std::path::Path;

/// dutyrec CLI - Inspect duty recordings
#[derive(Parser)]
#[command(name = "dutyrec")]
#[command(about = "Inspect, validate and preview duty recordings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header, flags, chapters and pull statistics
    Info(info::InfoArgs),

    /// List data segments
    Segments(segments::SegmentsArgs),

    /// Check magic, version, chapter order and the segment stream
    Validate(validate::ValidateArgs),

    /// Preview quick-load bursts against a simulated client
    Plan(plan::PlanArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info(args) => info::execute(args),
        Commands::Segments(args) => segments::execute(args),
        Commands::Validate(args) => validate::execute(args),
        Commands::Plan(args) => plan::execute(args),
    }
}

/// Read and decode a whole replay file.
pub(crate) fn read_replay(path: &Path) -> Result<Replay> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_replay(data).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Format elapsed ms as `m:ss.mmm`.
pub(crate) fn format_ms(ms: u32) -> String {
    format!("{}:{:02}.{:03}", ms / 60_000, (ms / 1_000) % 60, ms % 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(0), "0:00.000");
        assert_eq!(format_ms(61_005), "1:01.005");
        assert_eq!(format_ms(600_000), "10:00.000");
    }

    #[test]
    fn test_read_replay_reports_path() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.dat");
        let err = read_replay(&missing).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"), "{err:#}");

        let garbage = dir.path().join("garbage.dat");
        std::fs::write(&garbage, b"not a replay").unwrap();
        let err = read_replay(&garbage).unwrap_err();
        assert!(err.to_string().starts_with("Failed to decode"), "{err:#}");
        assert!(err.to_string().contains("garbage.dat"));
    }
}
