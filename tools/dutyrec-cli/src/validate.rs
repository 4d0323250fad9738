//! Validate command - structural checks over a whole replay file

use anyhow::{Result, bail};
use clap::Args;
use dutyrec_core::replay::{FORMAT_VERSION, Replay};
use std::path::PathBuf;

use crate::read_replay;

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// Replay file
    pub file: PathBuf,
}

/// Outcome of walking a replay
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Validation {
    pub segments: usize,
    /// Offset where the segment walk stopped
    pub end_offset: usize,
    pub errors: Vec<String>,
}

/// Check the format version, chapter order, chapter offsets and that the
/// segment walk ends exactly at the declared stream length.
pub fn validate(replay: &Replay) -> Validation {
    let mut report = Validation::default();

    if !replay.header.is_current_format_version() {
        report.errors.push(format!(
            "format version {} (expected {FORMAT_VERSION})",
            replay.header.format_version
        ));
    }
    if !replay.chapters.is_monotonic() {
        report
            .errors
            .push("chapters are not ordered by offset and time".to_string());
    }

    let mut boundaries = Vec::new();
    for (offset, segment) in replay.segments_from(0) {
        boundaries.push(offset);
        report.segments += 1;
        report.end_offset = offset as usize + segment.len();
    }

    if report.end_offset != replay.stream_len() {
        report.errors.push(format!(
            "segment walk stopped at {} of {} declared bytes",
            report.end_offset,
            replay.stream_len()
        ));
    }
    if replay.available_stream_len() < replay.stream_len() {
        report.errors.push(format!(
            "file holds {} of {} declared stream bytes",
            replay.available_stream_len(),
            replay.stream_len()
        ));
    }

    for (index, chapter) in replay.chapters.iter().enumerate() {
        let at_end = chapter.offset as usize == report.end_offset;
        if boundaries.binary_search(&chapter.offset).is_err() && !at_end {
            report.errors.push(format!(
                "chapter {index} offset {} is not a segment boundary",
                chapter.offset
            ));
        }
    }

    report
}

/// Execute the validate command
pub fn execute(args: ValidateArgs) -> Result<()> {
    println!("Validating replay: {}", args.file.display());
    let replay = read_replay(&args.file)?;
    let report = validate(&replay);

    println!();
    println!("Chapters: {}", replay.chapters.len());
    println!("Segments: {}", report.segments);
    println!("Stream: {} bytes", report.end_offset);

    if report.errors.is_empty() {
        println!();
        println!("=== Replay Valid ===");
        return Ok(());
    }

    println!();
    println!("=== Problems ===");
    for error in &report.errors {
        println!("  {error}");
    }
    bail!("{} problem(s) found", report.errors.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutyrec_core::replay::{
        Chapter, ChapterIndex, ChapterKind, ReplayHeader, SegmentRecord,
    };

    fn records() -> Vec<SegmentRecord> {
        (0..10)
            .map(|i| SegmentRecord::new(0x0142, i * 1_000, 1, vec![i as u8; 4]))
            .collect()
    }

    #[test]
    fn test_valid_replay() {
        let chapters = ChapterIndex::from_chapters([
            Chapter::new(ChapterKind::StartOrRestart, 0, 0),
            Chapter::new(ChapterKind::Countdown, 16 * 5, 5_000),
        ]);
        let replay = Replay::from_parts(ReplayHeader::default(), chapters, &records()).unwrap();

        let report = validate(&replay);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.segments, 10);
        assert_eq!(report.end_offset, 160);
    }

    #[test]
    fn test_misaligned_and_unordered_chapters() {
        let chapters = ChapterIndex::from_chapters([
            Chapter::new(ChapterKind::StartOrRestart, 20, 0),
            Chapter::new(ChapterKind::Countdown, 16, 5_000),
        ]);
        let replay = Replay::from_parts(ReplayHeader::default(), chapters, &records()).unwrap();

        let report = validate(&replay);
        assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    }

    #[test]
    fn test_truncated_stream() {
        let replay =
            Replay::from_parts(ReplayHeader::default(), ChapterIndex::new(), &records()).unwrap();
        let mut bytes = replay.as_bytes().to_vec();
        bytes.truncate(bytes.len() - 6);
        let truncated = dutyrec_core::replay::parse_replay(bytes).unwrap();

        let report = validate(&truncated);
        assert_eq!(report.segments, 9);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_execute_on_files() {
        let dir = tempfile::tempdir().unwrap();
        let replay =
            Replay::from_parts(ReplayHeader::default(), ChapterIndex::new(), &records()).unwrap();

        let good = dir.path().join("good.dat");
        std::fs::write(&good, replay.as_bytes()).unwrap();
        assert!(execute(ValidateArgs { file: good }).is_ok());

        let cut = dir.path().join("cut.dat");
        let bytes = replay.as_bytes();
        std::fs::write(&cut, &bytes[..bytes.len() - 6]).unwrap();
        let err = execute(ValidateArgs { file: cut }).unwrap_err();
        assert_eq!(err.to_string(), "2 problem(s) found");
    }
}
