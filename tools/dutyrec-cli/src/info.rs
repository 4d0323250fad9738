//! Info command - summarize a replay without reading its segments

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Args;
use dutyrec_core::replay::{ChapterIndex, ChapterKind, PullInfo, ReplayHeader, read_replay_info};
use serde::Serialize;
use std::path::PathBuf;

use crate::format_ms;

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Replay file
    pub file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ChapterSummary {
    index: usize,
    kind: ChapterKind,
    label: &'static str,
    offset: u32,
    ms: u32,
}

#[derive(Serialize)]
struct InfoReport<'a> {
    header: &'a ReplayHeader,
    recorded_at: Option<String>,
    displayed_duration_ms: u32,
    current_format: bool,
    pulls: PullInfo,
    chapters: Vec<ChapterSummary>,
}

impl<'a> InfoReport<'a> {
    fn new(header: &'a ReplayHeader, chapters: &ChapterIndex) -> Self {
        Self {
            header,
            recorded_at: DateTime::from_timestamp(i64::from(header.timestamp), 0)
                .map(|t| t.to_rfc3339()),
            displayed_duration_ms: chapters.displayed_duration_ms(header.total_ms),
            current_format: header.is_current_format_version(),
            pulls: chapters.pull_info(header.total_ms),
            chapters: chapters
                .iter()
                .enumerate()
                .map(|(index, c)| ChapterSummary {
                    index,
                    kind: c.kind,
                    label: c.kind.label(),
                    offset: c.offset,
                    ms: c.ms,
                })
                .collect(),
        }
    }
}

/// Execute the info command
pub fn execute(args: InfoArgs) -> Result<()> {
    let (header, chapters) = read_replay_info(&args.file)
        .with_context(|| format!("Not a readable replay: {}", args.file.display()))?;
    let report = InfoReport::new(&header, &chapters);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== Replay Info ===");
    println!("  File: {}", args.file.display());
    println!(
        "  Version: {}{}",
        header.version(),
        if report.current_format { "" } else { " (unsupported format)" }
    );
    if let Some(recorded_at) = &report.recorded_at {
        println!("  Recorded: {recorded_at}");
    }
    println!("  Content: {}", header.content_id);
    println!("  Duration: {}", format_ms(report.displayed_duration_ms));
    println!("  Stream: {} bytes", header.stream_len());
    if let Some(job) = header.recorder_job() {
        println!("  Recorder: slot {} (job {job})", header.player_index);
    }
    println!(
        "  Flags: up-to-date={} locked={} completed={}",
        header.is_up_to_date(),
        header.is_locked(),
        header.is_completed()
    );
    println!(
        "  Pulls: {} (longest {})",
        report.pulls.pulls,
        format_ms(report.pulls.longest_pull_ms)
    );

    println!();
    println!("=== Chapters ({}) ===", chapters.len());
    for chapter in &report.chapters {
        println!(
            "  {:>2}  {:<16} {:>10}  @{}",
            chapter.index,
            chapter.label,
            format_ms(chapter.ms),
            chapter.offset
        );
    }

    Ok(())
}
