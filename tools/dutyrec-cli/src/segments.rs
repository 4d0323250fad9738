//! Segments command - list the data segment stream

use anyhow::{Result, bail};
use clap::Args;
use dutyrec_core::replay::SideChannelKind;
use std::path::PathBuf;

use crate::{format_ms, read_replay};

/// Arguments for the segments command
#[derive(Args)]
pub struct SegmentsArgs {
    /// Replay file
    pub file: PathBuf,

    /// Start at this chapter instead of the beginning
    #[arg(long)]
    pub chapter: Option<usize>,

    /// Maximum number of segments to print
    #[arg(long, default_value = "50")]
    pub limit: usize,
}

/// Execute the segments command
pub fn execute(args: SegmentsArgs) -> Result<()> {
    let replay = read_replay(&args.file)?;

    let start = match args.chapter {
        Some(index) => match replay.chapters.get(index) {
            Some(chapter) => chapter.offset,
            None => bail!(
                "Chapter {index} out of range ({} chapters)",
                replay.chapters.len()
            ),
        },
        None => 0,
    };

    let mut printed = 0;
    for (offset, segment) in replay.segments_from(start).take(args.limit) {
        let tag = match SideChannelKind::from_opcode(segment.opcode) {
            Some(SideChannelKind::Value) => " [side-channel value]",
            Some(SideChannelKind::Flags) => " [side-channel flags]",
            None => "",
        };
        println!(
            "{offset:>10}  {:>10}  op={:#06x}  subject={:#010x}  len={}{tag}",
            format_ms(segment.ms),
            segment.opcode,
            segment.subject_id,
            segment.payload.len()
        );
        printed += 1;
    }

    if printed == 0 {
        println!("No segments at offset {start}");
    }
    Ok(())
}
