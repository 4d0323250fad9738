//! Plan command - run a quick-load against a simulated client
//!
//! Plays the replay headlessly from `--from`, requests a jump to `--target`
//! and prints every burst the controller runs on the way.

use anyhow::{Context, Result, bail};
use clap::Args;
use dutyrec_core::config;
use dutyrec_core::replay::{HeadlessConfig, HeadlessRunner, QuickLoadEvent};
use std::path::PathBuf;

use crate::{format_ms, read_replay};

/// Arguments for the plan command
#[derive(Args)]
pub struct PlanArgs {
    /// Replay file
    pub file: PathBuf,

    /// Chapter to jump to
    #[arg(long)]
    pub target: usize,

    /// Chapter playback starts from
    #[arg(long, default_value = "0")]
    pub from: usize,

    /// Segments the simulated client processes per frame
    #[arg(long, default_value = "32")]
    pub segments_per_frame: usize,
}

/// Execute the plan command
pub fn execute(args: PlanArgs) -> Result<()> {
    let replay = read_replay(&args.file)?;
    let chapter_count = replay.chapters.len();
    let headless = HeadlessConfig {
        segments_per_frame: args.segments_per_frame.max(1),
        ..Default::default()
    };
    let mut runner = HeadlessRunner::for_replay(replay, config::load(), headless)
        .context("Failed to start simulated playback")?;

    if !runner.service.jump_to_chapter(&mut runner.host, args.from) {
        bail!("Start chapter {} out of range ({chapter_count} chapters)", args.from);
    }
    if !runner
        .service
        .request_quick_load(&mut runner.host, args.target)
    {
        bail!(
            "Chapter {} is not a quick-load target from chapter {} \
            (must be more than one chapter ahead, below {chapter_count}, with quick-load enabled)",
            args.target,
            args.from
        );
    }
    tracing::info!(from = args.from, target = args.target, "Quick-load requested");

    let events = runner
        .run_until_idle()
        .context("Quick-load did not finish within the frame limit")?;

    println!("=== Quick-Load Plan ===");
    for event in &events {
        match event {
            QuickLoadEvent::BurstStarted(burst) => println!(
                "  burst [{}, {}){}",
                burst.from,
                burst.to,
                if burst.final_burst { " final" } else { "" }
            ),
            QuickLoadEvent::BurstFinished(_) => {}
            QuickLoadEvent::Completed {
                cursor,
                actors_removed,
                resume_ms,
                ..
            } => {
                println!("  completed at chapter {cursor}");
                println!("  removed {actors_removed} transient actor(s)");
                println!("  resumes at {}", format_ms(*resume_ms));
            }
            QuickLoadEvent::Cancelled { target } => println!("  cancelled (target {target})"),
        }
    }
    println!("  frames: {}", runner.frame());

    Ok(())
}
