//! Seek state and direct seeks
//!
//! Direct seeks reposition the host's read cursor by chapter or time. A seek
//! that needs the host to catch up arms forced fast-forward together with an
//! [`OffsetGuard`]; the guard is checked at the top of every get-next-segment
//! call and disarms fast-forward the moment the target offset is reached.

use tracing::debug;

use crate::replay::types::Replay;

use super::host::{Capability, PlaybackHost};
use super::quick_load::QuickLoadController;

/// Quick-load progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeekMode {
    #[default]
    Idle,
    /// Bursting towards chapter `target`; chapters before `cursor` are done.
    Seeking { target: usize, cursor: usize },
}

/// One fast-forward interval between two chapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    /// Chapter the burst starts from
    pub from: usize,
    /// Chapter whose timestamp ends the burst
    pub to: usize,
    /// Last burst of the quick-load
    pub final_burst: bool,
}

/// Disarms forced fast-forward at a byte offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetGuard {
    target: Option<u32>,
}

impl OffsetGuard {
    pub fn arm(&mut self, target: u32) {
        self.target = Some(target);
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn is_armed(&self) -> bool {
        self.target.is_some()
    }

    /// Returns true exactly once: on the first call where `offset` has
    /// reached the target.
    pub fn check(&mut self, offset: u32) -> bool {
        match self.target {
            Some(target) if offset >= target => {
                self.target = None;
                true
            }
            _ => false,
        }
    }
}

/// Everything the seek controller tracks between host calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeekState {
    pub mode: SeekMode,
    pub guard: OffsetGuard,
}

/// Move the read cursor to the start of `chapter`.
pub fn jump_to_chapter(host: &mut dyn PlaybackHost, replay: &Replay, chapter: usize) -> bool {
    let Some(target) = replay.chapters.get(chapter) else {
        return false;
    };
    host.set_data_offset(target.offset);
    host.set_elapsed_ms(target.ms);
    true
}

/// Move the read cursor to the first segment at or after `ms`.
///
/// Returns the new offset, or `None` when `ms` lies past the last segment.
pub fn jump_to_time(host: &mut dyn PlaybackHost, replay: &Replay, ms: u32) -> Option<u32> {
    let location = replay.locate_time(ms)?;
    host.set_data_offset(location.offset);
    host.set_elapsed_ms(ms);
    Some(location.offset)
}

/// Jump to `lead_in_ms` before `chapter` starts, clamped to the beginning.
pub fn jump_to_time_before_chapter(
    host: &mut dyn PlaybackHost,
    replay: &Replay,
    chapter: usize,
    lead_in_ms: u32,
) -> Option<u32> {
    let ms = replay.chapters.get(chapter)?.ms.saturating_sub(lead_in_ms);
    jump_to_time(host, replay, ms)
}

/// Step the read cursor past the segment it points at.
///
/// Recovers a host that stalled on a segment it cannot process.
pub fn skip_current_segment(host: &mut dyn PlaybackHost, replay: &Replay) -> bool {
    let offset = host.data_offset();
    let Some(segment) = replay.segment_at(offset) else {
        return false;
    };
    let next = offset.saturating_add(segment.len() as u32);
    debug!(offset, next, opcode = segment.opcode, "Skipping segment");
    host.set_data_offset(next);
    true
}

impl QuickLoadController {
    /// Seek to `ms` by fast-forwarding from the enclosing chapter.
    ///
    /// Cancels any running quick-load. Refused while the host is changing
    /// chapters itself or when `ms` lies past the last segment.
    pub fn seek_to_time(&mut self, host: &mut dyn PlaybackHost, replay: &Replay, ms: u32) -> bool {
        if host.is_loading_chapter() {
            return false;
        }
        let Some(location) = replay.locate_time(ms) else {
            return false;
        };

        self.cancel(host);
        self.state.guard.arm(location.offset);
        host.switch(Capability::ForcedFastForward).arm();

        let in_chapter =
            location.chapter == host.current_chapter() && location.offset > host.data_offset();
        debug!(
            ms,
            chapter = location.chapter,
            offset = location.offset,
            in_chapter,
            "Seeking"
        );
        if in_chapter {
            host.advance_in_chapter(location.chapter);
        } else {
            host.set_chapter(location.chapter);
        }
        true
    }

    /// Disarm forced fast-forward once the read cursor reaches the guarded
    /// offset. Must run before anything else in get-next-segment.
    pub fn check_guard(&mut self, host: &mut dyn PlaybackHost) -> bool {
        if !self.state.guard.check(host.data_offset()) {
            return false;
        }
        host.switch(Capability::ForcedFastForward).disarm();
        debug!(offset = host.data_offset(), "Seek target reached");
        true
    }
}
