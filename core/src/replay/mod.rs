//! Duty replay system
//!
//! Reads and writes duty recordings and drives a host's playback of them.
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                        Codec                                |
//! | file bytes -> header + chapter index + segment stream       |
//! +-------------------------------------------------------------+
//!
//! +-------------------------------------------------------------+
//! |                        Playback                             |
//! | host tick -> ReplayService -> Session (segment lookup)      |
//! |                            -> QuickLoad (bursts, seeks)     |
//! |                            -> SideChannel (value replay)    |
//! +-------------------------------------------------------------+
//!
//! +-------------------------------------------------------------+
//! |                        Recording                            |
//! | side-channel records -> buffer -> flush on recording armed  |
//! +-------------------------------------------------------------+
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dutyrec_core::replay::{ReplayService, SimulatedHost};
//!
//! let mut service = ReplayService::new(dutyrec_core::config::load());
//! service.load(&path, &mut host)?;
//!
//! // Once per host frame:
//! for event in service.on_playback_tick(&mut host) {
//!     tracing::info!(?event, "quick-load");
//! }
//! while let Some(segment) = service.on_get_next_segment(&mut host) {
//!     // hand the segment to the host's playback
//! }
//! ```

pub mod binary;
pub mod chapters;
pub mod runtime;
pub mod stream;
pub mod types;

// Re-export core types
pub use types::{
    CHAPTER_INDEX_SIZE, Chapter, ChapterIndex, ChapterKind, DATA_START, DataSegment,
    FORMAT_REVISION, FORMAT_VERSION, HEADER_SIZE, MAX_CHAPTERS, REPLAY_MAGIC, Replay,
    ReplayHeader, ReplayInfoFlags, ReplayVersion, SEGMENT_HEADER_SIZE, SegmentRecord,
};

pub use chapters::{MIN_PULL_MS, PullInfo};
pub use stream::{Segments, TimeLocation};

// Re-export binary format
pub use binary::{
    BinaryReader, BinaryWriter, FormatError, decode_full, decode_header_and_chapters,
    parse_replay, read_replay_info, read_segment,
};

// Re-export runtime
pub use runtime::{
    Burst, Capability, CapabilitySwitch, CaptureOutcome, ChapterCall, FlagSwitch, FrameReport,
    HeadlessConfig, HeadlessRunner, LoadError, LoadedReplay, OffsetGuard, PlaybackHost,
    QuickLoadController, QuickLoadEvent, RecordingHost, ReplayService, ReplaySession,
    SYSTEM_SUBJECT_ID, SeekMode, SeekState, SideChannelBuffer, SideChannelKind,
    SideChannelRecord, SimulatedHost, TEARDOWN_WARNING, TRANSIENT_ACTOR_IDS, jump_to_chapter,
    jump_to_time, jump_to_time_before_chapter, plan_burst, skip_current_segment,
};
