//! Replay runtime
//!
//! Everything that happens once a replay is in memory:
//! - **Session**: owns the resident replay
//! - **Seek / Quick-load**: direct seeks and burst fast-forwarding
//! - **Side channel**: auxiliary records around recording and playback
//! - **Service**: the host-facing callback surface over all of the above
//! - **Headless**: a simulated host for tests and previews

mod headless;
mod host;
mod quick_load;
mod seek;
mod service;
mod session;
mod side_channel;

pub use headless::{
    ChapterCall, FrameReport, HeadlessConfig, HeadlessRunner, SimulatedHost, TRANSIENT_ACTOR_IDS,
};
pub use host::{Capability, CapabilitySwitch, FlagSwitch, PlaybackHost, RecordingHost};
pub use quick_load::{QuickLoadController, QuickLoadEvent, plan_burst};
pub use seek::{
    Burst, OffsetGuard, SeekMode, SeekState, jump_to_chapter, jump_to_time,
    jump_to_time_before_chapter, skip_current_segment,
};
pub use service::{ReplayService, TEARDOWN_WARNING};
pub use session::{LoadError, LoadedReplay, ReplaySession};
pub use side_channel::{
    CaptureOutcome, SYSTEM_SUBJECT_ID, SideChannelBuffer, SideChannelKind, SideChannelRecord,
    replay_segment,
};
