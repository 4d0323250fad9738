//! Host interfaces
//!
//! The replay core never owns a clock or a connection. Everything it does is
//! driven by a host that calls into it once per frame, and every effect it has
//! goes back out through the traits below.

use crate::replay::types::{ChapterIndex, ReplayHeader, ReplayVersion};

use super::side_channel::SideChannelKind;

/// Boolean host behaviors the core toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Play segments as fast as they can be consumed
    ForcedFastForward,
    /// Ignore the per-frame segment processing limit
    ProcessingLimitBypass,
}

/// A single host capability switch.
pub trait CapabilitySwitch {
    fn arm(&mut self);
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
}

/// Plain flag implementation of [`CapabilitySwitch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagSwitch {
    armed: bool,
}

impl CapabilitySwitch for FlagSwitch {
    fn arm(&mut self) {
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Playback side of the host.
///
/// Offsets are byte offsets into the segment stream, times are elapsed ms
/// since the start of the recording.
pub trait PlaybackHost {
    /// Version a replay must carry to be playable on this host.
    fn expected_version(&self) -> ReplayVersion;

    /// Host is currently playing a recording back.
    fn in_playback(&self) -> bool;

    /// Host is in the middle of its own chapter change.
    fn is_loading_chapter(&self) -> bool;

    /// Host has read segment data from its own storage this session.
    fn has_read_from_disk(&self) -> bool;

    /// Chapter the host considers active.
    fn current_chapter(&self) -> usize;

    fn elapsed_ms(&self) -> u32;
    fn set_elapsed_ms(&mut self, ms: u32);

    /// Current read cursor.
    fn data_offset(&self) -> u32;
    fn set_data_offset(&mut self, offset: u32);

    /// How far ahead of real time the host currently wants to read.
    fn seek_delta(&self) -> u32;

    /// Overwrite the host's live copy of the header and chapter index.
    fn mirror_replay(&mut self, header: &ReplayHeader, chapters: &ChapterIndex);

    /// Drop whatever the host buffered from its own storage.
    fn reset_data_load_cursor(&mut self);

    /// Run the host's own chapter change to `chapter`.
    fn set_chapter(&mut self, chapter: usize);

    /// Advance within the active chapter without restarting it.
    fn advance_in_chapter(&mut self, chapter: usize);

    fn pause_playback(&mut self);

    /// Remove actors spawned by skipped segments. Returns how many went.
    fn remove_transient_actors(&mut self) -> usize;

    /// Feed a side-channel record through the live value path.
    fn apply_side_channel(&mut self, kind: SideChannelKind, subject_id: u32, payload: &[u8]);

    /// Show a message to the user.
    fn warn_user(&mut self, message: &str);

    fn switch(&mut self, capability: Capability) -> &mut dyn CapabilitySwitch;
}

/// Recording side of the host.
pub trait RecordingHost {
    /// A recording session is armed and capturing.
    fn is_recording(&self) -> bool;

    /// A recording is queued but not yet armed.
    fn is_arming_pending(&self) -> bool;

    /// The armed session will be persisted.
    fn is_saving_packets(&self) -> bool;

    /// Append one segment to the active recording.
    fn write_segment(&mut self, subject_id: u32, opcode: u16, payload: &[u8]);
}
