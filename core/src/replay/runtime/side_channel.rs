//! Side-channel packet buffer
//!
//! Two auxiliary record kinds reach the client outside the normal capture
//! stream, often before a recording is armed. They are held here until the
//! recording is armed and flushed into it ahead of any live traffic. During
//! playback the same records are routed back through the host's live value
//! path instead of being displayed as ordinary segments.

use tracing::debug;

use crate::replay::types::DataSegment;

use super::host::{PlaybackHost, RecordingHost};

/// Subject id written on every flushed side-channel record.
pub const SYSTEM_SUBJECT_ID: u32 = 0xE000_0000;

/// Kind of side-channel record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideChannelKind {
    /// Single value update
    Value,
    /// Flag set update
    Flags,
}

impl SideChannelKind {
    pub const VALUE_OPCODE: u16 = 0xF001;
    pub const FLAGS_OPCODE: u16 = 0xF002;

    pub fn opcode(self) -> u16 {
        match self {
            Self::Value => Self::VALUE_OPCODE,
            Self::Flags => Self::FLAGS_OPCODE,
        }
    }

    pub fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode {
            Self::VALUE_OPCODE => Some(Self::Value),
            Self::FLAGS_OPCODE => Some(Self::Flags),
            _ => None,
        }
    }
}

/// A buffered side-channel record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideChannelRecord {
    pub subject_id: u32,
    pub kind: SideChannelKind,
    pub payload: Vec<u8>,
}

/// What happened to a captured record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Written straight into the active recording
    Written,
    /// Held until the recording is armed
    Buffered,
    /// No recording active or pending
    Dropped,
}

/// Records held while a recording is pending
#[derive(Debug, Default)]
pub struct SideChannelBuffer {
    records: Vec<SideChannelRecord>,
}

impl SideChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SideChannelRecord] {
        &self.records
    }

    /// Handle a side-channel record received from the host.
    pub fn capture(
        &mut self,
        host: &mut dyn RecordingHost,
        subject_id: u32,
        kind: SideChannelKind,
        payload: &[u8],
    ) -> CaptureOutcome {
        if host.is_recording() {
            host.write_segment(SYSTEM_SUBJECT_ID, kind.opcode(), payload);
            CaptureOutcome::Written
        } else if host.is_arming_pending() {
            self.records.push(SideChannelRecord {
                subject_id,
                kind,
                payload: payload.to_vec(),
            });
            CaptureOutcome::Buffered
        } else {
            CaptureOutcome::Dropped
        }
    }

    /// Write buffered records into a freshly armed recording.
    ///
    /// Writes all value records, then all flag records, each group in arrival
    /// order. Nothing is written unless the session is being saved. The buffer
    /// is empty afterwards either way. Returns the number of records written.
    pub fn flush(&mut self, host: &mut dyn RecordingHost) -> usize {
        let records = std::mem::take(&mut self.records);
        if !host.is_saving_packets() {
            debug!("Discarding {} side-channel records", records.len());
            return 0;
        }

        let mut written = 0;
        for kind in [SideChannelKind::Value, SideChannelKind::Flags] {
            for record in records.iter().filter(|r| r.kind == kind) {
                host.write_segment(SYSTEM_SUBJECT_ID, kind.opcode(), &record.payload);
                written += 1;
            }
        }
        debug!("Flushed {written} side-channel records");
        written
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Route a played-back side-channel segment through the host's value path.
///
/// Returns false for ordinary segments, which the host displays itself.
pub fn replay_segment(host: &mut dyn PlaybackHost, segment: &DataSegment<'_>) -> bool {
    match SideChannelKind::from_opcode(segment.opcode) {
        Some(kind) => {
            host.apply_side_channel(kind, segment.subject_id, segment.payload);
            true
        }
        None => false,
    }
}
