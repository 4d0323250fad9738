//! Core types for the replay system
//!
//! A recorded duty is a fixed header, a bounded chapter index and a packed
//! stream of variable-length data segments. This module defines the
//! in-memory representation of each part; the byte layout lives in
//! [`crate::replay::binary`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic literal at offset 0 of every replay file (`FFXIVREPLAY` + NUL).
pub const REPLAY_MAGIC: [u8; 12] = *b"FFXIVREPLAY\0";

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 0x60;

/// Capacity of the chapter index.
pub const MAX_CHAPTERS: usize = 64;

/// Size of one chapter entry (`i32 kind, u32 offset, u32 ms`).
pub const CHAPTER_ENTRY_SIZE: usize = 0xC;

/// Size of the chapter index: `u32` count followed by every entry slot.
pub const CHAPTER_INDEX_SIZE: usize = 4 + MAX_CHAPTERS * CHAPTER_ENTRY_SIZE;

/// Byte offset of the first data segment within a replay file.
pub const DATA_START: usize = HEADER_SIZE + CHAPTER_INDEX_SIZE;

/// Size of a segment header (`u16 opcode, u16 len, u32 ms, u32 subject`).
pub const SEGMENT_HEADER_SIZE: usize = 0xC;

/// Structural format version understood by this crate.
pub const FORMAT_VERSION: u16 = 4;

/// Structural revision written alongside [`FORMAT_VERSION`].
pub const FORMAT_REVISION: u16 = 3;

/// Complete replay data (in-memory representation)
///
/// Owns the raw file bytes. Header and chapters are decoded eagerly, the
/// segment stream is addressed lazily by byte offset.
#[derive(Debug, Clone)]
pub struct Replay {
    pub header: ReplayHeader,
    pub chapters: ChapterIndex,
    pub(crate) data: Vec<u8>,
}

impl Replay {
    /// Raw file bytes (header + chapter index + segment stream).
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Declared length of the segment stream, as written in the header.
    pub fn stream_len(&self) -> usize {
        self.header.stream_len()
    }

    /// Segment stream length that is actually backed by bytes.
    ///
    /// Differs from [`Replay::stream_len`] for truncated files.
    pub fn available_stream_len(&self) -> usize {
        self.data
            .len()
            .saturating_sub(DATA_START)
            .min(self.stream_len())
    }
}

/// Host replay version a file must match to be playable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplayVersion {
    /// Structural version of the file layout
    pub format_version: u16,
    /// Version of the host's replay system
    pub replay_version: i32,
}

impl ReplayVersion {
    pub const fn new(replay_version: i32) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            replay_version,
        }
    }
}

impl fmt::Display for ReplayVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.format_version, self.replay_version)
    }
}

/// Fixed 0x60-byte replay header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayHeader {
    /// Must equal [`REPLAY_MAGIC`]
    pub magic: [u8; 12],
    /// Structural version (0x0C)
    pub format_version: u16,
    /// Structural revision, unused by playback (0x0E)
    pub format_revision: u16,
    /// Host replay system version (0x10)
    pub replay_version: i32,
    /// Creation time, Unix seconds (0x14)
    pub timestamp: u32,
    /// Unknown, carried through unchanged (0x18)
    pub unknown_0x18: u32,
    /// Total recording duration in ms (0x1C)
    pub total_ms: u32,
    /// Content (duty) identifier (0x20)
    pub content_id: u16,
    /// Info bitfield (0x28)
    pub info: ReplayInfoFlags,
    /// Identifier of the recording player (0x30)
    pub owner_id: u64,
    /// Job code of each party slot (0x38)
    pub jobs: [u8; 8],
    /// Slot of the recording player within `jobs` (0x40)
    pub player_index: u8,
    /// Unknown, carried through unchanged (0x44)
    pub unknown_0x44: i32,
    /// Declared length of the segment stream in bytes (0x48)
    pub replay_length: i32,
    /// Display name ids for NPC party members (0x4E)
    pub npc_names: [u16; 7],
}

impl Default for ReplayHeader {
    fn default() -> Self {
        Self {
            magic: REPLAY_MAGIC,
            format_version: FORMAT_VERSION,
            format_revision: FORMAT_REVISION,
            replay_version: 0,
            timestamp: 0,
            unknown_0x18: 0,
            total_ms: 0,
            content_id: 0,
            info: ReplayInfoFlags::empty(),
            owner_id: 0,
            jobs: [0; 8],
            player_index: 0,
            unknown_0x44: 0,
            replay_length: 0,
            npc_names: [0; 7],
        }
    }
}

impl ReplayHeader {
    /// Magic literal matches.
    pub fn is_valid(&self) -> bool {
        self.magic == REPLAY_MAGIC
    }

    /// Structural version is the one this crate reads.
    pub fn is_current_format_version(&self) -> bool {
        self.is_valid() && self.format_version == FORMAT_VERSION
    }

    /// Version fields match what the running host expects.
    pub fn is_playable(&self, expected: ReplayVersion) -> bool {
        self.is_valid() && self.version() == expected
    }

    pub fn version(&self) -> ReplayVersion {
        ReplayVersion {
            format_version: self.format_version,
            replay_version: self.replay_version,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.info.contains(ReplayInfoFlags::UP_TO_DATE)
    }

    pub fn is_locked(&self) -> bool {
        self.info.contains(ReplayInfoFlags::LOCKED)
    }

    pub fn is_completed(&self) -> bool {
        self.info.contains(ReplayInfoFlags::COMPLETED)
    }

    /// Job code of the recording player, if the slot is in range.
    pub fn recorder_job(&self) -> Option<u8> {
        self.jobs.get(self.player_index as usize).copied()
    }

    /// Declared segment stream length; negative lengths count as empty.
    pub fn stream_len(&self) -> usize {
        usize::try_from(self.replay_length).unwrap_or(0)
    }
}

bitflags::bitflags! {
    /// Header info bitfield
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReplayInfoFlags: u8 {
        /// Recorded with the current host version
        const UP_TO_DATE = 0b0000_0001;
        /// Protected from being overwritten
        const LOCKED = 0b0000_0010;
        /// The duty was completed during the recording
        const COMPLETED = 0b0000_0100;
    }
}

// Manual serde implementation for ReplayInfoFlags
impl Serialize for ReplayInfoFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReplayInfoFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(ReplayInfoFlags::from_bits_retain(bits))
    }
}

/// Kind of a chapter checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChapterKind {
    /// Pull countdown started
    Countdown,
    /// Fight started or restarted
    StartOrRestart,
    /// Never observed in recordings
    Reserved,
    /// Event cutscene
    EventCutscene,
    /// Arena barrier went down (shown as a start)
    BarrierDown,
    /// Any other raw value
    Unknown(i32),
}

impl ChapterKind {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Countdown,
            2 => Self::StartOrRestart,
            3 => Self::Reserved,
            4 => Self::EventCutscene,
            5 => Self::BarrierDown,
            other => Self::Unknown(other),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Countdown => 1,
            Self::StartOrRestart => 2,
            Self::Reserved => 3,
            Self::EventCutscene => 4,
            Self::BarrierDown => 5,
            Self::Unknown(raw) => raw,
        }
    }

    /// Display label. Barrier-down chapters read as starts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Countdown => "Countdown",
            Self::StartOrRestart | Self::BarrierDown => "Start / Restart",
            Self::Reserved => "Reserved",
            Self::EventCutscene => "Event",
            Self::Unknown(_) => "Unknown",
        }
    }
}

/// One chapter checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub kind: ChapterKind,
    /// Byte offset into the segment stream
    pub offset: u32,
    /// Elapsed ms since the start of the recording
    pub ms: u32,
}

impl Chapter {
    pub fn new(kind: ChapterKind, offset: u32, ms: u32) -> Self {
        Self { kind, offset, ms }
    }
}

/// Bounded, ordered chapter index
///
/// Holds at most [`MAX_CHAPTERS`] entries. Index 0 marks the start of the
/// recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterIndex {
    entries: Vec<Chapter>,
}

impl ChapterIndex {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_CHAPTERS),
        }
    }

    /// Build from chapters, dropping anything past [`MAX_CHAPTERS`].
    pub fn from_chapters(chapters: impl IntoIterator<Item = Chapter>) -> Self {
        Self {
            entries: chapters.into_iter().take(MAX_CHAPTERS).collect(),
        }
    }

    /// Append a chapter. Returns false when the index is full.
    pub fn push(&mut self, chapter: Chapter) -> bool {
        if self.entries.len() >= MAX_CHAPTERS {
            return false;
        }
        self.entries.push(chapter);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chapter> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Chapter] {
        &self.entries
    }

    /// Offsets and timestamps never decrease along the index.
    pub fn is_monotonic(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].offset <= pair[1].offset && pair[0].ms <= pair[1].ms)
    }
}

/// Borrowed view of one data segment inside a replay buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSegment<'a> {
    pub opcode: u16,
    /// Elapsed ms at which the segment was recorded
    pub ms: u32,
    /// Object the segment refers to
    pub subject_id: u32,
    pub payload: &'a [u8],
}

impl DataSegment<'_> {
    /// Encoded size in bytes, header included.
    pub fn len(&self) -> usize {
        SEGMENT_HEADER_SIZE + self.payload.len()
    }

    /// A segment always has a header, so it is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_record(&self) -> SegmentRecord {
        SegmentRecord {
            opcode: self.opcode,
            ms: self.ms,
            subject_id: self.subject_id,
            payload: self.payload.to_vec(),
        }
    }
}

/// Owned data segment, used when writing streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub opcode: u16,
    pub ms: u32,
    pub subject_id: u32,
    pub payload: Vec<u8>,
}

impl SegmentRecord {
    pub fn new(opcode: u16, ms: u32, subject_id: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            ms,
            subject_id,
            payload: payload.into(),
        }
    }

    pub fn as_segment(&self) -> DataSegment<'_> {
        DataSegment {
            opcode: self.opcode,
            ms: self.ms,
            subject_id: self.subject_id,
            payload: &self.payload,
        }
    }

    /// Encoded size in bytes, header included.
    pub fn encoded_len(&self) -> usize {
        SEGMENT_HEADER_SIZE + self.payload.len()
    }
}
