//! Shared test utilities for unit tests

use crate::replay::runtime::{SideChannelKind, SimulatedHost};
use crate::replay::types::{
    Chapter, ChapterIndex, ChapterKind, Replay, ReplayHeader, ReplayVersion, SegmentRecord,
};

// ============================================================================
// Replay Fixtures
// ============================================================================

/// Replay version stamped on every fixture
pub const FIXTURE_VERSION: ReplayVersion = ReplayVersion::new(6_051);

/// Time between consecutive chapters
pub const CHAPTER_SPACING_MS: u32 = 60_000;

/// Time between consecutive regular segments
pub const SEGMENT_INTERVAL_MS: u32 = 1_000;

/// Opcode used for the regular filler segments
pub const FILLER_OPCODE: u16 = 0x0142;

/// Builds replays with one chapter per minute and one segment per second.
///
/// Every tenth segment (offset 5 s into each ten) is attributed to a
/// transient actor id (`0x4000_0000` range).
pub struct ReplayFixture {
    kinds: Vec<ChapterKind>,
    extra: Vec<SegmentRecord>,
}

impl ReplayFixture {
    pub fn new(kinds: &[ChapterKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            extra: Vec::new(),
        }
    }

    /// Chapter layout `[0:Start, 4:Event, 5:Countdown, 8:Start, 10:Start]`,
    /// remaining slots reserved.
    pub fn quick_load_scenario() -> Self {
        use ChapterKind::*;
        Self::new(&[
            StartOrRestart,
            Reserved,
            Reserved,
            Reserved,
            EventCutscene,
            Countdown,
            Reserved,
            Reserved,
            StartOrRestart,
            Reserved,
            StartOrRestart,
        ])
    }

    /// Insert a side-channel record at `ms`.
    pub fn with_side_channel(mut self, ms: u32, kind: SideChannelKind, payload: &[u8]) -> Self {
        self.extra.push(SegmentRecord::new(
            kind.opcode(),
            ms,
            crate::replay::runtime::SYSTEM_SUBJECT_ID,
            payload,
        ));
        self
    }

    pub fn records(&self) -> Vec<SegmentRecord> {
        let per_chapter = CHAPTER_SPACING_MS / SEGMENT_INTERVAL_MS;
        let mut records = Vec::new();
        for chapter in 0..self.kinds.len() as u32 {
            for k in 0..per_chapter {
                let ms = chapter * CHAPTER_SPACING_MS + k * SEGMENT_INTERVAL_MS;
                let subject_id = if k % 10 == 5 {
                    0x4000_0000 + chapter * 100 + k
                } else {
                    0x1000_0001
                };
                records.push(SegmentRecord::new(
                    FILLER_OPCODE,
                    ms,
                    subject_id,
                    (k as u16).to_le_bytes(),
                ));
            }
        }
        for extra in &self.extra {
            let at = records.partition_point(|r| r.ms <= extra.ms);
            records.insert(at, extra.clone());
        }
        records
    }

    pub fn build(&self) -> Replay {
        let records = self.records();

        let mut chapters = ChapterIndex::new();
        for (i, kind) in self.kinds.iter().enumerate() {
            let ms = i as u32 * CHAPTER_SPACING_MS;
            let offset: usize = records
                .iter()
                .take_while(|r| r.ms < ms)
                .map(SegmentRecord::encoded_len)
                .sum();
            chapters.push(Chapter::new(*kind, offset as u32, ms));
        }

        let header = ReplayHeader {
            replay_version: FIXTURE_VERSION.replay_version,
            timestamp: 1_700_000_000,
            total_ms: self.kinds.len() as u32 * CHAPTER_SPACING_MS,
            content_id: 801,
            ..Default::default()
        };

        Replay::from_parts(header, chapters, &records).unwrap()
    }
}

// ============================================================================
// Hosts
// ============================================================================

/// Simulated host that accepts fixture replays
pub fn fixture_host() -> SimulatedHost {
    SimulatedHost::new(FIXTURE_VERSION)
}
