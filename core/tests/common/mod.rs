//! Shared fixtures for integration tests

#![allow(dead_code)]

use dutyrec_core::replay::{
    Chapter, ChapterIndex, ChapterKind, Replay, ReplayHeader, ReplayVersion, SegmentRecord,
};

pub const VERSION: ReplayVersion = ReplayVersion::new(7_020);
pub const CHAPTER_SPACING_MS: u32 = 60_000;
pub const SEGMENT_INTERVAL_MS: u32 = 1_000;

/// Chapter layout used by the quick-load scenarios:
/// `[0:Start, 4:Event, 5:Countdown, 8:Start, 10:Start]`, the rest reserved.
pub const SCENARIO: [ChapterKind; 11] = [
    ChapterKind::StartOrRestart,
    ChapterKind::Reserved,
    ChapterKind::Reserved,
    ChapterKind::Reserved,
    ChapterKind::EventCutscene,
    ChapterKind::Countdown,
    ChapterKind::Reserved,
    ChapterKind::Reserved,
    ChapterKind::StartOrRestart,
    ChapterKind::Reserved,
    ChapterKind::StartOrRestart,
];

/// One chapter per minute, one segment per second. Every tenth segment
/// belongs to a transient actor.
pub fn build_replay(kinds: &[ChapterKind]) -> Replay {
    let per_chapter = CHAPTER_SPACING_MS / SEGMENT_INTERVAL_MS;
    let mut records = Vec::new();
    let mut chapters = ChapterIndex::new();
    let mut offset = 0u32;

    for (i, kind) in kinds.iter().enumerate() {
        let chapter_ms = i as u32 * CHAPTER_SPACING_MS;
        chapters.push(Chapter::new(*kind, offset, chapter_ms));
        for k in 0..per_chapter {
            let subject_id = if k % 10 == 5 {
                0x4000_0000 + i as u32 * 100 + k
            } else {
                0x1000_0001
            };
            let record = SegmentRecord::new(
                0x0142,
                chapter_ms + k * SEGMENT_INTERVAL_MS,
                subject_id,
                vec![k as u8; 4],
            );
            offset += record.encoded_len() as u32;
            records.push(record);
        }
    }

    let header = ReplayHeader {
        replay_version: VERSION.replay_version,
        total_ms: kinds.len() as u32 * CHAPTER_SPACING_MS,
        content_id: 1_002,
        ..Default::default()
    };
    Replay::from_parts(header, chapters, &records).unwrap()
}
