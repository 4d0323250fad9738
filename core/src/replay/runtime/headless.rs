//! Headless replay execution
//!
//! A deterministic stand-in for the game client. [`SimulatedHost`] implements
//! both host traits with plain fields, and [`HeadlessRunner`] advances it frame
//! by frame through a [`ReplayService`] the way the client's playback loop
//! would. Used by the tests and by the CLI to preview quick-loads.

use hashbrown::HashMap;
use tracing::debug;

use crate::config::Config;
use crate::replay::types::{
    ChapterIndex, DataSegment, Replay, ReplayHeader, ReplayVersion, SegmentRecord,
};

use super::host::{Capability, CapabilitySwitch, FlagSwitch, PlaybackHost, RecordingHost};
use super::quick_load::QuickLoadEvent;
use super::service::ReplayService;
use super::session::LoadError;
use super::side_channel::SideChannelKind;

/// Subject ids in this range belong to actors spawned by the recording.
pub const TRANSIENT_ACTOR_IDS: std::ops::Range<u32> = 0x4000_0000..0x5000_0000;

/// Chapter change requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterCall {
    /// Full chapter change
    Set(usize),
    /// Advance within the active chapter
    Advance(usize),
}

/// Host whose whole state is public
#[derive(Debug)]
pub struct SimulatedHost {
    version: ReplayVersion,
    header: Option<ReplayHeader>,
    chapters: Option<ChapterIndex>,
    fast_forward: FlagSwitch,
    bypass: FlagSwitch,
    /// Live actors by subject id, with the ms they were last seen
    actors: HashMap<u32, u32>,

    pub playing: bool,
    pub loading_chapter: bool,
    pub read_from_disk: bool,
    pub elapsed_ms: u32,
    pub data_offset: u32,
    pub seek_delta: u32,

    pub recording: bool,
    pub arming_pending: bool,
    pub saving_packets: bool,

    pub load_cursor_resets: usize,
    pub chapter_calls: Vec<ChapterCall>,
    pub applied: Vec<(SideChannelKind, u32, Vec<u8>)>,
    pub warnings: Vec<String>,
    /// Segments written to the recording
    pub written: Vec<SegmentRecord>,
}

impl SimulatedHost {
    pub fn new(version: ReplayVersion) -> Self {
        Self {
            version,
            header: None,
            chapters: None,
            fast_forward: FlagSwitch::default(),
            bypass: FlagSwitch::default(),
            actors: HashMap::new(),
            playing: false,
            loading_chapter: false,
            read_from_disk: false,
            elapsed_ms: 0,
            data_offset: 0,
            seek_delta: 0,
            recording: false,
            arming_pending: false,
            saving_packets: false,
            load_cursor_resets: 0,
            chapter_calls: Vec::new(),
            applied: Vec::new(),
            warnings: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn mirrored_header(&self) -> Option<&ReplayHeader> {
        self.header.as_ref()
    }

    pub fn mirrored_chapters(&self) -> Option<&ChapterIndex> {
        self.chapters.as_ref()
    }

    pub fn is_armed(&self, capability: Capability) -> bool {
        match capability {
            Capability::ForcedFastForward => self.fast_forward.is_armed(),
            Capability::ProcessingLimitBypass => self.bypass.is_armed(),
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn transient_actor_count(&self) -> usize {
        self.actors
            .keys()
            .filter(|id| TRANSIENT_ACTOR_IDS.contains(id))
            .count()
    }

    /// Process one segment and move the read cursor past it.
    ///
    /// While fast-forwarding, the clock follows the segment timestamps.
    pub fn consume(&mut self, segment: &DataSegment<'_>) {
        self.actors.insert(segment.subject_id, segment.ms);
        self.data_offset = self.data_offset.saturating_add(segment.len() as u32);
        if self.fast_forward.is_armed() {
            self.elapsed_ms = self.elapsed_ms.max(segment.ms);
        }
    }
}

impl PlaybackHost for SimulatedHost {
    fn expected_version(&self) -> ReplayVersion {
        self.version
    }

    fn in_playback(&self) -> bool {
        self.playing
    }

    fn is_loading_chapter(&self) -> bool {
        self.loading_chapter
    }

    fn has_read_from_disk(&self) -> bool {
        self.read_from_disk
    }

    fn current_chapter(&self) -> usize {
        self.chapters
            .as_ref()
            .map_or(0, |chapters| chapters.find_previous_chapter_from_time(self.elapsed_ms))
    }

    fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    fn set_elapsed_ms(&mut self, ms: u32) {
        self.elapsed_ms = ms;
    }

    fn data_offset(&self) -> u32 {
        self.data_offset
    }

    fn set_data_offset(&mut self, offset: u32) {
        self.data_offset = offset;
    }

    fn seek_delta(&self) -> u32 {
        self.seek_delta
    }

    fn mirror_replay(&mut self, header: &ReplayHeader, chapters: &ChapterIndex) {
        self.header = Some(header.clone());
        self.chapters = Some(chapters.clone());
    }

    fn reset_data_load_cursor(&mut self) {
        self.load_cursor_resets += 1;
    }

    fn set_chapter(&mut self, chapter: usize) {
        self.chapter_calls.push(ChapterCall::Set(chapter));
        if let Some(target) = self.chapters.as_ref().and_then(|c| c.get(chapter)) {
            self.data_offset = target.offset;
            self.elapsed_ms = target.ms;
        }
    }

    fn advance_in_chapter(&mut self, chapter: usize) {
        self.chapter_calls.push(ChapterCall::Advance(chapter));
    }

    fn pause_playback(&mut self) {
        self.playing = false;
    }

    fn remove_transient_actors(&mut self) -> usize {
        let before = self.actors.len();
        self.actors.retain(|id, _| !TRANSIENT_ACTOR_IDS.contains(id));
        before - self.actors.len()
    }

    fn apply_side_channel(&mut self, kind: SideChannelKind, subject_id: u32, payload: &[u8]) {
        self.applied.push((kind, subject_id, payload.to_vec()));
    }

    fn warn_user(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn switch(&mut self, capability: Capability) -> &mut dyn CapabilitySwitch {
        match capability {
            Capability::ForcedFastForward => &mut self.fast_forward,
            Capability::ProcessingLimitBypass => &mut self.bypass,
        }
    }
}

impl RecordingHost for SimulatedHost {
    fn is_recording(&self) -> bool {
        self.recording
    }

    fn is_arming_pending(&self) -> bool {
        self.arming_pending
    }

    fn is_saving_packets(&self) -> bool {
        self.saving_packets
    }

    fn write_segment(&mut self, subject_id: u32, opcode: u16, payload: &[u8]) {
        self.written.push(SegmentRecord::new(
            opcode,
            self.elapsed_ms,
            subject_id,
            payload,
        ));
    }
}

/// Headless runner configuration
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Clock advance per frame at normal speed
    pub frame_ms: u32,
    /// Segments processed per frame unless the bypass is armed
    pub segments_per_frame: usize,
    /// Frame cap for [`HeadlessRunner::run_until_idle`]
    pub max_frames: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frame_ms: 16,
            segments_per_frame: 32,
            max_frames: 1_000_000,
        }
    }
}

/// What one frame did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Segments consumed, side-channel ones included
    pub segments: usize,
    /// Side-channel segments routed to the value path
    pub side_channel: usize,
    pub events: Vec<QuickLoadEvent>,
    /// The read cursor reached the end of the stream
    pub end_of_stream: bool,
}

/// Drives a [`ReplayService`] against a [`SimulatedHost`]
pub struct HeadlessRunner {
    pub service: ReplayService,
    pub host: SimulatedHost,
    config: HeadlessConfig,
    frame: u64,
}

impl HeadlessRunner {
    pub fn new(service: ReplayService, host: SimulatedHost, config: HeadlessConfig) -> Self {
        Self {
            service,
            host,
            config,
            frame: 0,
        }
    }

    /// Runner for `replay` with a host that accepts its version, already
    /// playing from the first segment.
    pub fn for_replay(
        replay: Replay,
        config: Config,
        headless: HeadlessConfig,
    ) -> Result<Self, LoadError> {
        let host = SimulatedHost::new(replay.header.version());
        let mut runner = Self::new(ReplayService::new(config), host, headless);
        runner.service.install_replay(replay, &mut runner.host)?;
        runner.host.playing = true;
        Ok(runner)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one host frame: tick, advance the clock, then consume segments.
    ///
    /// Segments are consumed until one lies in the future (no time gate while
    /// fast-forwarding), the stream ends, or the per-frame limit is hit
    /// (lifted while the bypass is armed).
    pub fn run_frame(&mut self) -> FrameReport {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            events: self.service.on_playback_tick(&mut self.host).into_vec(),
            ..Default::default()
        };

        if !self.host.is_armed(Capability::ForcedFastForward) {
            self.host.elapsed_ms = self.host.elapsed_ms.saturating_add(self.config.frame_ms);
        }

        loop {
            if report.segments >= self.config.segments_per_frame
                && !self.host.is_armed(Capability::ProcessingLimitBypass)
            {
                break;
            }

            let Some(record) = self
                .service
                .on_get_next_segment(&mut self.host)
                .map(|segment| segment.to_record())
            else {
                report.end_of_stream = true;
                break;
            };

            if !self.host.is_armed(Capability::ForcedFastForward)
                && record.ms > self.host.elapsed_ms
            {
                break;
            }

            let segment = record.as_segment();
            if self.service.on_replay_segment(&mut self.host, &segment) {
                report.side_channel += 1;
            }
            self.host.consume(&segment);
            report.segments += 1;
        }

        if !report.events.is_empty() {
            debug!(frame = self.frame, events = ?report.events, "Frame events");
        }
        report
    }

    /// Run frames until no quick-load or seek is in progress.
    ///
    /// Returns every event raised on the way, or `None` if the frame cap was
    /// hit first.
    pub fn run_until_idle(&mut self) -> Option<Vec<QuickLoadEvent>> {
        let mut events = Vec::new();
        for _ in 0..self.config.max_frames {
            let report = self.run_frame();
            events.extend(report.events);

            let state = self.service.quick_load().state();
            if !self.service.quick_load().is_seeking() && !state.guard.is_armed() {
                return Some(events);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::types::ChapterKind::*;
    use crate::test_utils::{CHAPTER_SPACING_MS, ReplayFixture, SEGMENT_INTERVAL_MS};

    fn runner(replay: Replay) -> HeadlessRunner {
        HeadlessRunner::for_replay(replay, Config::default(), HeadlessConfig::default()).unwrap()
    }

    #[test]
    fn test_normal_playback_follows_clock() {
        let mut runner = runner(ReplayFixture::new(&[StartOrRestart]).build());

        // First frame reaches 16 ms: only the segment at 0 ms is due
        let report = runner.run_frame();
        assert_eq!(report.segments, 1);

        for _ in 0..62 {
            runner.run_frame();
        }
        // 63 frames = 1008 ms: segments at 0 and 1000 ms
        assert_eq!(runner.host.elapsed_ms, 63 * 16);
        assert_eq!(
            runner.service.replay().unwrap().segment_at(runner.host.data_offset).map(|s| s.ms),
            Some(2 * SEGMENT_INTERVAL_MS)
        );
    }

    #[test]
    fn test_frame_limit_and_bypass() {
        let mut config = Config::default();
        config.playback.max_seek_delta = 200;
        let replay = ReplayFixture::new(&[StartOrRestart, Countdown]).build();
        let mut runner =
            HeadlessRunner::for_replay(replay, config, HeadlessConfig::default()).unwrap();

        runner.host.elapsed_ms = CHAPTER_SPACING_MS;
        runner.host.seek_delta = 1_000;
        assert_eq!(runner.run_frame().segments, 32);

        runner.host.seek_delta = 150;
        assert_eq!(runner.run_frame().segments, 61 - 32);
    }

    #[test]
    fn test_side_channel_segments_are_applied() {
        let replay = ReplayFixture::new(&[StartOrRestart])
            .with_side_channel(0, SideChannelKind::Flags, &[1])
            .build();
        let mut runner = runner(replay);

        let report = runner.run_frame();
        assert_eq!(report.side_channel, 1);
        assert_eq!(runner.host.applied.len(), 1);
    }

    #[test]
    fn test_remove_transient_actors() {
        let mut host = SimulatedHost::new(ReplayVersion::new(1));
        for subject_id in [0x1000_0001, 0x4000_0001, 0x4000_0002] {
            host.consume(&DataSegment {
                opcode: 1,
                ms: 0,
                subject_id,
                payload: &[],
            });
        }
        assert_eq!(host.transient_actor_count(), 2);
        assert_eq!(host.remove_transient_actors(), 2);
        assert_eq!(host.actor_count(), 1);
    }
}
