//! Replay service
//!
//! Single owner of the loaded session, the quick-load controller and the
//! side-channel buffer. Hosts drive it through the `on_*` callbacks; every
//! other method is a user-facing action.

use std::path::{Path, PathBuf};

use smallvec::SmallVec;
use tracing::{info, warn};

use crate::config::Config;
use crate::replay::types::{DataSegment, Replay};

use super::host::{Capability, PlaybackHost, RecordingHost};
use super::quick_load::{QuickLoadController, QuickLoadEvent};
use super::seek;
use super::session::{LoadError, ReplaySession};
use super::side_channel::{self, CaptureOutcome, SideChannelBuffer, SideChannelKind};

/// Shown to the user when the service goes away mid-playback.
pub const TEARDOWN_WARNING: &str =
    "Replay playback was interrupted and may be broken until the replay is reloaded.";

pub struct ReplayService {
    config: Config,
    session: ReplaySession,
    quick_load: QuickLoadController,
    side_channel: SideChannelBuffer,
    selected: Option<PathBuf>,
}

impl ReplayService {
    pub fn new(config: Config) -> Self {
        let quick_load = QuickLoadController::new(config.quick_load.clone());
        Self {
            config,
            session: ReplaySession::new(),
            quick_load,
            side_channel: SideChannelBuffer::new(),
            selected: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration. Quick-load settings apply immediately.
    pub fn set_config(&mut self, config: Config) {
        self.quick_load.set_settings(config.quick_load.clone());
        self.config = config;
    }

    pub fn session(&self) -> &ReplaySession {
        &self.session
    }

    pub fn replay(&self) -> Option<&Replay> {
        self.session.replay()
    }

    pub fn quick_load(&self) -> &QuickLoadController {
        &self.quick_load
    }

    pub fn side_channel(&self) -> &SideChannelBuffer {
        &self.side_channel
    }

    pub fn selected_replay(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    // ------------------------------------------------------------------
    // Host callbacks
    // ------------------------------------------------------------------

    /// Host is about to start playback.
    ///
    /// Loads the selected replay, or the host's own file for the slot. Returns
    /// whether a replay was loaded.
    pub fn on_begin_playback(
        &mut self,
        host: &mut dyn PlaybackHost,
        allowed: bool,
        default_path: &Path,
    ) -> Result<bool, LoadError> {
        if !allowed {
            return Ok(false);
        }
        let path = self
            .selected
            .clone()
            .unwrap_or_else(|| default_path.to_path_buf());
        self.load(&path, host)?;
        self.selected = None;
        Ok(true)
    }

    /// Once per host frame while playing.
    pub fn on_playback_tick(
        &mut self,
        host: &mut dyn PlaybackHost,
    ) -> SmallVec<[QuickLoadEvent; 2]> {
        if let Some(replay) = self.session.replay() {
            host.reset_data_load_cursor();
            self.quick_load.tick(host, replay);
        }
        self.quick_load.drain_events()
    }

    /// Segment at the host's read cursor.
    ///
    /// The seek guard runs first so fast-forward never carries the cursor past
    /// a seek target, then the processing-limit bypass is updated.
    pub fn on_get_next_segment(&mut self, host: &mut dyn PlaybackHost) -> Option<DataSegment<'_>> {
        self.quick_load.check_guard(host);

        let bypass = self.config.playback.bypass_processing_limit(host.seek_delta());
        let switch = host.switch(Capability::ProcessingLimitBypass);
        if bypass {
            switch.arm();
        } else {
            switch.disarm();
        }

        self.session.get_segment(host.data_offset())
    }

    /// Host chapter change. Returns true when handled by a quick-load, in
    /// which case the host must not change chapters itself.
    pub fn on_set_chapter(&mut self, host: &mut dyn PlaybackHost, chapter: usize) -> bool {
        let Some(replay) = self.session.replay() else {
            return false;
        };
        self.quick_load.request(host, replay, chapter)
    }

    /// Segment about to be displayed. Returns true when it was a side-channel
    /// record and has been applied instead.
    pub fn on_replay_segment(
        &mut self,
        host: &mut dyn PlaybackHost,
        segment: &DataSegment<'_>,
    ) -> bool {
        side_channel::replay_segment(host, segment)
    }

    pub fn on_receive_side_channel_record(
        &mut self,
        host: &mut dyn RecordingHost,
        subject_id: u32,
        kind: SideChannelKind,
        payload: &[u8],
    ) -> CaptureOutcome {
        self.side_channel.capture(host, subject_id, kind, payload)
    }

    /// Recording just got armed; flush what was buffered before it.
    pub fn on_recording_armed(&mut self, host: &mut dyn RecordingHost) -> usize {
        self.side_channel.flush(host)
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Load the replay at `path`, replacing the current one on success.
    pub fn load(&mut self, path: &Path, host: &mut dyn PlaybackHost) -> Result<(), LoadError> {
        self.session.load(path, host)?;
        self.quick_load.cancel(host);
        self.config.playback.last_loaded_replay = Some(path.to_path_buf());
        Ok(())
    }

    /// Install an in-memory replay.
    pub fn install_replay(
        &mut self,
        replay: Replay,
        host: &mut dyn PlaybackHost,
    ) -> Result<(), LoadError> {
        self.session.install(replay, None, host)?;
        self.quick_load.cancel(host);
        Ok(())
    }

    pub fn unload(&mut self, host: &mut dyn PlaybackHost) -> bool {
        self.quick_load.cancel(host);
        self.session.unload(host)
    }

    /// Reload the last replay after a restart that happened mid-playback.
    ///
    /// Only applies while the host is playing, has not read anything from its
    /// own storage yet, and no replay is loaded.
    pub fn resume(&mut self, host: &mut dyn PlaybackHost) -> Result<bool, LoadError> {
        if self.session.is_loaded() || !host.in_playback() || host.has_read_from_disk() {
            return Ok(false);
        }
        let Some(path) = self.config.playback.last_loaded_replay.clone() else {
            return Ok(false);
        };
        info!("Resuming replay {}", path.display());
        self.load(&path, host)?;
        Ok(true)
    }

    /// Choose the file the next begin-playback loads. `None` restores the
    /// host's default.
    pub fn select_replay(&mut self, path: Option<PathBuf>) {
        self.selected = path;
    }

    pub fn request_quick_load(&mut self, host: &mut dyn PlaybackHost, target: usize) -> bool {
        let Some(replay) = self.session.replay() else {
            return false;
        };
        self.quick_load.request(host, replay, target)
    }

    pub fn cancel_quick_load(&mut self, host: &mut dyn PlaybackHost) {
        self.quick_load.cancel(host);
    }

    pub fn seek_to_time(&mut self, host: &mut dyn PlaybackHost, ms: u32) -> bool {
        let Some(replay) = self.session.replay() else {
            return false;
        };
        self.quick_load.seek_to_time(host, replay, ms)
    }

    pub fn jump_to_chapter(&mut self, host: &mut dyn PlaybackHost, chapter: usize) -> bool {
        self.session
            .replay()
            .is_some_and(|replay| seek::jump_to_chapter(host, replay, chapter))
    }

    pub fn jump_to_time(&mut self, host: &mut dyn PlaybackHost, ms: u32) -> Option<u32> {
        seek::jump_to_time(host, self.session.replay()?, ms)
    }

    pub fn skip_current_segment(&mut self, host: &mut dyn PlaybackHost) -> bool {
        self.session
            .replay()
            .is_some_and(|replay| seek::skip_current_segment(host, replay))
    }

    /// Tear down: pause the host and warn the user if a replay is still
    /// playing, then free everything. Files on disk are not touched.
    pub fn shutdown(&mut self, host: &mut dyn PlaybackHost) {
        self.quick_load.cancel(host);
        host.switch(Capability::ForcedFastForward).disarm();
        host.switch(Capability::ProcessingLimitBypass).disarm();
        self.side_channel.clear();

        if self.session.is_loaded() && host.in_playback() {
            warn!("Shutting down during replay playback");
            host.pause_playback();
            host.warn_user(TEARDOWN_WARNING);
        }
        self.session.unload(host);
    }
}
