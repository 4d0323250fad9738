//! Loaded replay session
//!
//! Owns at most one decoded replay. A new replay only replaces the resident
//! one after it decoded and passed the version check.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::replay::binary::{FormatError, parse_replay};
use crate::replay::types::{DataSegment, Replay, ReplayVersion};

use super::host::PlaybackHost;

/// Error type for replay loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid replay file: {0}")]
    Format(#[from] FormatError),

    #[error("replay version {found} is not playable (host expects {expected})")]
    NotPlayable {
        found: ReplayVersion,
        expected: ReplayVersion,
    },

    #[error("cannot allocate {requested} bytes for replay")]
    OutOfMemory { requested: u64 },
}

/// A replay resident in memory
#[derive(Debug)]
pub struct LoadedReplay {
    pub replay: Replay,
    /// File the replay was read from, if any
    pub path: Option<PathBuf>,
}

/// Holds the resident replay
#[derive(Debug, Default)]
pub struct ReplaySession {
    loaded: Option<LoadedReplay>,
}

impl ReplaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn replay(&self) -> Option<&Replay> {
        self.loaded.as_ref().map(|loaded| &loaded.replay)
    }

    pub fn path(&self) -> Option<&Path> {
        self.loaded.as_ref().and_then(|loaded| loaded.path.as_deref())
    }

    /// Read, decode and install the replay at `path`.
    ///
    /// On any failure the resident replay is left untouched.
    pub fn load(&mut self, path: &Path, host: &mut dyn PlaybackHost) -> Result<(), LoadError> {
        let data = read_file(path)?;
        let replay = parse_replay(data)?;
        self.install(replay, Some(path.to_path_buf()), host)
    }

    /// Install an already decoded replay.
    pub fn install(
        &mut self,
        replay: Replay,
        path: Option<PathBuf>,
        host: &mut dyn PlaybackHost,
    ) -> Result<(), LoadError> {
        let expected = host.expected_version();
        if !replay.header.is_playable(expected) {
            warn!(
                "Rejecting replay version {} (expected {expected})",
                replay.header.version()
            );
            return Err(LoadError::NotPlayable {
                found: replay.header.version(),
                expected,
            });
        }

        host.mirror_replay(&replay.header, &replay.chapters);
        host.reset_data_load_cursor();

        info!(
            "Loaded replay: content {}, {} chapters, {} bytes of segments",
            replay.header.content_id,
            replay.chapters.len(),
            replay.stream_len()
        );
        self.loaded = Some(LoadedReplay { replay, path });
        Ok(())
    }

    /// Free the resident replay. Returns false if nothing was loaded.
    ///
    /// Host playback is paused first so the host never reads a freed buffer.
    pub fn unload(&mut self, host: &mut dyn PlaybackHost) -> bool {
        if self.loaded.is_none() {
            return false;
        }
        if host.in_playback() {
            host.pause_playback();
        }
        self.loaded = None;
        info!("Unloaded replay");
        true
    }

    /// Segment at the host's read offset.
    pub fn get_segment(&self, offset: u32) -> Option<DataSegment<'_>> {
        self.replay()?.segment_at(offset)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    use std::io::Read;

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let len = file.metadata().map_err(io_err)?.len();

    let mut data = Vec::new();
    usize::try_from(len)
        .ok()
        .and_then(|len| data.try_reserve_exact(len).ok())
        .ok_or(LoadError::OutOfMemory { requested: len })?;
    file.read_to_end(&mut data).map_err(io_err)?;
    Ok(data)
}
