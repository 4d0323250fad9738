//! Quick-load controller
//!
//! Jumping many chapters ahead through the host's own chapter path means
//! replaying every skipped chapter at normal speed. Quick-load instead runs a
//! few bounded fast-forward bursts:
//!
//! 1. Each event cutscene well before the target is fast-forwarded up to the
//!    countdown that follows it (clamped to a few chapters).
//! 2. A final burst replays from the start chapter one checkpoint before the
//!    target, so fight setup is rebuilt rather than entered mid-scene.
//! 3. On completion, transient actors left behind by skipped spawn records
//!    are removed and playback resumes shortly before the target's start.
//!
//! The controller never loops on its own. Each host tick checks whether the
//! running burst has reached its end chapter and plans the next one.

use smallvec::SmallVec;
use tracing::debug;

use crate::config::QuickLoadConfig;
use crate::replay::types::{ChapterIndex, ChapterKind, Replay};

use super::host::{Capability, PlaybackHost};
use super::seek::{Burst, SeekMode, SeekState, jump_to_chapter, jump_to_time_before_chapter};

/// Notable controller transitions, drained by the caller after each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickLoadEvent {
    BurstStarted(Burst),
    BurstFinished(Burst),
    Completed {
        target: usize,
        cursor: usize,
        actors_removed: usize,
        /// Elapsed ms playback resumes from
        resume_ms: u32,
    },
    Cancelled {
        target: usize,
    },
}

/// Drives quick-loads and direct seeks
#[derive(Debug)]
pub struct QuickLoadController {
    pub(super) state: SeekState,
    burst: Option<Burst>,
    settings: QuickLoadConfig,
    events: SmallVec<[QuickLoadEvent; 2]>,
}

impl QuickLoadController {
    pub fn new(settings: QuickLoadConfig) -> Self {
        Self {
            state: SeekState::default(),
            burst: None,
            settings,
            events: SmallVec::new(),
        }
    }

    pub fn state(&self) -> &SeekState {
        &self.state
    }

    pub fn settings(&self) -> &QuickLoadConfig {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: QuickLoadConfig) {
        self.settings = settings;
    }

    pub fn is_seeking(&self) -> bool {
        matches!(self.state.mode, SeekMode::Seeking { .. })
    }

    /// Burst currently running, if any.
    pub fn current_burst(&self) -> Option<Burst> {
        self.burst
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> SmallVec<[QuickLoadEvent; 2]> {
        std::mem::take(&mut self.events)
    }

    /// Start a quick-load towards chapter `target`.
    ///
    /// Only targets more than one chapter ahead of the host qualify; closer
    /// targets are left to the host's own chapter change. A request while
    /// already seeking replaces the old one and plans from the host's
    /// current chapter.
    pub fn request(&mut self, host: &mut dyn PlaybackHost, replay: &Replay, target: usize) -> bool {
        let current = host.current_chapter();
        if !self.settings.enabled
            || replay.chapters.len() < 2
            || target >= replay.chapters.len()
            || target <= current + 1
        {
            return false;
        }

        let cursor = match self.state.mode {
            SeekMode::Seeking { target: old, .. } => {
                debug!(old, target, current, "Replacing quick-load");
                host.switch(Capability::ForcedFastForward).disarm();
                self.burst = None;
                current
            }
            SeekMode::Idle => 0,
        };

        debug!(target, current, "Quick-load requested");
        self.state.guard.clear();
        self.state.mode = SeekMode::Seeking { target, cursor };
        self.step(host, replay);
        true
    }

    /// Abandon any quick-load or seek in progress.
    pub fn cancel(&mut self, host: &mut dyn PlaybackHost) {
        if self.state.guard.is_armed() {
            self.state.guard.clear();
            host.switch(Capability::ForcedFastForward).disarm();
        }
        if let SeekMode::Seeking { target, .. } = self.state.mode {
            host.switch(Capability::ForcedFastForward).disarm();
            self.burst = None;
            self.state.mode = SeekMode::Idle;
            self.events.push(QuickLoadEvent::Cancelled { target });
            debug!(target, "Quick-load cancelled");
        }
    }

    /// Per-frame update. Ends the running burst once the host's clock has
    /// reached its end chapter, then plans the next one or completes.
    pub fn tick(&mut self, host: &mut dyn PlaybackHost, replay: &Replay) {
        let SeekMode::Seeking { target, .. } = self.state.mode else {
            return;
        };
        let Some(burst) = self.burst else {
            self.step(host, replay);
            return;
        };

        let reached = replay
            .chapters
            .get(burst.to)
            .is_none_or(|end| host.elapsed_ms() >= end.ms);
        if !reached {
            return;
        }

        host.switch(Capability::ForcedFastForward).disarm();
        self.burst = None;
        self.events.push(QuickLoadEvent::BurstFinished(burst));
        debug!(from = burst.from, to = burst.to, "Burst finished");

        if burst.final_burst {
            self.complete(host, replay, target);
        } else {
            self.step(host, replay);
        }
    }

    fn step(&mut self, host: &mut dyn PlaybackHost, replay: &Replay) {
        let SeekMode::Seeking { target, cursor } = self.state.mode else {
            return;
        };
        let burst = plan_burst(&replay.chapters, target, cursor, self.settings.countdown_clamp);
        self.state.mode = SeekMode::Seeking {
            target,
            cursor: burst.to,
        };

        if burst.from != 0
            && let Some(start) = replay.chapters.get(burst.from)
            && host.data_offset() < start.offset
        {
            jump_to_chapter(host, replay, burst.from);
        }
        host.switch(Capability::ForcedFastForward).arm();

        debug!(
            from = burst.from,
            to = burst.to,
            final_burst = burst.final_burst,
            "Burst started"
        );
        self.burst = Some(burst);
        self.events.push(QuickLoadEvent::BurstStarted(burst));
    }

    fn complete(&mut self, host: &mut dyn PlaybackHost, replay: &Replay, target: usize) {
        let actors_removed = host.remove_transient_actors();
        let start = replay
            .chapters
            .find_previous_chapter_type(target, ChapterKind::StartOrRestart);
        jump_to_time_before_chapter(host, replay, start, self.settings.lead_in_ms);

        self.state.mode = SeekMode::Idle;
        let resume_ms = host.elapsed_ms();
        debug!(target, actors_removed, resume_ms, "Quick-load complete");
        self.events.push(QuickLoadEvent::Completed {
            target,
            cursor: target,
            actors_removed,
            resume_ms,
        });
    }
}

/// Choose the next burst towards `target`, searching from `cursor`.
///
/// An event cutscene more than one chapter before `target` yields an interim
/// burst up to the countdown after it, or `countdown_clamp` chapters past it
/// when no countdown is that close. Otherwise the final burst starts at the
/// start chapter one checkpoint before `target`.
pub fn plan_burst(
    chapters: &ChapterIndex,
    target: usize,
    cursor: usize,
    countdown_clamp: usize,
) -> Burst {
    let clamp = countdown_clamp.max(1);
    let cutscene = (cursor..target.saturating_sub(1))
        .find(|&i| chapters.get(i).is_some_and(|c| c.kind == ChapterKind::EventCutscene));

    match cutscene {
        Some(event) => {
            let countdown = chapters
                .find_next_chapter_type(event, ChapterKind::Countdown)
                .filter(|&c| c <= event + clamp)
                .unwrap_or(event + clamp);
            Burst {
                from: event,
                to: countdown.min(target),
                final_burst: false,
            }
        }
        None => Burst {
            from: chapters.previous_start_chapter(target),
            to: target,
            final_burst: true,
        },
    }
}
