//! Chapter index queries
//!
//! The index is small and bounded, so every query is a linear scan.
//! Type searches never report index 0 as a match: chapter 0 is the start of
//! the recording and doubles as the "not found" answer.

use serde::{Deserialize, Serialize};

use super::types::{ChapterIndex, ChapterKind};

/// Minimum length of a fight section to count as a pull.
pub const MIN_PULL_MS: u32 = 30_000;

/// Pull statistics of a recording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullInfo {
    /// Sections longer than [`MIN_PULL_MS`]
    pub pulls: u32,
    /// Longest section in ms
    pub longest_pull_ms: u32,
}

impl ChapterIndex {
    /// Greatest chapter whose timestamp is `<= ms`, or 0.
    pub fn find_previous_chapter_from_time(&self, ms: u32) -> usize {
        (1..self.len())
            .rev()
            .find(|&i| self.as_slice()[i].ms <= ms)
            .unwrap_or(0)
    }

    /// Nearest chapter of `kind` at or before `chapter`, or 0.
    pub fn find_previous_chapter_type(&self, chapter: usize, kind: ChapterKind) -> usize {
        let last = chapter.min(self.len().saturating_sub(1));
        (1..=last)
            .rev()
            .find(|&i| self.as_slice()[i].kind == kind)
            .unwrap_or(0)
    }

    /// Nearest chapter of `kind` strictly after `chapter`.
    pub fn find_next_chapter_type(&self, chapter: usize, kind: ChapterKind) -> Option<usize> {
        (chapter + 1..self.len()).find(|&i| self.as_slice()[i].kind == kind)
    }

    /// The start chapter one full checkpoint before the one enclosing
    /// `chapter`.
    ///
    /// Skips the start that `chapter` itself belongs to and lands on the
    /// previous one, or 0.
    pub fn previous_start_chapter(&self, chapter: usize) -> usize {
        match self.find_previous_chapter_type(chapter, ChapterKind::StartOrRestart) {
            0 => 0,
            enclosing => {
                self.find_previous_chapter_type(enclosing - 1, ChapterKind::StartOrRestart)
            }
        }
    }

    /// Recording length as shown to the user; the first chapter's timestamp
    /// is the displayed zero.
    pub fn displayed_duration_ms(&self, total_ms: u32) -> u32 {
        let zero = self.get(0).map_or(0, |c| c.ms);
        total_ms.saturating_sub(zero)
    }

    /// Count pulls and find the longest one.
    ///
    /// A pull runs from a start chapter (or the countdown right after it)
    /// to the next start chapter, or to `total_ms` for the last one.
    pub fn pull_info(&self, total_ms: u32) -> PullInfo {
        let chapters = self.as_slice();
        let mut info = PullInfo::default();

        let mut j = 0;
        while j < chapters.len() {
            if j != 0 && chapters[j].kind != ChapterKind::StartOrRestart {
                j += 1;
                continue;
            }

            let mut begin = chapters[j];
            if chapters
                .get(j + 1)
                .is_some_and(|next| next.kind == ChapterKind::Countdown)
            {
                j += 1;
                begin = chapters[j];
            }

            let end = self
                .find_next_chapter_type(j, ChapterKind::StartOrRestart)
                .map_or(total_ms, |next| chapters[next].ms);
            let ms = end.saturating_sub(begin.ms);

            if ms > MIN_PULL_MS {
                info.pulls += 1;
            }
            info.longest_pull_ms = info.longest_pull_ms.max(ms);
            j += 1;
        }

        info
    }
}
