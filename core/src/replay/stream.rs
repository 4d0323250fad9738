//! Segment stream traversal
//!
//! There is no secondary index over segments: locating a time means
//! scanning forward from the nearest chapter offset.

use super::binary::read_segment;
use super::types::{DataSegment, Replay};

/// A time resolved to a concrete stream position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLocation {
    /// Last chapter starting at or before the requested time
    pub chapter: usize,
    /// Byte offset of the first segment at or after the requested time
    pub offset: u32,
    /// Timestamp of that segment
    pub ms: u32,
}

impl Replay {
    /// Segment starting `offset` bytes into the stream.
    pub fn segment_at(&self, offset: u32) -> Option<DataSegment<'_>> {
        read_segment(&self.data, self.stream_len(), offset)
    }

    /// Iterate segments from `offset` until the end or the first corrupt one.
    pub fn segments_from(&self, offset: u32) -> Segments<'_> {
        Segments {
            replay: self,
            offset,
        }
    }

    /// First segment at or after `ms`, scanning from `from_offset`.
    pub fn find_next_data_segment(
        &self,
        ms: u32,
        from_offset: u32,
    ) -> Option<(u32, DataSegment<'_>)> {
        self.segments_from(from_offset)
            .find(|(_, segment)| segment.ms >= ms)
    }

    /// Resolve `ms` to a stream position, anchored at the nearest chapter.
    pub fn locate_time(&self, ms: u32) -> Option<TimeLocation> {
        let chapter = self.chapters.find_previous_chapter_from_time(ms);
        let anchor = self.chapters.get(chapter).map_or(0, |c| c.offset);
        let (offset, segment) = self.find_next_data_segment(ms, anchor)?;
        Some(TimeLocation {
            chapter,
            offset,
            ms: segment.ms,
        })
    }
}

/// Iterator over `(offset, segment)` pairs
pub struct Segments<'a> {
    replay: &'a Replay,
    offset: u32,
}

impl<'a> Iterator for Segments<'a> {
    type Item = (u32, DataSegment<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.replay.segment_at(self.offset)?;
        let offset = self.offset;
        self.offset = offset.checked_add(segment.len() as u32)?;
        Some((offset, segment))
    }
}
