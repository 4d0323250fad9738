//! Binary replay format writer
//!
//! Writes header, chapter index and segment records in the fixed layout
//! described in [`crate::replay::binary`].

use super::FormatError;
use super::reader::parse_replay;
use crate::replay::types::*;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Cursor, Seek, SeekFrom, Write};

/// Writer for binary replay format
pub struct BinaryWriter<W: Write> {
    writer: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new binary writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete replay file
    ///
    /// The header's `replay_length` is replaced by the encoded size of
    /// `records`.
    pub fn write_replay(
        &mut self,
        header: &ReplayHeader,
        chapters: &ChapterIndex,
        records: &[SegmentRecord],
    ) -> Result<(), FormatError> {
        let stream_len: usize = records.iter().map(SegmentRecord::encoded_len).sum();
        let header = ReplayHeader {
            replay_length: i32::try_from(stream_len).unwrap_or(i32::MAX),
            ..header.clone()
        };

        self.write_header(&header)?;
        self.write_chapters(chapters)?;
        for record in records {
            self.write_segment(&record.as_segment())?;
        }
        Ok(())
    }

    /// Write the 0x60-byte header
    pub fn write_header(&mut self, header: &ReplayHeader) -> io::Result<()> {
        let mut bytes = [0u8; HEADER_SIZE];
        let mut cursor = Cursor::new(&mut bytes[..]);

        cursor.write_all(&header.magic)?;
        cursor.write_u16::<LittleEndian>(header.format_version)?;
        cursor.write_u16::<LittleEndian>(header.format_revision)?;
        cursor.write_i32::<LittleEndian>(header.replay_version)?;
        cursor.write_u32::<LittleEndian>(header.timestamp)?;
        cursor.write_u32::<LittleEndian>(header.unknown_0x18)?;
        cursor.write_u32::<LittleEndian>(header.total_ms)?;
        cursor.write_u16::<LittleEndian>(header.content_id)?;

        cursor.seek(SeekFrom::Start(0x28))?;
        cursor.write_u8(header.info.bits())?;

        cursor.seek(SeekFrom::Start(0x30))?;
        cursor.write_u64::<LittleEndian>(header.owner_id)?;
        cursor.write_all(&header.jobs)?;
        cursor.write_u8(header.player_index)?;

        cursor.seek(SeekFrom::Start(0x44))?;
        cursor.write_i32::<LittleEndian>(header.unknown_0x44)?;
        cursor.write_i32::<LittleEndian>(header.replay_length)?;

        cursor.seek(SeekFrom::Start(0x4E))?;
        for name in header.npc_names {
            cursor.write_u16::<LittleEndian>(name)?;
        }

        self.writer.write_all(&bytes)
    }

    /// Write the chapter index, zero-filling unused slots
    pub fn write_chapters(&mut self, chapters: &ChapterIndex) -> io::Result<()> {
        let mut bytes = [0u8; CHAPTER_INDEX_SIZE];
        let mut cursor = Cursor::new(&mut bytes[..]);

        cursor.write_u32::<LittleEndian>(chapters.len() as u32)?;
        for chapter in chapters.iter() {
            cursor.write_i32::<LittleEndian>(chapter.kind.to_raw())?;
            cursor.write_u32::<LittleEndian>(chapter.offset)?;
            cursor.write_u32::<LittleEndian>(chapter.ms)?;
        }

        self.writer.write_all(&bytes)
    }

    /// Write one data segment
    pub fn write_segment(&mut self, segment: &DataSegment<'_>) -> Result<(), FormatError> {
        let payload_len = u16::try_from(segment.payload.len())
            .map_err(|_| FormatError::PayloadTooLarge(segment.payload.len()))?;

        self.writer.write_u16::<LittleEndian>(segment.opcode)?;
        self.writer.write_u16::<LittleEndian>(payload_len)?;
        self.writer.write_u32::<LittleEndian>(segment.ms)?;
        self.writer.write_u32::<LittleEndian>(segment.subject_id)?;
        self.writer.write_all(segment.payload)?;
        Ok(())
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl Replay {
    /// Build an in-memory replay from its parts.
    ///
    /// The declared stream length is computed from `records`.
    pub fn from_parts(
        header: ReplayHeader,
        chapters: ChapterIndex,
        records: &[SegmentRecord],
    ) -> Result<Replay, FormatError> {
        let mut data = Vec::new();
        BinaryWriter::new(&mut data).write_replay(&header, &chapters, records)?;
        parse_replay(data)
    }
}
