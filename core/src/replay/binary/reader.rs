//! Binary replay format reader
//!
//! Decodes the header and chapter index, and addresses segments by byte
//! offset inside a fully loaded buffer. Every offset-based access is checked
//! against the real buffer length as well as the header's declared length,
//! since the two disagree in truncated files.

use super::FormatError;
use crate::replay::types::*;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Reader for binary replay format
pub struct BinaryReader<R: Read> {
    reader: R,
}

impl<R: Read> BinaryReader<R> {
    /// Create a new binary reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read header and chapter index, rejecting a bad magic.
    pub fn read_header_and_chapters(&mut self) -> Result<(ReplayHeader, ChapterIndex), FormatError> {
        let header = self.read_header()?;
        if !header.is_valid() {
            return Err(FormatError::BadMagic);
        }
        let chapters = self.read_chapters()?;
        Ok((header, chapters))
    }

    /// Read the 0x60-byte header
    pub fn read_header(&mut self) -> Result<ReplayHeader, FormatError> {
        let mut bytes = [0u8; HEADER_SIZE];
        self.reader
            .read_exact(&mut bytes)
            .map_err(|e| FormatError::from_read(e, "header", HEADER_SIZE))?;

        let mut cursor = Cursor::new(&bytes[..]);
        let mut magic = [0u8; 12];
        cursor.read_exact(&mut magic)?;

        cursor.seek(SeekFrom::Start(0x0C))?;
        let format_version = cursor.read_u16::<LittleEndian>()?;
        let format_revision = cursor.read_u16::<LittleEndian>()?;
        let replay_version = cursor.read_i32::<LittleEndian>()?;
        let timestamp = cursor.read_u32::<LittleEndian>()?;
        let unknown_0x18 = cursor.read_u32::<LittleEndian>()?;
        let total_ms = cursor.read_u32::<LittleEndian>()?;
        let content_id = cursor.read_u16::<LittleEndian>()?;

        cursor.seek(SeekFrom::Start(0x28))?;
        let info = ReplayInfoFlags::from_bits_retain(cursor.read_u8()?);

        cursor.seek(SeekFrom::Start(0x30))?;
        let owner_id = cursor.read_u64::<LittleEndian>()?;
        let mut jobs = [0u8; 8];
        cursor.read_exact(&mut jobs)?;
        let player_index = cursor.read_u8()?;

        cursor.seek(SeekFrom::Start(0x44))?;
        let unknown_0x44 = cursor.read_i32::<LittleEndian>()?;
        let replay_length = cursor.read_i32::<LittleEndian>()?;

        cursor.seek(SeekFrom::Start(0x4E))?;
        let mut npc_names = [0u16; 7];
        cursor.read_u16_into::<LittleEndian>(&mut npc_names)?;

        Ok(ReplayHeader {
            magic,
            format_version,
            format_revision,
            replay_version,
            timestamp,
            unknown_0x18,
            total_ms,
            content_id,
            info,
            owner_id,
            jobs,
            player_index,
            unknown_0x44,
            replay_length,
            npc_names,
        })
    }

    /// Read the fixed-size chapter index
    ///
    /// All 64 slots are consumed; only the first `count` are kept.
    pub fn read_chapters(&mut self) -> Result<ChapterIndex, FormatError> {
        let mut bytes = [0u8; CHAPTER_INDEX_SIZE];
        self.reader
            .read_exact(&mut bytes)
            .map_err(|e| FormatError::from_read(e, "chapter index", CHAPTER_INDEX_SIZE))?;

        let mut cursor = Cursor::new(&bytes[..]);
        let count = cursor.read_u32::<LittleEndian>()? as usize;
        if count > MAX_CHAPTERS {
            tracing::warn!(count, "chapter count exceeds capacity, clamping");
        }

        let mut chapters = ChapterIndex::new();
        for _ in 0..count.min(MAX_CHAPTERS) {
            let kind = ChapterKind::from_raw(cursor.read_i32::<LittleEndian>()?);
            let offset = cursor.read_u32::<LittleEndian>()?;
            let ms = cursor.read_u32::<LittleEndian>()?;
            chapters.push(Chapter::new(kind, offset, ms));
        }

        Ok(chapters)
    }
}

/// Decode a complete replay from an owned file buffer.
pub fn parse_replay(data: Vec<u8>) -> Result<Replay, FormatError> {
    let (header, chapters) = BinaryReader::new(data.as_slice()).read_header_and_chapters()?;

    let available = data.len() - DATA_START;
    if available < header.stream_len() {
        tracing::warn!(
            declared = header.stream_len(),
            available,
            "segment stream shorter than declared"
        );
    }
    if !chapters.is_monotonic() {
        tracing::warn!("chapter index is not ordered by offset and time");
    }

    Ok(Replay {
        header,
        chapters,
        data,
    })
}

/// Decode header and chapter index only. Returns `None` on short input or
/// bad magic.
pub fn decode_header_and_chapters(bytes: &[u8]) -> Option<(ReplayHeader, ChapterIndex)> {
    BinaryReader::new(bytes)
        .read_header_and_chapters()
        .inspect_err(|e| tracing::debug!("header decode failed: {e}"))
        .ok()
}

/// Decode a full replay, taking ownership of the file bytes.
pub fn decode_full(data: Vec<u8>) -> Option<Replay> {
    parse_replay(data)
        .inspect_err(|e| tracing::debug!("replay decode failed: {e}"))
        .ok()
}

/// Read only header and chapter index from a file on disk.
///
/// Used for listings; the segment stream is never touched.
pub fn read_replay_info(path: &Path) -> Option<(ReplayHeader, ChapterIndex)> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("failed to open {}: {e}", path.display());
            return None;
        }
    };
    match BinaryReader::new(file).read_header_and_chapters() {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!("skipping {}: {e}", path.display());
            None
        }
    }
}

/// Locate the segment starting `offset` bytes into the segment stream.
///
/// Returns `None` past the declared stream length, and for any segment
/// whose header or payload would extend beyond the declared stream or the
/// buffer itself. A corrupt tail reads as end-of-stream.
pub fn read_segment(data: &[u8], declared_len: usize, offset: u32) -> Option<DataSegment<'_>> {
    let offset = offset as usize;
    if offset >= declared_len {
        return None;
    }

    let stream_end = DATA_START.saturating_add(declared_len).min(data.len());
    let start = DATA_START.checked_add(offset)?;
    let payload_start = start.checked_add(SEGMENT_HEADER_SIZE)?;
    if payload_start > stream_end {
        tracing::debug!(offset, "segment header crosses end of stream");
        return None;
    }

    let head = &data[start..payload_start];
    let opcode = LittleEndian::read_u16(&head[0..2]);
    let payload_len = LittleEndian::read_u16(&head[2..4]) as usize;
    let ms = LittleEndian::read_u32(&head[4..8]);
    let subject_id = LittleEndian::read_u32(&head[8..12]);

    let payload_end = payload_start + payload_len;
    if payload_end > stream_end {
        tracing::debug!(offset, payload_len, "segment payload crosses end of stream");
        return None;
    }

    Some(DataSegment {
        opcode,
        ms,
        subject_id,
        payload: &data[payload_start..payload_end],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::binary::writer::BinaryWriter;

    fn sample_header() -> ReplayHeader {
        ReplayHeader {
            replay_version: 0x1234,
            timestamp: 1_700_000_000,
            unknown_0x18: 0xAABB,
            total_ms: 654_321,
            content_id: 1010,
            info: ReplayInfoFlags::UP_TO_DATE | ReplayInfoFlags::COMPLETED,
            owner_id: 0x0040_0000_DEAD_BEEF,
            jobs: [19, 24, 33, 38, 0, 0, 0, 0],
            player_index: 2,
            unknown_0x44: 772,
            npc_names: [1, 2, 3, 4, 5, 6, 7],
            ..Default::default()
        }
    }

    fn sample_chapters() -> ChapterIndex {
        ChapterIndex::from_chapters([
            Chapter::new(ChapterKind::StartOrRestart, 0, 0),
            Chapter::new(ChapterKind::Countdown, 48, 12_000),
            Chapter::new(ChapterKind::EventCutscene, 96, 30_500),
            Chapter::new(ChapterKind::BarrierDown, 200, 41_000),
        ])
    }

    #[test]
    fn test_header_and_chapters_roundtrip() {
        let header = sample_header();
        let chapters = sample_chapters();

        let mut buffer = Vec::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_header(&header).unwrap();
        writer.write_chapters(&chapters).unwrap();
        assert_eq!(buffer.len(), DATA_START);

        let (parsed_header, parsed_chapters) = decode_header_and_chapters(&buffer).unwrap();
        assert_eq!(parsed_header, header);
        assert_eq!(parsed_chapters, chapters);
        assert!(parsed_chapters.is_monotonic());
    }

    #[test]
    fn test_header_field_offsets() {
        let mut buffer = Vec::new();
        BinaryWriter::new(&mut buffer)
            .write_header(&sample_header())
            .unwrap();

        assert_eq!(buffer.len(), HEADER_SIZE);
        assert_eq!(&buffer[0..11], b"FFXIVREPLAY");
        assert_eq!(buffer[11], 0);
        assert_eq!(LittleEndian::read_u16(&buffer[0x0C..]), FORMAT_VERSION);
        assert_eq!(LittleEndian::read_i32(&buffer[0x10..]), 0x1234);
        assert_eq!(LittleEndian::read_u32(&buffer[0x14..]), 1_700_000_000);
        assert_eq!(LittleEndian::read_u32(&buffer[0x1C..]), 654_321);
        assert_eq!(buffer[0x28], 0b101);
        assert_eq!(buffer[0x3A], 33);
        assert_eq!(buffer[0x40], 2);
    }

    #[test]
    fn test_short_input_returns_none() {
        let mut buffer = Vec::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_header(&sample_header()).unwrap();
        writer.write_chapters(&sample_chapters()).unwrap();

        assert!(decode_header_and_chapters(&buffer[..HEADER_SIZE - 1]).is_none());
        assert!(decode_header_and_chapters(&buffer[..DATA_START - 1]).is_none());

        let err = BinaryReader::new(&buffer[..DATA_START - 1])
            .read_header_and_chapters()
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::Truncated {
                section: "chapter index",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_magic_returns_none() {
        let mut buffer = Vec::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_header(&sample_header()).unwrap();
        writer.write_chapters(&sample_chapters()).unwrap();
        buffer[0] = b'X';

        assert!(decode_header_and_chapters(&buffer).is_none());
        assert!(decode_full(buffer).is_none());
    }

    #[test]
    fn test_chapter_count_is_clamped() {
        let mut buffer = Vec::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_header(&sample_header()).unwrap();
        writer.write_chapters(&sample_chapters()).unwrap();
        LittleEndian::write_u32(&mut buffer[HEADER_SIZE..], 500);

        let (_, chapters) = decode_header_and_chapters(&buffer).unwrap();
        assert_eq!(chapters.len(), MAX_CHAPTERS);
    }

    fn replay_with(records: &[SegmentRecord]) -> Replay {
        Replay::from_parts(sample_header(), sample_chapters(), records).unwrap()
    }

    #[test]
    fn test_segment_lookup_at_boundaries() {
        let records = [
            SegmentRecord::new(0x0142, 100, 0x1000_0001, vec![1, 2, 3, 4]),
            SegmentRecord::new(0x0143, 200, 0x4000_0002, vec![5; 20]),
            SegmentRecord::new(0x0144, 300, 0x4000_0003, Vec::new()),
        ];
        let replay = replay_with(&records);
        let len = replay.stream_len();
        assert_eq!(len, 16 + 32 + 12);

        let first = read_segment(replay.as_bytes(), len, 0).unwrap();
        assert_eq!(first.opcode, 0x0142);
        assert_eq!(first.payload, &[1, 2, 3, 4]);

        let second = read_segment(replay.as_bytes(), len, first.len() as u32).unwrap();
        assert_eq!(second.subject_id, 0x4000_0002);

        assert!(read_segment(replay.as_bytes(), len, len as u32).is_none());

        let last_offset = (len - SEGMENT_HEADER_SIZE) as u32;
        let last = read_segment(replay.as_bytes(), len, last_offset).unwrap();
        assert!(last.payload.len() <= len - last_offset as usize - SEGMENT_HEADER_SIZE);
        assert_eq!(last.ms, 300);
    }

    #[test]
    fn test_truncated_payload_reads_as_end_of_stream() {
        let records = [
            SegmentRecord::new(1, 100, 1, vec![0; 8]),
            SegmentRecord::new(2, 200, 2, vec![0; 64]),
        ];
        let mut bytes = replay_with(&records).as_bytes().to_vec();
        bytes.truncate(bytes.len() - 10);
        let replay = decode_full(bytes).unwrap();

        assert!(replay.available_stream_len() < replay.stream_len());
        assert!(read_segment(replay.as_bytes(), replay.stream_len(), 0).is_some());
        assert!(read_segment(replay.as_bytes(), replay.stream_len(), 20).is_none());
    }

    #[test]
    fn test_payload_length_beyond_declared_length() {
        let records = [SegmentRecord::new(1, 100, 1, vec![0; 8])];
        let mut bytes = replay_with(&records).as_bytes().to_vec();
        // Claim a payload far larger than the stream
        LittleEndian::write_u16(&mut bytes[DATA_START + 2..], 4000);
        bytes.extend_from_slice(&[0; 64]);
        let replay = decode_full(bytes).unwrap();

        assert!(read_segment(replay.as_bytes(), replay.stream_len(), 0).is_none());
    }

    #[test]
    fn test_read_replay_info_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duty.dat");
        let replay = replay_with(&[SegmentRecord::new(1, 1, 1, vec![9])]);
        std::fs::write(&path, replay.as_bytes()).unwrap();

        let (header, chapters) = read_replay_info(&path).unwrap();
        assert_eq!(header.content_id, 1010);
        assert_eq!(chapters.len(), 4);

        assert!(read_replay_info(&dir.path().join("missing.dat")).is_none());
    }
}
