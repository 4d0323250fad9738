//! Binary replay format
//!
//! Fixed-layout, little-endian. The header and chapter index have a constant
//! size for the current format version, so the segment stream always starts
//! at [`DATA_START`](crate::replay::types::DATA_START).
//!
//! # File Structure
//!
//! ```text
//! +------------------------------------------------+
//! | Header (0x60 bytes)                            |
//! |  0x00 magic: [u8; 12]   "FFXIVREPLAY\0"        |
//! |  0x0C format_version: u16                      |
//! |  0x0E format_revision: u16                     |
//! |  0x10 replay_version: i32                      |
//! |  0x14 timestamp: u32                           |
//! |  0x18 unknown: u32                             |
//! |  0x1C total_ms: u32                            |
//! |  0x20 content_id: u16                          |
//! |  0x28 info: u8                                 |
//! |  0x30 owner_id: u64                            |
//! |  0x38 jobs: [u8; 8]                            |
//! |  0x40 player_index: u8                         |
//! |  0x44 unknown: i32                             |
//! |  0x48 replay_length: i32                       |
//! |  0x4E npc_names: [u16; 7]                      |
//! +------------------------------------------------+
//! | Chapter index (0x304 bytes)                    |
//! |  count: u32                                    |
//! |  64 x { kind: i32, offset: u32, ms: u32 }      |
//! +------------------------------------------------+
//! | Segment stream (replay_length bytes)           |
//! |  { opcode: u16, len: u16, ms: u32,             |
//! |    subject_id: u32, payload: [u8; len] } ...   |
//! +------------------------------------------------+
//! ```
//!
//! Bytes not listed above are zero when written and ignored when read.

mod reader;
mod writer;

pub use reader::{
    BinaryReader, decode_full, decode_header_and_chapters, parse_replay, read_replay_info,
    read_segment,
};
pub use writer::BinaryWriter;

use std::io;

/// Errors produced while decoding or encoding replay bytes
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Input ended before a fixed-size section was complete
    #[error("replay truncated: {section} needs {needed} bytes")]
    Truncated {
        section: &'static str,
        needed: usize,
    },

    /// Magic literal did not match
    #[error("not a replay file (bad magic)")]
    BadMagic,

    /// Segment payload does not fit the 16-bit length field
    #[error("segment payload of {0} bytes exceeds the 65535 byte limit")]
    PayloadTooLarge(usize),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FormatError {
    /// Map an EOF from `read_exact` onto a truncation of `section`.
    pub(crate) fn from_read(err: io::Error, section: &'static str, needed: usize) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated { section, needed }
        } else {
            Self::Io(err)
        }
    }
}
