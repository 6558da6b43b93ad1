// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Seek, SeekFrom};

use thiserror::Error;

pub mod entry;
pub mod header;
pub mod ifd;
pub mod reader;
pub mod value;

pub use entry::Entry;
pub use header::TiffHeader;
pub use ifd::{EntryIssue, IFD, MAX_SUB_IFDS};
pub use reader::{GenericTiffReader, TiffReader};
pub use value::{TagType, Value};

pub const TIFF_MAGIC: u16 = 42;

/// Default limit for the number of chained IFDs
pub const DEFAULT_MAX_CHAIN: usize = 64;

/// Error variants for TIFF structure parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TiffError {
  /// Byte order marker is neither "II" nor "MM"
  #[error("Malformed header: unknown byte order marker 0x{:04x}", _0)]
  MalformedHeader(u16),

  /// Header marker is not 42, offsets from header are unvalidated
  #[error("Unreliable offset: header marker is {}, expected 42", _0)]
  UnreliableOffset(u16),

  #[error("Unexpected end of file: {}", _0)]
  UnexpectedEof(String),

  #[error("Offset out of range: {}+{} exceeds document size {}", offset, len, limit)]
  OffsetOutOfRange { offset: u64, len: u64, limit: u64 },

  #[error("Division by zero in rational value of tag 0x{:04x}", _0)]
  DivideByZero(u16),

  #[error("IFD chain loops back to offset {}", _0)]
  CyclicChain(u32),

  #[error("General error: {}", _0)]
  General(String),

  #[error("I/O error: {}", _0)]
  Io(String),
}

impl From<std::io::Error> for TiffError {
  fn from(err: std::io::Error) -> Self {
    match err.kind() {
      std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof(err.to_string()),
      _ => Self::Io(err.to_string()),
    }
  }
}

impl TiffError {
  /// Structural errors stop IFD chain processing, all others are
  /// isolated to a single entry.
  pub fn is_structural(&self) -> bool {
    !matches!(self, Self::DivideByZero(_) | Self::UnreliableOffset(_))
  }
}

/// Result type for TIFF parsing
pub type Result<T> = std::result::Result<T, TiffError>;

pub(crate) fn apply_corr(offset: u32, corr: i32) -> u32 {
  ((offset as i64) + (corr as i64)) as u32
}

/// Total length of the stream, the cursor position is restored
pub(crate) fn stream_len<R: Read + Seek>(file: &mut R) -> Result<u64> {
  let pos = file.stream_position()?;
  let len = file.seek(SeekFrom::End(0))?;
  file.seek(SeekFrom::Start(pos))?;
  Ok(len)
}

/// Check that `offset..offset+len` is inside a document of size `limit`
pub(crate) fn check_range(offset: u64, len: u64, limit: u64) -> Result<()> {
  match offset.checked_add(len) {
    Some(end) if end <= limit => Ok(()),
    _ => Err(TiffError::OffsetOutOfRange { offset, len, limit }),
  }
}

/// Read `size` bytes at `offset`, the range is checked against
/// the document size before any allocation.
pub fn read_from_file<R: Read + Seek>(file: &mut R, offset: u64, size: u64) -> Result<Vec<u8>> {
  let limit = stream_len(file)?;
  check_range(offset, size, limit)?;
  file.seek(SeekFrom::Start(offset))?;
  let mut buf = vec![0; size as usize];
  file.read_exact(&mut buf)?;
  Ok(buf)
}
