// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::{DEFAULT_MAX_CHAIN, Entry, IFD, Result, TiffError, TiffHeader, Value};
use crate::{bits::Endian, tags::TiffTag};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::warn;
use std::{
  collections::HashSet,
  io::{Read, Seek, SeekFrom},
};

pub trait TiffReader {
  fn header(&self) -> &TiffHeader;

  fn chain(&self) -> &Vec<IFD>;

  fn get_endian(&self) -> Endian {
    self.header().endian
  }

  /// Returns a list of well-known tags representing SubIFDs.
  fn wellknown_sub_ifd_tags(&self) -> Vec<u16> {
    vec![crate::tags::TiffCommonTag::SubIFDs.into(), crate::tags::TiffCommonTag::ExifIFDPointer.into()]
  }

  fn root_ifd(&self) -> Option<&IFD> {
    self.chain().first()
  }

  /// Search the IFD chain (not sub IFDs) for the first entry of `tag`
  fn get_entry<T: TiffTag>(&self, tag: T) -> Option<(&Entry, Option<&Value>)> {
    let tag = tag.into();
    self.chain().iter().find_map(|ifd| ifd.get_entry(tag).map(|entry| (entry, ifd.get_value(tag))))
  }

  fn get_value<T: TiffTag>(&self, tag: T) -> Option<&Value> {
    let tag = tag.into();
    self.chain().iter().find_map(|ifd| ifd.get_value(tag))
  }

  fn has_entry<T: TiffTag>(&self, tag: T) -> bool {
    self.get_entry(tag).is_some()
  }

  /// All IFDs in chain and their sub IFDs containing `tag`
  fn find_ifds_with_tag<T: TiffTag>(&self, tag: T) -> Vec<&IFD> {
    let tag = tag.into();
    let mut ifds = Vec::new();
    for ifd in self.chain() {
      if ifd.has_entry(tag) {
        ifds.push(ifd);
      }
      // Now search in all sub IFDs
      for subs in ifd.sub.values() {
        for ifd in subs {
          if ifd.has_entry(tag) {
            ifds.push(ifd);
          }
        }
      }
    }
    ifds
  }

  fn find_first_ifd_with_tag<T: TiffTag>(&self, tag: T) -> Option<&IFD> {
    self.find_ifds_with_tag(tag).into_iter().next()
  }
}

/// Reader for TIFF files
#[derive(Debug, Clone, PartialEq)]
pub struct GenericTiffReader {
  header: TiffHeader,
  chain: Vec<IFD>,
  /// Non-fatal problems: an unreliable header marker or the error
  /// that terminated the IFD chain early.
  pub warnings: Vec<TiffError>,
}

impl TiffReader for GenericTiffReader {
  fn header(&self) -> &TiffHeader {
    &self.header
  }

  fn chain(&self) -> &Vec<IFD> {
    &self.chain
  }
}

impl GenericTiffReader {
  /// Check if buffer starts with a TIFF byte order marker
  pub fn is_tiff<T: AsRef<[u8]>>(buffer: T) -> bool {
    matches!(buffer.as_ref().get(..2), Some(b"II") | Some(b"MM"))
  }

  /// Construct a TIFF reader from Read capable objects
  ///
  /// Only a bad header is fatal. If an IFD in the chain can't be decoded,
  /// the chain ends there and the error is kept in `warnings` together with
  /// all IFDs decoded before.
  pub fn new<R: Read + Seek>(file: &mut R, max_chained: Option<usize>, sub_tags: &[u16]) -> Result<Self> {
    file.seek(SeekFrom::Start(0))?;
    let (header, warning) = TiffHeader::read(file)?;
    let mut ins = Self {
      header,
      chain: Vec::new(),
      warnings: warning.into_iter().collect(),
    };
    let mut multi_sub_tags = ins.wellknown_sub_ifd_tags();
    multi_sub_tags.extend_from_slice(sub_tags);
    ins.parse_chain(file, max_chained.unwrap_or(DEFAULT_MAX_CHAIN), &multi_sub_tags);
    Ok(ins)
  }

  fn parse_chain<R: Read + Seek>(&mut self, file: &mut R, max_chained: usize, sub_tags: &[u16]) {
    let mut visited = HashSet::new();
    let mut next_ifd = self.header.first_ifd;
    while next_ifd != 0 {
      if !visited.insert(next_ifd) {
        warn!("TIFF IFD chain loops back to offset {}, stop here", next_ifd);
        self.warnings.push(TiffError::CyclicChain(next_ifd));
        break;
      }
      if self.chain.len() >= max_chained {
        warn!("TIFF IFD chain limit of {} reached, IFD at offset {} is dropped", max_chained, next_ifd);
        self
          .warnings
          .push(TiffError::General(format!("IFD chain limit of {} reached, next IFD at {} dropped", max_chained, next_ifd)));
        break;
      }
      match IFD::read(file, next_ifd, 0, self.header.endian, sub_tags) {
        Ok(ifd) => {
          next_ifd = ifd.next_ifd;
          self.chain.push(ifd);
        }
        Err(err) => {
          warn!("Failed to read TIFF IFD at offset {}, chain ends here: {}", next_ifd, err);
          self.warnings.push(err);
          break;
        }
      }
    }
  }

  pub fn little_endian(&self) -> bool {
    self.header.endian.little()
  }
}

pub trait ReadByteOrder {
  fn read_u8(&mut self) -> std::io::Result<u8>;
  fn read_u16(&mut self) -> std::io::Result<u16>;
  fn read_u32(&mut self) -> std::io::Result<u32>;

  fn read_u8_into(&mut self, dst: &mut [u8]) -> std::io::Result<()>;
  fn read_u16_into(&mut self, dst: &mut [u16]) -> std::io::Result<()>;
  fn read_i16_into(&mut self, dst: &mut [i16]) -> std::io::Result<()>;
  fn read_u32_into(&mut self, dst: &mut [u32]) -> std::io::Result<()>;
  fn read_i32_into(&mut self, dst: &mut [i32]) -> std::io::Result<()>;
}

/// Reader that applies a fixed byte order to every read
pub struct EndianReader<'a, R: Read + Seek + 'a> {
  endian: Endian,
  inner: &'a mut R,
}

impl<'a, R: Read + Seek + 'a> EndianReader<'a, R> {
  pub fn new(inner: &'a mut R, endian: Endian) -> Self {
    Self { endian, inner }
  }

  pub fn endian(&self) -> Endian {
    self.endian
  }

  pub fn into_inner(self) -> &'a mut R {
    self.inner
  }

  pub fn position(&mut self) -> Result<u32> {
    Ok(self.inner.stream_position().map(|v| v as u32)?)
  }

  pub fn goto(&mut self, offset: u32) -> Result<()> {
    self.inner.seek(SeekFrom::Start(offset as u64))?;
    Ok(())
  }
}

impl<'a, R: Read + Seek + 'a> ReadByteOrder for EndianReader<'a, R> {
  fn read_u8(&mut self) -> std::io::Result<u8> {
    self.inner.read_u8()
  }

  fn read_u16(&mut self) -> std::io::Result<u16> {
    match self.endian {
      Endian::Little => self.inner.read_u16::<LittleEndian>(),
      Endian::Big => self.inner.read_u16::<BigEndian>(),
    }
  }

  fn read_u32(&mut self) -> std::io::Result<u32> {
    match self.endian {
      Endian::Little => self.inner.read_u32::<LittleEndian>(),
      Endian::Big => self.inner.read_u32::<BigEndian>(),
    }
  }

  fn read_u8_into(&mut self, dst: &mut [u8]) -> std::io::Result<()> {
    self.inner.read_exact(dst)
  }

  fn read_u16_into(&mut self, dst: &mut [u16]) -> std::io::Result<()> {
    match self.endian {
      Endian::Little => self.inner.read_u16_into::<LittleEndian>(dst),
      Endian::Big => self.inner.read_u16_into::<BigEndian>(dst),
    }
  }

  fn read_i16_into(&mut self, dst: &mut [i16]) -> std::io::Result<()> {
    match self.endian {
      Endian::Little => self.inner.read_i16_into::<LittleEndian>(dst),
      Endian::Big => self.inner.read_i16_into::<BigEndian>(dst),
    }
  }

  fn read_u32_into(&mut self, dst: &mut [u32]) -> std::io::Result<()> {
    match self.endian {
      Endian::Little => self.inner.read_u32_into::<LittleEndian>(dst),
      Endian::Big => self.inner.read_u32_into::<BigEndian>(dst),
    }
  }

  fn read_i32_into(&mut self, dst: &mut [i32]) -> std::io::Result<()> {
    match self.endian {
      Endian::Little => self.inner.read_i32_into::<LittleEndian>(dst),
      Endian::Big => self.inner.read_i32_into::<BigEndian>(dst),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  #[test]
  fn endian_reader_honors_byte_order() {
    let data = [0x12_u8, 0x34, 0x56, 0x78];
    let mut cursor = Cursor::new(&data[..]);
    assert_eq!(EndianReader::new(&mut cursor, Endian::Little).read_u32().unwrap(), 0x78563412);
    cursor.set_position(0);
    assert_eq!(EndianReader::new(&mut cursor, Endian::Big).read_u32().unwrap(), 0x12345678);
    cursor.set_position(0);
    let mut reader = EndianReader::new(&mut cursor, Endian::Big);
    let mut v = [0_i16; 2];
    reader.read_i16_into(&mut v).unwrap();
    assert_eq!(v, [0x1234, 0x5678]);
    assert_eq!(reader.position().unwrap(), 4);
  }

  #[test]
  fn is_tiff_checks_marker() {
    assert!(GenericTiffReader::is_tiff(b"II*\0"));
    assert!(GenericTiffReader::is_tiff(b"MM\0*"));
    assert!(!GenericTiffReader::is_tiff(b"I"));
    assert!(!GenericTiffReader::is_tiff(b"\xff\xd8"));
  }
}
