// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;
use serde::{Deserialize, Serialize};

use super::{Result, TIFF_MAGIC, TiffError};
use crate::bits::Endian;

/// The 8 byte TIFF header at document start
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiffHeader {
  pub endian: Endian,
  pub magic: u16,
  pub first_ifd: u32,
}

impl TiffHeader {
  /// Read the header from the current reader position.
  ///
  /// An unknown byte order marker is fatal. A magic value other than 42
  /// is not: the header is returned together with an
  /// [`TiffError::UnreliableOffset`] warning, because `first_ifd` can't be trusted.
  pub fn read<R: Read>(reader: &mut R) -> Result<(TiffHeader, Option<TiffError>)> {
    let endian = match reader.read_u16::<LittleEndian>()? {
      0x4949 => Endian::Little,
      0x4d4d => Endian::Big,
      x => {
        return Err(TiffError::MalformedHeader(x));
      }
    };
    let mut buf = [0; 6];
    reader.read_exact(&mut buf)?;
    let header = TiffHeader {
      endian,
      magic: endian.read_u16(&buf, 0),
      first_ifd: endian.read_u32(&buf, 2),
    };
    let warning = if header.magic != TIFF_MAGIC {
      warn!("Invalid magic marker for TIFF: {}, IFD offsets are unreliable", header.magic);
      Some(TiffError::UnreliableOffset(header.magic))
    } else {
      None
    };
    Ok((header, warning))
  }
}
