// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
  Big,
  #[default]
  Little,
}

impl Endian {
  #[inline]
  pub fn big(&self) -> bool {
    matches!(*self, Self::Big)
  }

  #[inline]
  pub fn little(&self) -> bool {
    matches!(*self, Self::Little)
  }

  #[inline]
  pub fn read_u16(&self, buf: &[u8], offset: usize) -> u16 {
    match *self {
      Self::Big => BigEndian::read_u16(&buf[offset..]),
      Self::Little => LittleEndian::read_u16(&buf[offset..]),
    }
  }

  #[inline]
  pub fn read_u32(&self, buf: &[u8], offset: usize) -> u32 {
    match *self {
      Self::Big => BigEndian::read_u32(&buf[offset..]),
      Self::Little => LittleEndian::read_u32(&buf[offset..]),
    }
  }

  #[inline]
  pub fn write_u16(&self, buf: &mut [u8], n: u16) {
    match *self {
      Self::Big => BigEndian::write_u16(buf, n),
      Self::Little => LittleEndian::write_u16(buf, n),
    }
  }

  #[inline]
  pub fn write_u32(&self, buf: &mut [u8], n: u32) {
    match *self {
      Self::Big => BigEndian::write_u32(buf, n),
      Self::Little => LittleEndian::write_u32(buf, n),
    }
  }
}

/// Extract `nbits` (at most 32) from `buf`, starting at `bit_offset`.
///
/// Bits are counted from the most significant bit of the first byte,
/// so a field may start and end anywhere inside a byte. Returns `None`
/// if the field does not fit into the buffer.
pub fn read_bits(buf: &[u8], bit_offset: usize, nbits: u32) -> Option<u32> {
  if nbits == 0 {
    return Some(0);
  }
  if nbits > 32 {
    return None;
  }
  let end = bit_offset.checked_add(nbits as usize)?;
  if end > buf.len() * 8 {
    return None;
  }
  let first = bit_offset >> 3;
  let last = (end - 1) >> 3;
  // A 32 bit field spans at most 5 bytes
  let acc = buf[first..=last].iter().fold(0_u64, |acc, b| (acc << 8) | *b as u64);
  let tail = (last + 1) * 8 - end;
  Some(((acc >> tail) & ((1_u64 << nbits) - 1)) as u32)
}

/// Store the lower `nbits` of `value` into `buf` at `bit_offset`, MSB first.
///
/// This is the inverse of [`read_bits`]. Bits outside the field are
/// left untouched.
pub fn write_bits(buf: &mut [u8], bit_offset: usize, nbits: u32, value: u32) {
  debug_assert!(nbits <= 32);
  debug_assert!(bit_offset + nbits as usize <= buf.len() * 8);
  for i in 0..nbits as usize {
    let bit = (value >> (nbits as usize - 1 - i)) & 1;
    let pos = bit_offset + i;
    let mask = 0x80_u8 >> (pos & 7);
    if bit == 1 {
      buf[pos >> 3] |= mask;
    } else {
      buf[pos >> 3] &= !mask;
    }
  }
}
