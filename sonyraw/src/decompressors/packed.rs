// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use crate::{SonyRawError, bits::Endian, decoders::decode_threaded, pixarray::PixU16};

/// Bytes per uncompressed block
pub const PACKED_BLOCK_SIZE: usize = 32;

/// Unpack 16 samples of 16 bit, stored in document byte order
pub fn unpack_block_16(block: &[u8], endian: Endian) -> crate::Result<[u16; 16]> {
  if block.len() < PACKED_BLOCK_SIZE {
    return Err(SonyRawError::TruncatedBlock {
      offset: 0,
      len: block.len(),
      expected: PACKED_BLOCK_SIZE,
    });
  }
  let mut out = [0; 16];
  for (i, pix) in out.iter_mut().enumerate() {
    *pix = endian.read_u16(block, i * 2);
  }
  Ok(out)
}

/// Decode uncompressed 16 bit samples, rows in parallel.
/// Rows that are cut off by the end of `buf` are reported and left zero
/// from the first missing sample.
pub fn decode_16(buf: &[u8], width: usize, height: usize, endian: Endian) -> (PixU16, Vec<SonyRawError>) {
  decode_threaded(width, height, &|out: &mut [u16], row| {
    let start = row * width * 2;
    let inb = buf.get(start..).unwrap_or(&[]);
    for (pix, bytes) in out.iter_mut().zip(inb.chunks_exact(2)) {
      *pix = endian.read_u16(bytes, 0);
    }
    let available = inb.len() / 2;
    if available < width {
      vec![SonyRawError::TruncatedBlock {
        offset: start + available * 2,
        len: inb.len() % 2,
        expected: (width - available) * 2,
      }]
    } else {
      Vec::new()
    }
  })
}
