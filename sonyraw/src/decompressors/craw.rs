// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Sony compressed raw blocks.
//!
//! Each 16 byte block encodes 16 samples: an 11 bit maximum, an 11 bit
//! minimum, the 4 bit positions of both and 14 deltas of 7 bit for the
//! other samples, in this order and MSB first.

use std::fmt::Display;

use crate::{
  Result, SonyRawError,
  bits::write_bits,
  decoders::decode_threaded,
  pixarray::PixU16,
  pumps::{BitPump, BitPumpMSB},
};

/// Bytes per compressed block
pub const CRAW_BLOCK_SIZE: usize = 16;
/// Samples per compressed block
pub const CRAW_BLOCK_SAMPLES: usize = 16;

const DELTA_COUNT: usize = 14;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CrawBlock {
  pub max: u16,
  pub min: u16,
  pub max_idx: u8,
  pub min_idx: u8,
  pub deltas: [u8; DELTA_COUNT],
}

impl CrawBlock {
  /// Unpack the block fields from the first 16 bytes of `buf`
  pub fn parse(buf: &[u8]) -> Result<Self> {
    if buf.len() < CRAW_BLOCK_SIZE {
      return Err(SonyRawError::TruncatedBlock {
        offset: 0,
        len: buf.len(),
        expected: CRAW_BLOCK_SIZE,
      });
    }
    let mut pump = BitPumpMSB::new(&buf[..CRAW_BLOCK_SIZE]);
    let max = pump.get_bits(11) as u16;
    let min = pump.get_bits(11) as u16;
    let max_idx = pump.get_bits(4) as u8;
    let min_idx = pump.get_bits(4) as u8;
    let mut deltas = [0; DELTA_COUNT];
    for delta in deltas.iter_mut() {
      *delta = pump.get_bits(7) as u8;
    }
    debug_assert_eq!(pump.bit_pos(), CRAW_BLOCK_SIZE * 8);
    Ok(Self {
      max,
      min,
      max_idx,
      min_idx,
      deltas,
    })
  }

  /// Multiplier for the deltas, `2^ceil(log2((max-min)/128))`.
  /// Differences up to 128 (and a max below min) give 1.
  pub fn scale(&self) -> u16 {
    let diff = self.max.saturating_sub(self.min);
    if diff <= 128 { 1 } else { diff.div_ceil(128).next_power_of_two() }
  }

  /// Reconstruct the 16 samples.
  ///
  /// Positions `max_idx` and `min_idx` get `max` and `min`, all other
  /// positions consume the deltas in order. If both indices are equal,
  /// `max` wins and the position left without a delta gets `min`.
  pub fn decompress(&self) -> [u16; CRAW_BLOCK_SAMPLES] {
    let mut out = [0; CRAW_BLOCK_SAMPLES];
    let scale = self.scale();
    let mut deltas = self.deltas.iter();
    for (i, pix) in out.iter_mut().enumerate() {
      *pix = if i == self.max_idx as usize {
        self.max
      } else if i == self.min_idx as usize {
        self.min
      } else {
        match deltas.next() {
          Some(delta) => self.min + *delta as u16 * scale,
          None => self.min,
        }
      };
    }
    out
  }

  /// Pack the fields into the 16 byte block layout.
  /// Values are truncated to their field width.
  pub fn pack(&self) -> [u8; CRAW_BLOCK_SIZE] {
    let mut buf = [0; CRAW_BLOCK_SIZE];
    write_bits(&mut buf, 0, 11, self.max as u32 & 0x7ff);
    write_bits(&mut buf, 11, 11, self.min as u32 & 0x7ff);
    write_bits(&mut buf, 22, 4, self.max_idx as u32 & 0xf);
    write_bits(&mut buf, 26, 4, self.min_idx as u32 & 0xf);
    for (i, delta) in self.deltas.iter().enumerate() {
      write_bits(&mut buf, 30 + i * 7, 7, *delta as u32 & 0x7f);
    }
    buf
  }
}

impl Display for CrawBlock {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:011b} {:011b} {:04b} {:04b}", self.max, self.min, self.max_idx, self.min_idx)?;
    for delta in &self.deltas {
      write!(f, " {:07b}", delta)?;
    }
    Ok(())
  }
}

/// Decode consecutive blocks from `src` into `out`.
///
/// A block that can't be decoded leaves its samples untouched and is
/// reported, decoding continues with the next block. `base` is the offset of
/// `src` in the whole buffer and is used for error reporting only.
pub fn decode_blocks(src: &[u8], out: &mut [u16], base: usize) -> Vec<SonyRawError> {
  let mut errors = Vec::new();
  for (i, (block, samples)) in src.chunks(CRAW_BLOCK_SIZE).zip(out.chunks_mut(CRAW_BLOCK_SAMPLES)).enumerate() {
    match CrawBlock::parse(block) {
      Ok(block) => {
        let pix = block.decompress();
        samples.copy_from_slice(&pix[..samples.len()]);
      }
      Err(SonyRawError::TruncatedBlock { len, expected, .. }) => errors.push(SonyRawError::TruncatedBlock {
        offset: base + i * CRAW_BLOCK_SIZE,
        len,
        expected,
      }),
      Err(err) => errors.push(err),
    }
  }
  errors
}

/// Decode a sequence of blocks into a row of samples
pub fn decode_row(src: &[u8]) -> (Vec<u16>, Vec<SonyRawError>) {
  let mut out = vec![0; src.len().div_ceil(CRAW_BLOCK_SIZE) * CRAW_BLOCK_SAMPLES];
  let errors = decode_blocks(src, &mut out, 0);
  (out, errors)
}

/// Decode a full image with one byte per sample, rows in parallel
pub fn decode_craw(buf: &[u8], width: usize, height: usize) -> (PixU16, Vec<SonyRawError>) {
  decode_threaded(width, height, &|out: &mut [u16], row| {
    let start = row * width;
    let end = (start + width).min(buf.len());
    let src = buf.get(start..end).unwrap_or(&[]);
    let mut errors = decode_blocks(src, out, start);
    if src.len() < width {
      // Missing data at end of buffer, one error for the rest of the row
      errors.push(SonyRawError::TruncatedBlock {
        offset: start + src.len(),
        len: 0,
        expected: width - src.len(),
      });
    }
    errors
  })
}
