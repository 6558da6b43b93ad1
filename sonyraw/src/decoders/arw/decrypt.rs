// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Seek};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::formats::tiff::read_from_file;

const PAD_SIZE: usize = 128;

/// Location and key of an encrypted byte region
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRegion {
  pub offset: u32,
  pub length: u32,
  pub key: [u8; 4],
}

/// Key stream for Sony SR2 encryption.
///
/// The 128 byte pad is seeded from the key and then regenerated in
/// place while it is consumed. Output depends only on key and position,
/// the stream must be driven byte by byte from the region start.
#[derive(Clone)]
pub struct PadStream {
  pad: [u8; PAD_SIZE],
  pos: usize,
}

impl PadStream {
  pub fn new(key: [u8; 4]) -> Self {
    let mut pad = [0_u8; PAD_SIZE];
    let mut mkey = u32::from_le_bytes(key);
    for p in pad.iter_mut().take(4) {
      mkey = mkey.wrapping_mul(48828125).wrapping_add(1);
      *p = (mkey >> 24) as u8;
    }
    pad[3] = (pad[3] << 1) | ((pad[0] ^ pad[2]) >> 7);
    for p in 4..PAD_SIZE - 1 {
      pad[p] = ((pad[p - 4] ^ pad[p - 2]) << 1) | ((pad[p - 3] ^ pad[p - 1]) >> 7);
    }
    Self { pad, pos: PAD_SIZE - 1 }
  }

  #[inline(always)]
  pub fn next_byte(&mut self) -> u8 {
    let p = self.pos;
    let v = self.pad[(p + 1) & 127] ^ self.pad[(p + 65) & 127];
    self.pad[p] = v;
    self.pos = (p + 1) & 127;
    v
  }

  /// XOR the key stream into `buf`
  pub fn apply(&mut self, buf: &mut [u8]) {
    for b in buf.iter_mut() {
      *b ^= self.next_byte();
    }
  }
}

impl std::fmt::Debug for PadStream {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // Don't print key material
    f.debug_struct("PadStream").field("pos", &self.pos).finish()
  }
}

/// Decrypt a buffer that was encrypted from its first byte with `key`
pub fn sony_decrypt(data: &[u8], key: [u8; 4]) -> Vec<u8> {
  let mut out = data.to_vec();
  PadStream::new(key).apply(&mut out);
  out
}

/// The transform is an XOR with the key stream, so encryption
/// is the same operation.
pub fn sony_encrypt(data: &[u8], key: [u8; 4]) -> Vec<u8> {
  sony_decrypt(data, key)
}

/// Read and decrypt a region from file
pub fn decrypt_region<R: Read + Seek>(file: &mut R, region: &EncryptedRegion) -> crate::Result<Vec<u8>> {
  debug!("Decrypt region at {} with {} bytes", region.offset, region.length);
  let mut buf = read_from_file(file, region.offset as u64, region.length as u64)?;
  PadStream::new(region.key).apply(&mut buf);
  Ok(buf)
}
