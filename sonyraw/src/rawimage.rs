// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use crate::{SonyRawError, pixarray::PixU16, tags::SonyRawFileType};

/// Decoded sensor data with the levels needed to interpret it
#[derive(Debug)]
pub struct RawImage {
  /// width of the full image
  pub width: usize,
  /// height of the full image
  pub height: usize,
  /// Bits per sample as stored in file
  pub bps: usize,
  /// Storage scheme, if the file tells us
  pub file_type: Option<SonyRawFileType>,
  /// image data itself, has `width`\*`height` elements
  pub data: PixU16,
  /// image blacklevels in RGGB order
  pub blacklevels: Option<[u16; 4]>,
  pub whitelevel: Option<u16>,
  /// whitebalance coefficients in RGBE order, normalized to green
  pub wb_coeffs: Option<[f32; 4]>,
  /// Blocks that failed to decode, their samples are left at zero
  pub issues: Vec<SonyRawError>,
}

impl RawImage {
  pub fn pixels(&self) -> &[u16] {
    self.data.pixels()
  }

  /// True if every block decoded without error
  pub fn is_complete(&self) -> bool {
    self.issues.is_empty()
  }
}
