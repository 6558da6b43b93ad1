// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use rayon::prelude::*;

use crate::{SonyRawError, pixarray::PixU16};

pub mod arw;
pub mod preview;

/// Parameters for a decode call
#[derive(Default, Debug, Clone)]
pub struct RawDecodeParams {
  /// Limit for the IFD chain, overrides `SONYRAW_MAX_CHAIN`
  pub max_chain: Option<usize>,
  /// Decrypt the raw strip with this key before decoding
  pub key: Option<[u8; 4]>,
  /// Row width in samples, overrides ImageWidth
  pub width: Option<usize>,
}

/// Decode rows in parallel.
///
/// The closure gets a row buffer and the row index and returns
/// the errors for this row, errors are collected in row order.
pub fn decode_threaded<F>(width: usize, height: usize, closure: &F) -> (PixU16, Vec<SonyRawError>)
where
  F: Fn(&mut [u16], usize) -> Vec<SonyRawError> + Sync,
{
  let mut out: Vec<u16> = vec![0; width * height];
  if width == 0 {
    return (PixU16::new_with(out, width, height), Vec::new());
  }
  let errors: Vec<SonyRawError> = out
    .par_chunks_mut(width)
    .enumerate()
    .map(|(row, line)| closure(line, row))
    .collect::<Vec<_>>()
    .into_iter()
    .flatten()
    .collect();
  (PixU16::new_with(out, width, height), errors)
}
