// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Cursor, Read, Seek};

use log::debug;
use serde::Serialize;

use super::decrypt::{EncryptedRegion, decrypt_region};
use crate::{
  Result, SonyRawError,
  bits::Endian,
  formats::tiff::{Entry, IFD, TiffReader, Value},
  tags::{SonyTag, TiffCommonTag},
};

/// Finds the encrypted SR2 sub IFD through the SR2 private directory
pub struct Sr2Locator;

impl Sr2Locator {
  /// The DNGPrivateData tag points to the SR2 private directory, which
  /// holds offset, length and key of the encrypted region.
  pub fn find<R: Read + Seek, T: TiffReader>(file: &mut R, tiff: &T) -> Result<EncryptedRegion> {
    let endian = tiff.get_endian();
    let (entry, value) = tiff
      .get_entry(TiffCommonTag::DNGPrivateData)
      .ok_or_else(|| SonyRawError::Unsupported("SR2: no DNGPrivateData tag".into()))?;
    let priv_offset = word_of(entry, value).ok_or_else(|| SonyRawError::Unsupported(format!("SR2: invalid DNGPrivateData tag: {:?}", entry)))?;
    let priv_ifd = IFD::read(file, priv_offset, 0, endian, &[])?;
    Self::from_private_ifd(&priv_ifd)
  }

  pub fn from_private_ifd(priv_ifd: &IFD) -> Result<EncryptedRegion> {
    let offset = fetch_u32(priv_ifd, SonyTag::SR2SubIFDOffset)?;
    let length = fetch_u32(priv_ifd, SonyTag::SR2SubIFDLength)?;
    let entry = priv_ifd
      .get_entry(SonyTag::SR2SubIFDKey)
      .ok_or_else(|| SonyRawError::Unsupported("SR2: no SR2SubIFDKey tag".into()))?;
    // The key is 4 bytes as stored in file, usually of type UNDEFINED
    let key = if entry.byte_size() == Some(4) {
      let mut key = [0; 4];
      priv_ifd.endian.write_u32(&mut key, entry.value_field);
      key
    } else {
      priv_ifd
        .get_value(SonyTag::SR2SubIFDKey)
        .and_then(Value::as_bytes)
        .and_then(|bytes| bytes.get(..4))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| SonyRawError::Unsupported(format!("SR2: invalid key tag: {:?}", entry)))?
    };
    debug!("SR2 region at {} with {} bytes", offset, length);
    Ok(EncryptedRegion { offset, length, key })
  }
}

/// A 4 byte tag that carries an offset: either a LONG or a word of
/// undefined bytes, read in document byte order.
fn word_of(entry: &Entry, value: Option<&Value>) -> Option<u32> {
  match value {
    Some(Value::Long(v)) => v.first().copied(),
    _ if entry.byte_size() == Some(4) => Some(entry.value_field),
    _ => None,
  }
}

fn fetch_u32(ifd: &IFD, tag: SonyTag) -> Result<u32> {
  ifd
    .get_value(tag)
    .and_then(|v| v.get_u32(0))
    .ok_or_else(|| SonyRawError::Unsupported(format!("SR2: tag {:?} not found", tag)))
}

/// Decrypt the region and decode it as IFD.
/// Offsets inside the region are file offsets, so they are corrected
/// by the region start.
pub fn decrypt_sr2<R: Read + Seek>(file: &mut R, region: &EncryptedRegion, endian: Endian) -> Result<IFD> {
  let plain = decrypt_region(file, region)?;
  Ok(IFD::read(&mut Cursor::new(plain), region.offset, -(region.offset as i32), endian, &[])?)
}

/// Image parameters from the decrypted SR2 sub IFD
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sr2Params {
  /// Black levels in RGGB order
  pub blacklevels: Option<[u16; 4]>,
  pub whitelevel: Option<u16>,
  /// White balance in RGBE order, normalized to green
  pub wb_coeffs: [f32; 4],
}

impl Sr2Params {
  pub fn new(sr2: &IFD) -> Result<Self> {
    Ok(Self {
      blacklevels: get_blacklevels(sr2),
      whitelevel: sr2.get_value(SonyTag::WhiteLevel).and_then(|v| v.get_u16(0)),
      wb_coeffs: get_wb(sr2)?,
    })
  }
}

fn get_blacklevels(sr2: &IFD) -> Option<[u16; 4]> {
  let value = sr2.get_value(SonyTag::BlackLevel2).or_else(|| sr2.get_value(SonyTag::BlackLevel1))?;
  if value.count() == 4 {
    Some([value.get_u16(0)?, value.get_u16(1)?, value.get_u16(2)?, value.get_u16(3)?])
  } else {
    let v = value.get_u16(0)?;
    Some([v; 4])
  }
}

fn get_wb(sr2: &IFD) -> Result<[f32; 4]> {
  let level = |v: &Value, i: usize| v.get_f64(i).unwrap_or(f64::NAN) as f32;
  if let Some(levels) = sr2.get_value(SonyTag::WB_GRBGLevels) {
    Ok(normalize_wb([level(levels, 1), level(levels, 0), level(levels, 3), level(levels, 2)]))
  } else if let Some(levels) = sr2.get_value(SonyTag::WB_RGGBLevels) {
    Ok(normalize_wb([level(levels, 0), level(levels, 1), level(levels, 2), level(levels, 3)]))
  } else {
    Err(SonyRawError::Unsupported("SR2: Couldn't find GRBG or RGGB levels".to_string()))
  }
}

fn normalize_wb(raw_wb: [f32; 4]) -> [f32; 4] {
  debug!("SR2 raw wb: {:?}", raw_wb);
  // G1 is the divisor, G1 and G2 are combined to a single green
  let div = raw_wb[1];
  let mut norm = raw_wb;
  norm.iter_mut().for_each(|v| {
    if v.is_normal() {
      *v /= div
    }
  });
  [norm[0], (norm[1] + norm[2]) / 2.0, norm[3], f32::NAN]
}
