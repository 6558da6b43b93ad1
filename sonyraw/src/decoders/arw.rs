// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::{
  RawImage, Result, SonyRawError,
  decompressors::{craw::decode_craw, packed::decode_16},
  envparams::{sonyraw_ignore_previews, sonyraw_max_chain},
  formats::tiff::{GenericTiffReader, IFD, TiffError, TiffHeader, TiffReader, read_from_file},
  tags::{SonyRawFileType, SonyTag, TiffCommonTag},
};

use super::{
  RawDecodeParams,
  preview::{PreviewRegion, extract_preview, find_preview},
};

pub mod decrypt;
pub mod sr2;

use decrypt::{EncryptedRegion, PadStream};
use sr2::{Sr2Locator, Sr2Params, decrypt_sr2};

/// Compression id for Sony compressed raw data
const SONY_COMPRESSION: u32 = 32767;
const UNCOMPRESSED: u32 = 1;

fn compression(ifd: &IFD) -> Option<u32> {
  ifd.get_value(TiffCommonTag::Compression).and_then(|v| v.get_u32(0))
}

fn bps(ifd: &IFD) -> u32 {
  ifd.get_value(TiffCommonTag::BitsPerSample).and_then(|v| v.get_u32(0)).unwrap_or(0)
}

/// Image dimensions must fit the strip. A strip may be short, but not
/// less than half of the bytes the dimensions require.
fn check_dimensions(width: usize, height: usize, bytes_per_sample: usize, strip_len: usize) -> Result<()> {
  let required = width
    .checked_mul(height)
    .and_then(|samples| samples.checked_mul(bytes_per_sample))
    .ok_or_else(|| SonyRawError::DecoderFailed(format!("ARW: invalid raw dimensions {}x{}", width, height)))?;
  if required > strip_len.saturating_mul(2) {
    return Err(SonyRawError::DecoderFailed(format!(
      "ARW: raw dimensions {}x{} need {} bytes, strip has only {}",
      width, height, required, strip_len
    )));
  }
  Ok(())
}

/// Decoder for Sony ARW/SR2 containers
#[derive(Debug, Clone)]
pub struct ArwDecoder {
  tiff: GenericTiffReader,
}

impl ArwDecoder {
  pub fn new<R: Read + Seek>(file: &mut R, params: &RawDecodeParams) -> Result<ArwDecoder> {
    let max_chain = params.max_chain.or_else(sonyraw_max_chain);
    let tiff = GenericTiffReader::new(file, max_chain, &[])?;
    for warning in &tiff.warnings {
      warn!("ARW container: {}", warning);
    }
    Ok(ArwDecoder { tiff })
  }

  pub fn tiff(&self) -> &GenericTiffReader {
    &self.tiff
  }

  pub fn header(&self) -> &TiffHeader {
    self.tiff.header()
  }

  pub fn warnings(&self) -> &[TiffError] {
    &self.tiff.warnings
  }

  /// Storage scheme from tag SonyRawFileType, searched in all IFDs
  pub fn raw_file_type(&self) -> Option<SonyRawFileType> {
    self
      .tiff
      .find_first_ifd_with_tag(SonyTag::SonyRawFileType)
      .and_then(|ifd| ifd.get_value(SonyTag::SonyRawFileType))
      .and_then(|v| v.get_u16(0))
      .and_then(SonyRawFileType::n)
  }

  /// Location of the embedded preview, `None` if there is none or
  /// previews are disabled by `SONYRAW_IGNORE_PREVIEWS`.
  pub fn preview_region(&self) -> Option<PreviewRegion> {
    if sonyraw_ignore_previews() {
      debug!("Preview extraction disabled by environment");
      return None;
    }
    find_preview(&self.tiff)
  }

  pub fn preview<R: Read + Seek>(&self, file: &mut R) -> Result<Option<Vec<u8>>> {
    match self.preview_region() {
      Some(region) => extract_preview(file, &region).map(Some),
      None => Ok(None),
    }
  }

  pub fn sr2_region<R: Read + Seek>(&self, file: &mut R) -> Result<EncryptedRegion> {
    Sr2Locator::find(file, &self.tiff)
  }

  /// The decrypted SR2 sub IFD
  pub fn sr2_ifd<R: Read + Seek>(&self, file: &mut R) -> Result<IFD> {
    let region = self.sr2_region(file)?;
    decrypt_sr2(file, &region, self.tiff.get_endian())
  }

  pub fn sr2_params<R: Read + Seek>(&self, file: &mut R) -> Result<Sr2Params> {
    Sr2Params::new(&self.sr2_ifd(file)?)
  }

  /// IFD with the sensor data. Compressed data wins over uncompressed strips.
  fn raw_ifd(&self) -> Option<&IFD> {
    let candidates = self.tiff.find_ifds_with_tag(TiffCommonTag::StripOffsets);
    candidates
      .iter()
      .find(|ifd| compression(ifd) == Some(SONY_COMPRESSION))
      .or_else(|| candidates.iter().find(|ifd| compression(ifd) == Some(UNCOMPRESSED) && bps(ifd) >= 12))
      .copied()
  }

  /// Decode the sensor data.
  ///
  /// Blocks that fail to decode don't fail the image, they are
  /// returned in `RawImage::issues`.
  pub fn raw_image<R: Read + Seek>(&self, file: &mut R, params: &RawDecodeParams) -> Result<RawImage> {
    let raw = self.raw_ifd().ok_or_else(|| SonyRawError::Unsupported("ARW: no raw image IFD found".into()))?;
    let fetch = |tag: TiffCommonTag| {
      raw
        .get_value(tag)
        .and_then(|v| v.get_usize(0))
        .ok_or_else(|| SonyRawError::DecoderFailed(format!("ARW: raw IFD has no valid {:?} tag", tag)))
    };
    let width = match params.width {
      Some(width) => width,
      None => fetch(TiffCommonTag::ImageWidth)?,
    };
    let height = fetch(TiffCommonTag::ImageLength)?;
    let offset = fetch(TiffCommonTag::StripOffsets)?;
    let count = fetch(TiffCommonTag::StripByteCounts)?;
    let compression = fetch(TiffCommonTag::Compression)? as u32;
    let bps = fetch(TiffCommonTag::BitsPerSample)?;
    let file_type = self.raw_file_type();
    debug!(
      "ARW raw: {}x{}, {} bps, compression {}, type {:?}, strip {}+{}",
      width, height, bps, compression, file_type, offset, count
    );

    let mut src = read_from_file(file, offset as u64, count as u64)?;
    if let Some(key) = params.key {
      debug!("Decrypt raw strip with caller key");
      PadStream::new(key).apply(&mut src);
    }

    let compressed = compression == SONY_COMPRESSION && (bps == 8 || matches!(file_type, Some(SonyRawFileType::Craw)));
    check_dimensions(width, height, if compressed { 1 } else { 2 }, src.len())?;
    let (data, issues) = if compressed {
      decode_craw(&src, width, height)
    } else if (compression == UNCOMPRESSED || compression == SONY_COMPRESSION) && (12..=16).contains(&bps) {
      decode_16(&src, width, height, self.tiff.get_endian())
    } else {
      return Err(SonyRawError::Unsupported(format!(
        "ARW: compression {} with {} bits per sample",
        compression, bps
      )));
    };
    if !issues.is_empty() {
      warn!("ARW raw data has {} damaged blocks", issues.len());
    }

    let sr2 = match self.sr2_params(file) {
      Ok(sr2) => Some(sr2),
      Err(err) => {
        warn!("No SR2 parameters available: {}", err);
        None
      }
    };

    Ok(RawImage {
      width,
      height,
      bps,
      file_type,
      data,
      blacklevels: sr2.as_ref().and_then(|p| p.blacklevels),
      whitelevel: sr2.as_ref().and_then(|p| p.whitelevel),
      wb_coeffs: sr2.as_ref().map(|p| p.wb_coeffs),
      issues,
    })
  }
}
