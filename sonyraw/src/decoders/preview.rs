// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Cursor, Read, Seek};

use image::{DynamicImage, ImageFormat, ImageReader};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
  SonyRawError,
  formats::tiff::{IFD, TiffReader, read_from_file},
  tags::TiffCommonTag,
};

/// Location of the embedded JPEG preview
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRegion {
  pub offset: u32,
  pub length: u32,
}

impl PreviewRegion {
  /// Region from an IFD carrying both JPEGInterchangeFormat tags
  pub fn from_ifd(ifd: &IFD) -> Option<Self> {
    let offset = ifd.get_value(TiffCommonTag::JPEGInterchangeFormat)?.get_u32(0)?;
    let length = ifd.get_value(TiffCommonTag::JPEGInterchangeFormatLength)?.get_u32(0)?;
    Some(Self { offset, length })
  }
}

/// Search the IFD chain, then the sub IFDs, for the preview location
pub fn find_preview<T: TiffReader>(tiff: &T) -> Option<PreviewRegion> {
  let region = tiff
    .chain()
    .iter()
    .find_map(PreviewRegion::from_ifd)
    .or_else(|| {
      tiff
        .find_ifds_with_tag(TiffCommonTag::JPEGInterchangeFormat)
        .into_iter()
        .find_map(PreviewRegion::from_ifd)
    });
  debug!("Preview region: {:?}", region);
  region
}

/// Copy the preview bytes verbatim
pub fn extract_preview<R: Read + Seek>(file: &mut R, region: &PreviewRegion) -> crate::Result<Vec<u8>> {
  Ok(read_from_file(file, region.offset as u64, region.length as u64)?)
}

/// True if buffer starts with a JPEG SOI marker
pub fn is_jpeg(buf: &[u8]) -> bool {
  buf.starts_with(&[0xff, 0xd8])
}

/// Dimensions from the JPEG header, without decoding the image
pub fn preview_dimensions(buf: &[u8]) -> crate::Result<(u32, u32)> {
  ImageReader::with_format(Cursor::new(buf), ImageFormat::Jpeg)
    .into_dimensions()
    .map_err(|err| SonyRawError::DecoderFailed(format!("Failed to read JPEG header: {:?}", err)))
}

pub fn preview_image(buf: &[u8]) -> crate::Result<DynamicImage> {
  image::load_from_memory_with_format(buf, ImageFormat::Jpeg).map_err(|err| SonyRawError::DecoderFailed(format!("Failed to read JPEG image: {:?}", err)))
}
