// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use serde::{Deserialize, Serialize};

/// Anything usable as a TIFF tag id
pub trait TiffTag: Into<u16> + Copy {}

impl TiffTag for u16 {}

macro_rules! tiff_tag_enum {
  ($e:ty) => {
    impl From<$e> for u16 {
      fn from(tag: $e) -> u16 {
        tag as u16
      }
    }

    impl $crate::tags::TiffTag for $e {}
  };
}

tiff_tag_enum!(TiffCommonTag);
tiff_tag_enum!(ExifTag);
tiff_tag_enum!(SonyTag);

#[derive(Debug, Copy, Clone, PartialEq, Eq, enumn::N)]
#[repr(u16)]
pub enum TiffCommonTag {
  NewSubFileType = 0x00FE,
  ImageWidth = 0x0100,
  ImageLength = 0x0101,
  BitsPerSample = 0x0102,
  Compression = 0x0103,
  PhotometricInt = 0x0106,
  ImageDescription = 0x010E,
  Make = 0x010F,
  Model = 0x0110,
  StripOffsets = 0x0111,
  Orientation = 0x0112,
  SamplesPerPixel = 0x0115,
  RowsPerStrip = 0x0116,
  StripByteCounts = 0x0117,
  XResolution = 0x011A,
  YResolution = 0x011B,
  PlanarConfig = 0x011C,
  ResolutionUnit = 0x0128,
  Software = 0x0131,
  DateTime = 0x0132,
  Artist = 0x013B,
  SubIFDs = 0x014A,
  JPEGInterchangeFormat = 0x0201,
  JPEGInterchangeFormatLength = 0x0202,
  YCbCrSubSampling = 0x0212,
  YCbCrPositioning = 0x0213,
  CFARepeatPatternDim = 0x828D,
  CFAPattern = 0x828E,
  Copyright = 0x8298,
  ExifIFDPointer = 0x8769,
  GPSInfo = 0x8825,
  PrintIM = 0xC4A5,
  DNGPrivateData = 0xC634,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, enumn::N)]
#[repr(u16)]
pub enum ExifTag {
  ExposureTime = 0x829A,
  FNumber = 0x829D,
  ExposureProgram = 0x8822,
  ISOSpeedRatings = 0x8827,
  ExifVersion = 0x9000,
  DateTimeOriginal = 0x9003,
  CreateDate = 0x9004,
  ComponentsConfiguration = 0x9101,
  CompressedBitsPerPixel = 0x9102,
  BrightnessValue = 0x9203,
  ExposureBiasValue = 0x9204,
  MaxApertureValue = 0x9205,
  MeteringMode = 0x9207,
  LightSource = 0x9208,
  Flash = 0x9209,
  FocalLength = 0x920A,
  MakerNotes = 0x927C,
  UserComment = 0x9286,
  FlashpixVersion = 0xA000,
  ColorSpace = 0xA001,
  PixelXDimension = 0xA002,
  PixelYDimension = 0xA003,
  FileSource = 0xA300,
  SceneType = 0xA301,
  CustomRendered = 0xA401,
  ExposureMode = 0xA402,
  WhiteBalance = 0xA403,
  DigitalZoomRatio = 0xA404,
  FocalLengthIn35mmFormat = 0xA405,
  SceneCaptureType = 0xA406,
  Contrast = 0xA408,
  Saturation = 0xA409,
  Sharpness = 0xA40A,
  LensInfo = 0xA432,
  LensModel = 0xA434,
}

/// Sony specific tags, found in the main IFDs and in the
/// SR2 private and SR2 sub IFD.
#[derive(Debug, Copy, Clone, PartialEq, Eq, enumn::N)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SonyTag {
  ShotInfo = 0x3000,
  SonyRawFileType = 0x7000,
  SonyToneCurve = 0x7010,
  SR2SubIFDOffset = 0x7200,
  SR2SubIFDLength = 0x7201,
  SR2SubIFDKey = 0x7221,
  BlackLevel1 = 0x7300,
  WB_GRBGLevelsAuto = 0x7302,
  WB_GRBGLevels = 0x7303,
  BlackLevel2 = 0x7310,
  WB_RGGBLevelsAuto = 0x7312,
  WB_RGGBLevels = 0x7313,
  SR2DataIFD = 0x74C0,
  WhiteLevel = 0x787F,
}

/// Storage scheme of the raw data, from tag `SonyRawFileType`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, enumn::N)]
#[repr(u16)]
pub enum SonyRawFileType {
  /// Uncompressed 14 bit
  Raw14 = 0,
  /// Uncompressed 12 bit
  Raw12 = 1,
  /// Lossy compressed blocks (max/min/delta)
  Craw = 2,
  CrawLossless = 3,
}

/// Human readable name for a tag id
pub fn tag_name(tag: u16) -> Option<String> {
  TiffCommonTag::n(tag)
    .map(|t| format!("{:?}", t))
    .or_else(|| ExifTag::n(tag).map(|t| format!("{:?}", t)))
    .or_else(|| SonyTag::n(tag).map(|t| format!("{:?}", t)))
}
