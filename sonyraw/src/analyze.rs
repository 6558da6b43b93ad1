use std::{collections::BTreeMap, fs::metadata, io::Write, path::Path};

use byteorder::{BigEndian, WriteBytesExt};
use hex::FromHex;
use md5::Digest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
  ArwDecoder, RawDecodeParams, Result, SonyRawError,
  decoders::{
    arw::{decrypt::EncryptedRegion, sr2::Sr2Params},
    preview::{PreviewRegion, preview_dimensions},
  },
  formats::tiff::{IFD, TiffHeader, TiffReader},
  rawsource::RawSource,
  tags::{SonyRawFileType, tag_name},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Md5Digest {
  digest: md5::Digest,
}

impl From<md5::Digest> for Md5Digest {
  fn from(digest: md5::Digest) -> Self {
    Self { digest }
  }
}

impl Serialize for Md5Digest {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let s = format!("{:x}", self.digest);
    serializer.serialize_str(&s)
  }
}

impl<'de> Deserialize<'de> for Md5Digest {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Md5Digest, D::Error>
  where
    D: Deserializer<'de>,
  {
    use serde::de::Error;
    let s = String::deserialize(deserializer)?;
    if s.len() != 32 {
      Err(D::Error::custom(format!("Invalid digest value: {}", s)))
    } else {
      Ok(Md5Digest {
        digest: Digest(<[u8; 16]>::from_hex(s).map_err(D::Error::custom)?),
      })
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
  pub file_size: u64,
  pub file_name: String,
  pub digest: Option<Md5Digest>,
}

/// Single tag of an IFD with its resolved value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
  pub tag: u16,
  pub name: Option<String>,
  pub typ: u16,
  pub count: u32,
  pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IfdSummary {
  pub offset: u32,
  pub next_ifd: u32,
  pub tags: Vec<TagSummary>,
  pub issues: Vec<String>,
  pub sub_ifds: BTreeMap<String, Vec<IfdSummary>>,
}

impl From<&IFD> for IfdSummary {
  fn from(ifd: &IFD) -> Self {
    Self {
      offset: ifd.offset,
      next_ifd: ifd.next_ifd,
      tags: ifd
        .value_iter()
        .map(|(entry, value)| TagSummary {
          tag: entry.tag,
          name: tag_name(entry.tag),
          typ: entry.typ,
          count: entry.count,
          value: value.map(|v| v.to_string()),
        })
        .collect(),
      issues: ifd.issues.iter().map(|issue| format!("tag {:#06x}: {}", issue.tag, issue.error)).collect(),
      sub_ifds: ifd
        .sub_ifds()
        .iter()
        .map(|(tag, subs)| (tag_name(*tag).unwrap_or_else(|| format!("{:#06x}", tag)), subs.iter().map(IfdSummary::from).collect()))
        .collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
  pub region: PreviewRegion,
  pub dimensions: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerMetadata {
  pub header: TiffHeader,
  pub raw_file_type: Option<SonyRawFileType>,
  pub ifds: Vec<IfdSummary>,
  pub preview: Option<PreviewSummary>,
  pub sr2_region: Option<EncryptedRegion>,
  pub sr2_params: Option<Sr2Params>,
  pub sr2_ifd: Option<IfdSummary>,
  /// Non-fatal problems found while reading the container
  pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerResult {
  pub file: FileMetadata,
  pub data: Option<AnalyzerMetadata>,
}

fn file_metadata<P: AsRef<Path>>(path: P, rawfile: &RawSource) -> Result<FileMetadata> {
  let fs_meta = metadata(&path).map_err(|e| SonyRawError::with_io_error(&path, e))?;
  let digest = rawfile.digest();
  Ok(FileMetadata {
    file_name: path.as_ref().file_name().map(|name| name.to_string_lossy().to_string()).unwrap_or_default(),
    file_size: fs_meta.len(),
    digest: Some(digest.into()),
  })
}

/// Collect all metadata of a container.
///
/// Only a broken header fails, everything else that can't be read
/// is listed in `warnings`.
pub fn analyze_metadata<P: AsRef<Path>>(path: P) -> Result<AnalyzerResult> {
  let path = path.as_ref();
  let rawfile = RawSource::new(path).map_err(|e| SonyRawError::with_io_error(path, e))?;
  let file = file_metadata(path, &rawfile)?;
  let data = analyze_source(&rawfile, &RawDecodeParams::default())?;
  Ok(AnalyzerResult { file, data: Some(data) })
}

pub fn analyze_source(rawfile: &RawSource, params: &RawDecodeParams) -> Result<AnalyzerMetadata> {
  let decoder = ArwDecoder::new(&mut rawfile.reader(), params)?;
  let mut warnings: Vec<String> = decoder.warnings().iter().map(ToString::to_string).collect();

  let preview = decoder.preview_region().map(|region| PreviewSummary {
    region,
    dimensions: rawfile
      .subview(region.offset as u64, region.length as u64)
      .ok()
      .and_then(|buf| preview_dimensions(buf).ok()),
  });

  let sr2_region = decoder
    .sr2_region(&mut rawfile.reader())
    .map_err(|err| warnings.push(format!("SR2 region: {}", err)))
    .ok();
  let sr2_ifd = decoder
    .sr2_ifd(&mut rawfile.reader())
    .map_err(|err| warnings.push(format!("SR2 IFD: {}", err)))
    .ok();
  let sr2_params = sr2_ifd
    .as_ref()
    .and_then(|ifd| Sr2Params::new(ifd).map_err(|err| warnings.push(format!("SR2 params: {}", err))).ok());

  Ok(AnalyzerMetadata {
    header: *decoder.header(),
    raw_file_type: decoder.raw_file_type(),
    ifds: decoder.tiff().chain().iter().map(IfdSummary::from).collect(),
    preview,
    sr2_region,
    sr2_params,
    sr2_ifd: sr2_ifd.as_ref().map(IfdSummary::from),
    warnings,
  })
}

/// Human readable dump of the IFD chain with tag names
pub fn dump_ifds<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
  let path = path.as_ref();
  let rawfile = RawSource::new(path).map_err(|e| SonyRawError::with_io_error(path, e))?;
  let decoder = ArwDecoder::new(&mut rawfile.reader(), &RawDecodeParams::default())?;
  let mut lines = Vec::new();
  for ifd in decoder.tiff().chain() {
    lines.extend(ifd.dump(0, &tag_name));
  }
  if let Ok(sr2) = decoder.sr2_ifd(&mut rawfile.reader()) {
    lines.push("SR2 sub IFD (decrypted):".into());
    lines.extend(sr2.dump(2, &tag_name));
  }
  lines.extend(decoder.warnings().iter().map(|w| format!("Warning: {}", w)));
  Ok(lines)
}

/// Decode the raw pixels and return their md5 digest
pub fn raw_pixels_digest<P: AsRef<Path>>(path: P, params: &RawDecodeParams) -> Result<[u8; 16]> {
  let path = path.as_ref();
  let rawfile = RawSource::new(path).map_err(|e| SonyRawError::with_io_error(path, e))?;
  let image = crate::decode(&mut rawfile.reader(), params)?;
  let v: Vec<u8> = image.pixels().iter().flat_map(|p| p.to_le_bytes()).collect();
  Ok(md5::compute(v).into())
}

/// Dump raw pixel data as PGM
pub fn raw_as_pgm(width: usize, height: usize, buf: &[u16], writer: &mut dyn Write) -> std::io::Result<()> {
  let header = format!("P5 {} {} {}\n", width, height, 65535);
  writer.write_all(header.as_bytes())?;
  for px in buf {
    writer.write_u16::<BigEndian>(*px)?;
  }
  Ok(())
}
