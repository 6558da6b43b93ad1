// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

#![allow(dead_code)]

use std::io::{Cursor, Read, Seek, SeekFrom};

use sonyraw::{
  bits::Endian,
  decoders::arw::decrypt::{PadStream, sony_encrypt},
  decompressors::craw::CrawBlock,
};

/// A tag to write into a synthetic IFD
pub enum Tag {
  Short(u16, Vec<u16>),
  Long(u16, Vec<u32>),
  Ascii(u16, &'static str),
  Undefined(u16, Vec<u8>),
  Rational(u16, Vec<(u32, u32)>),
  /// Entry with 4 bytes stored as is in the value field
  Word(u16, u16, [u8; 4]),
  /// Entry with arbitrary type id and value field
  Raw(u16, u16, u32, u32),
}

impl Tag {
  fn id(&self) -> u16 {
    match self {
      Tag::Short(t, _) | Tag::Long(t, _) | Tag::Ascii(t, _) | Tag::Undefined(t, _) | Tag::Rational(t, _) => *t,
      Tag::Word(t, _, _) | Tag::Raw(t, _, _, _) => *t,
    }
  }

  fn typ_count(&self) -> (u16, u32) {
    match self {
      Tag::Short(_, v) => (3, v.len() as u32),
      Tag::Long(_, v) => (4, v.len() as u32),
      Tag::Ascii(_, s) => (2, s.len() as u32 + 1),
      Tag::Undefined(_, v) => (7, v.len() as u32),
      Tag::Rational(_, v) => (5, v.len() as u32),
      Tag::Word(_, typ, _) => (*typ, 4),
      Tag::Raw(_, typ, count, _) => (*typ, *count),
    }
  }

  /// Value bytes with elements in the given byte order
  fn bytes(&self, endian: Endian) -> Vec<u8> {
    let mut out = Vec::new();
    let put16 = |out: &mut Vec<u8>, v: u16| {
      let mut b = [0; 2];
      endian.write_u16(&mut b, v);
      out.extend_from_slice(&b);
    };
    match self {
      Tag::Short(_, v) => v.iter().for_each(|x| put16(&mut out, *x)),
      Tag::Long(_, v) => v.iter().for_each(|x| out.extend_from_slice(&word(endian, *x))),
      Tag::Ascii(_, s) => {
        out.extend_from_slice(s.as_bytes());
        out.push(0);
      }
      Tag::Undefined(_, v) => out.extend_from_slice(v),
      Tag::Rational(_, v) => v.iter().for_each(|(n, d)| {
        out.extend_from_slice(&word(endian, *n));
        out.extend_from_slice(&word(endian, *d));
      }),
      Tag::Word(_, _, b) => out.extend_from_slice(b),
      Tag::Raw(..) => {}
    }
    out
  }
}

pub fn word(endian: Endian, v: u32) -> [u8; 4] {
  let mut b = [0; 4];
  endian.write_u32(&mut b, v);
  b
}

/// Writes TIFF documents in either byte order.
///
/// Inline values are packed MSB first into the value field, the
/// value field itself is written in document byte order.
pub struct DocBuilder {
  pub endian: Endian,
  pub buf: Vec<u8>,
}

impl DocBuilder {
  pub fn new(endian: Endian) -> Self {
    let mut buf = match endian {
      Endian::Little => b"II".to_vec(),
      Endian::Big => b"MM".to_vec(),
    };
    let mut magic = [0; 2];
    endian.write_u16(&mut magic, 42);
    buf.extend_from_slice(&magic);
    buf.extend_from_slice(&[0; 4]);
    Self { endian, buf }
  }

  pub fn set_magic(&mut self, magic: u16) {
    let endian = self.endian;
    endian.write_u16(&mut self.buf[2..4], magic);
  }

  pub fn set_first_ifd(&mut self, offset: u32) {
    self.patch32(4, offset);
  }

  pub fn patch32(&mut self, pos: u32, v: u32) {
    let pos = pos as usize;
    self.buf[pos..pos + 4].copy_from_slice(&word(self.endian, v));
  }

  fn align(&mut self) {
    if self.buf.len() % 2 == 1 {
      self.buf.push(0);
    }
  }

  pub fn len(&self) -> u32 {
    self.buf.len() as u32
  }

  /// Append a data blob, returns its offset
  pub fn append(&mut self, data: &[u8]) -> u32 {
    self.align();
    let offset = self.len();
    self.buf.extend_from_slice(data);
    offset
  }

  /// Write an IFD followed by its out of line values, returns the IFD offset
  pub fn ifd(&mut self, tags: &[Tag]) -> u32 {
    self.align();
    let offset = self.len();
    let mut data_pos = offset + 2 + 12 * tags.len() as u32 + 4;
    let mut blobs = Vec::new();
    let mut table = Vec::new();
    table.extend_from_slice(&self.short(tags.len() as u16));
    for tag in tags {
      let (typ, count) = tag.typ_count();
      let value_field = match tag {
        Tag::Raw(_, _, _, value_field) => *value_field,
        Tag::Word(_, _, bytes) => self.endian.read_u32(bytes, 0),
        _ => {
          let bytes = tag.bytes(self.endian);
          if bytes.len() <= 4 {
            // Repack elements MSB first
            let mut packed = [0; 4];
            let be = tag.bytes(Endian::Big);
            packed[..be.len()].copy_from_slice(&be);
            u32::from_be_bytes(packed)
          } else {
            let pos = data_pos;
            data_pos += bytes.len() as u32 + (bytes.len() as u32 & 1);
            blobs.push(bytes);
            pos
          }
        }
      };
      table.extend_from_slice(&self.short(tag.id()));
      table.extend_from_slice(&self.short(typ));
      table.extend_from_slice(&word(self.endian, count));
      table.extend_from_slice(&word(self.endian, value_field));
    }
    table.extend_from_slice(&[0; 4]);
    self.buf.extend_from_slice(&table);
    for blob in blobs {
      self.buf.extend_from_slice(&blob);
      self.align();
    }
    offset
  }

  /// Set the next IFD pointer of the IFD at `ifd`
  pub fn link(&mut self, ifd: u32, next: u32) {
    let count = self.endian.read_u16(&self.buf, ifd as usize) as u32;
    self.patch32(ifd + 2 + 12 * count, next);
  }

  pub fn encrypt(&mut self, offset: u32, len: u32, key: [u8; 4]) {
    let range = offset as usize..(offset + len) as usize;
    let cipher = sony_encrypt(&self.buf[range.clone()], key);
    self.buf[range].copy_from_slice(&cipher);
  }

  fn short(&self, v: u16) -> [u8; 2] {
    let mut b = [0; 2];
    self.endian.write_u16(&mut b, v);
    b
  }

  pub fn finish(self) -> Vec<u8> {
    self.buf
  }
}

pub const SR2_KEY: [u8; 4] = [0x12, 0x34, 0x56, 0x78];
pub const RAW_WIDTH: usize = 32;
pub const RAW_HEIGHT: usize = 2;

/// Options for [`build_arw`]
#[derive(Debug, Clone)]
pub struct ArwOptions {
  pub endian: Endian,
  /// Encrypt the raw strip with this key
  pub raw_key: Option<[u8; 4]>,
  /// Announce a different strip length than written
  pub strip_len: Option<u32>,
  /// Announce other raw dimensions than written, as LONG tags
  pub dimensions: Option<(u32, u32)>,
  pub with_private: bool,
}

impl Default for ArwOptions {
  fn default() -> Self {
    Self {
      endian: Endian::Little,
      raw_key: None,
      strip_len: None,
      dimensions: None,
      with_private: true,
    }
  }
}

pub struct SampleArw {
  pub data: Vec<u8>,
  pub preview: Vec<u8>,
  pub preview_offset: u32,
  pub sr2_offset: u32,
  pub sr2_length: u32,
  pub raw_offset: u32,
  pub pixels: Vec<u16>,
}

/// Tiny grayscale JPEG of 8x8 pixels
pub fn tiny_jpeg() -> Vec<u8> {
  let img = image::GrayImage::from_fn(8, 8, |x, y| image::Luma([(x * 16 + y) as u8]));
  let mut out = Cursor::new(Vec::new());
  img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
  out.into_inner()
}

pub fn raw_blocks() -> Vec<CrawBlock> {
  let deltas: [u8; 14] = core::array::from_fn(|i| i as u8 * 9);
  vec![
    CrawBlock {
      max: 2000,
      min: 0,
      max_idx: 0,
      min_idx: 1,
      deltas: [0; 14],
    },
    CrawBlock {
      max: 1500,
      min: 100,
      max_idx: 15,
      min_idx: 3,
      deltas,
    },
    CrawBlock {
      max: 200,
      min: 150,
      max_idx: 7,
      min_idx: 8,
      deltas: [3; 14],
    },
    CrawBlock {
      max: 2047,
      min: 2047,
      max_idx: 2,
      min_idx: 2,
      deltas: [127; 14],
    },
  ]
}

/// Build an ARW like container.
///
/// IFD0 carries make, model, the DNGPrivateData pointer and a SubIFD with
/// the compressed raw strip. IFD1 carries the JPEG preview. The SR2 private
/// IFD points to an encrypted SR2 sub IFD with black, white and WB levels.
pub fn build_arw(opts: &ArwOptions) -> SampleArw {
  let mut doc = DocBuilder::new(opts.endian);
  let preview = tiny_jpeg();
  let preview_offset = doc.append(&preview);

  let blocks = raw_blocks();
  let mut strip: Vec<u8> = blocks.iter().flat_map(|b| b.pack()).collect();
  // Two blocks per row, so block order is row order
  let pixels: Vec<u16> = blocks.iter().flat_map(|b| b.decompress()).collect();
  if let Some(key) = opts.raw_key {
    PadStream::new(key).apply(&mut strip);
  }
  let raw_offset = doc.append(&strip);

  let sr2_offset = doc.ifd(&[
    Tag::Short(0x7310, vec![512, 512, 512, 512]),
    Tag::Short(0x7313, vec![2048, 1024, 1024, 1536]),
    Tag::Short(0x787F, vec![15360, 15360, 15360]),
  ]);
  let sr2_length = doc.len() - sr2_offset;
  doc.encrypt(sr2_offset, sr2_length, SR2_KEY);
  let private = doc.ifd(&[
    Tag::Long(0x7200, vec![sr2_offset]),
    Tag::Long(0x7201, vec![sr2_length]),
    Tag::Word(0x7221, 7, SR2_KEY),
  ]);

  let (width, height) = match opts.dimensions {
    Some((w, h)) => (Tag::Long(0x0100, vec![w]), Tag::Long(0x0101, vec![h])),
    None => (Tag::Short(0x0100, vec![RAW_WIDTH as u16]), Tag::Short(0x0101, vec![RAW_HEIGHT as u16])),
  };
  let raw_ifd = doc.ifd(&[
    width,
    height,
    Tag::Short(0x0102, vec![8]),
    Tag::Short(0x0103, vec![32767]),
    Tag::Long(0x0111, vec![raw_offset]),
    Tag::Long(0x0117, vec![opts.strip_len.unwrap_or(strip.len() as u32)]),
    Tag::Short(0x7000, vec![2]),
  ]);

  let ifd1 = doc.ifd(&[Tag::Long(0x0201, vec![preview_offset]), Tag::Long(0x0202, vec![preview.len() as u32])]);

  let mut ifd0_tags = vec![
    Tag::Ascii(0x010F, "SONY"),
    Tag::Ascii(0x0110, "ILCE-7M3"),
    Tag::Rational(0x011A, vec![(350, 1)]),
    Tag::Long(0x014A, vec![raw_ifd]),
  ];
  if opts.with_private {
    ifd0_tags.push(Tag::Word(0xC634, 1, word(opts.endian, private)));
  }
  let ifd0 = doc.ifd(&ifd0_tags);
  doc.link(ifd0, ifd1);
  doc.set_first_ifd(ifd0);

  SampleArw {
    data: doc.finish(),
    preview,
    preview_offset,
    sr2_offset,
    sr2_length,
    raw_offset,
    pixels,
  }
}

/// Reader that counts all I/O operations
pub struct CountingReader<R> {
  inner: R,
  pub reads: usize,
  pub seeks: usize,
}

impl<R> CountingReader<R> {
  pub fn new(inner: R) -> Self {
    Self { inner, reads: 0, seeks: 0 }
  }
}

impl<R: Read> Read for CountingReader<R> {
  fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
    self.reads += 1;
    self.inner.read(buf)
  }
}

impl<R: Seek> Seek for CountingReader<R> {
  fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
    self.seeks += 1;
    self.inner.seek(pos)
  }
}
