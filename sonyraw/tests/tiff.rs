// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

mod common;

use std::io::Cursor;

use common::{ArwOptions, CountingReader, DocBuilder, Tag, build_arw};
use sonyraw::{
  bits::Endian,
  formats::tiff::{
    Entry, GenericTiffReader, IFD, MAX_SUB_IFDS, TiffError, TiffHeader, TiffReader, Value,
    reader::{EndianReader, ReadByteOrder},
  },
  tags::TiffCommonTag,
};

#[test]
fn header_selects_byte_order() -> anyhow::Result<()> {
  let (header, warning) = TiffHeader::read(&mut Cursor::new(b"II\x2a\x00\x08\x00\x00\x00"))?;
  assert_eq!(header.endian, Endian::Little);
  assert_eq!(header.magic, 42);
  assert_eq!(header.first_ifd, 8);
  assert!(warning.is_none());

  let (header, _) = TiffHeader::read(&mut Cursor::new(b"MM\x00\x2a\x00\x00\x00\x08"))?;
  assert_eq!(header.endian, Endian::Big);
  assert_eq!(header.first_ifd, 8);
  Ok(())
}

#[test]
fn bad_marker_is_fatal() {
  let err = GenericTiffReader::new(&mut Cursor::new(b"XX\x2a\x00\x08\x00\x00\x00".to_vec()), None, &[]).unwrap_err();
  assert_eq!(err, TiffError::MalformedHeader(0x5858));
}

#[test]
fn wrong_magic_is_a_warning() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Little);
  let ifd = doc.ifd(&[Tag::Short(0x100, vec![640])]);
  doc.set_first_ifd(ifd);
  doc.set_magic(43);
  let tiff = GenericTiffReader::new(&mut Cursor::new(doc.finish()), None, &[])?;
  assert_eq!(tiff.warnings, vec![TiffError::UnreliableOffset(43)]);
  assert_eq!(tiff.chain().len(), 1);
  assert_eq!(tiff.get_value(TiffCommonTag::ImageWidth), Some(&Value::Short(vec![640])));
  Ok(())
}

#[test]
fn inline_values_need_no_io() -> anyhow::Result<()> {
  let mut reader = CountingReader::new(Cursor::new(Vec::<u8>::new()));
  let entries = [
    Entry {
      tag: 0x100,
      typ: 3,
      count: 2,
      value_field: 0x0280_01e0,
    },
    Entry {
      tag: 0x111,
      typ: 4,
      count: 1,
      value_field: 0xdead_beef,
    },
    Entry {
      tag: 0x10f,
      typ: 2,
      count: 4,
      value_field: u32::from_be_bytes(*b"ABC\0"),
    },
  ];
  let values: Vec<Option<Value>> = {
    let mut endian_reader = EndianReader::new(&mut reader, Endian::Little);
    entries
      .iter()
      .map(|e| e.resolve(&mut endian_reader, 0, 0))
      .collect::<Result<_, _>>()?
  };
  assert_eq!(reader.reads, 0);
  assert_eq!(reader.seeks, 0);
  assert_eq!(
    values,
    vec![
      Some(Value::Short(vec![640, 480])),
      Some(Value::Long(vec![0xdead_beef])),
      Some(Value::Ascii("ABC".into()))
    ]
  );
  Ok(())
}

#[test]
fn indirect_resolve_is_repeatable() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Big);
  let ifd = doc.ifd(&[Tag::Long(0x111, vec![1, 2, 3]), Tag::Rational(0x11a, vec![(72, 1), (1, 3)])]);
  doc.set_first_ifd(ifd);
  let data = doc.finish();
  let mut cursor = Cursor::new(&data);
  let tiff = GenericTiffReader::new(&mut cursor, None, &[])?;
  let root = tiff.root_ifd().unwrap();
  let entry = root.get_entry(0x111_u16).unwrap();
  let limit = data.len() as u64;
  let mut reader = EndianReader::new(&mut cursor, Endian::Big);
  let first = entry.resolve(&mut reader, 0, limit)?;
  // Move the cursor somewhere else, the value must not depend on it
  reader.goto(0)?;
  reader.read_u32()?;
  let second = entry.resolve(&mut reader, 0, limit)?;
  assert_eq!(first, second);
  assert_eq!(first, Some(Value::Long(vec![1, 2, 3])));
  assert_eq!(root.get_value(0x11a_u16), Some(&Value::Rational(vec![72.0, 1.0 / 3.0])));
  Ok(())
}

#[test]
fn both_byte_orders_decode_the_same_values() -> anyhow::Result<()> {
  let le = build_arw(&ArwOptions::default());
  let be = build_arw(&ArwOptions {
    endian: Endian::Big,
    ..Default::default()
  });
  let le_tiff = GenericTiffReader::new(&mut Cursor::new(&le.data), None, &[])?;
  let be_tiff = GenericTiffReader::new(&mut Cursor::new(&be.data), None, &[])?;
  assert!(le_tiff.little_endian());
  assert!(!be_tiff.little_endian());
  assert_eq!(le_tiff.chain().len(), 2);
  assert_eq!(be_tiff.chain().len(), 2);
  for (l, b) in le_tiff.chain().iter().zip(be_tiff.chain()) {
    assert_eq!(l.values, b.values);
    let l_sub: Vec<_> = l.sub_ifds().values().flatten().map(|ifd| ifd.values.clone()).collect();
    let b_sub: Vec<_> = b.sub_ifds().values().flatten().map(|ifd| ifd.values.clone()).collect();
    assert_eq!(l_sub, b_sub);
  }
  assert_eq!(le_tiff.get_value(TiffCommonTag::Make), Some(&Value::Ascii("SONY".into())));
  Ok(())
}

#[test]
fn sub_ifds_are_attached() -> anyhow::Result<()> {
  let arw = build_arw(&ArwOptions::default());
  let tiff = GenericTiffReader::new(&mut Cursor::new(&arw.data), None, &[])?;
  let root = tiff.root_ifd().unwrap();
  let subs = &root.sub_ifds()[&u16::from(TiffCommonTag::SubIFDs)];
  assert_eq!(subs.len(), 1);
  assert_eq!(subs[0].get_value(TiffCommonTag::Compression), Some(&Value::Short(vec![32767])));
  let with_strips = tiff.find_ifds_with_tag(TiffCommonTag::StripOffsets);
  assert_eq!(with_strips.len(), 1);
  assert_eq!(with_strips[0].offset, subs[0].offset);
  Ok(())
}

#[test]
fn broken_sub_ifd_is_isolated() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Little);
  let ifd = doc.ifd(&[Tag::Short(0x100, vec![16]), Tag::Long(0x14a, vec![9000])]);
  doc.set_first_ifd(ifd);
  let tiff = GenericTiffReader::new(&mut Cursor::new(doc.finish()), None, &[])?;
  let root = tiff.root_ifd().unwrap();
  assert_eq!(root.get_value(0x100_u16), Some(&Value::Short(vec![16])));
  assert_eq!(root.issues.len(), 1);
  assert_eq!(root.issues[0].tag, 0x14a);
  assert!(matches!(root.issues[0].error, TiffError::OffsetOutOfRange { offset: 9000, .. }));
  Ok(())
}

#[test]
fn repeated_sub_ifd_offsets_are_decoded_once() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Little);
  let big = doc.ifd(&[Tag::Undefined(0x9286, vec![0xaa; 4096])]);
  let distinct: Vec<u32> = (0..20).map(|i| doc.ifd(&[Tag::Short(0x100, vec![i])])).collect();
  let mut refs = vec![big; 1000];
  refs.extend_from_slice(&distinct);
  let first = doc.ifd(&[Tag::Long(0x14a, refs)]);
  doc.set_first_ifd(first);
  let data = doc.finish();

  let tiff = GenericTiffReader::new(&mut Cursor::new(&data), None, &[])?;
  let root = tiff.root_ifd().unwrap();
  let subs = &root.sub_ifds()[&0x14a_u16];
  // The repeated IFD once, then distinct ones up to the limit
  assert_eq!(subs.len(), MAX_SUB_IFDS);
  assert_eq!(subs[0].offset, big);
  assert_eq!(subs.iter().filter(|ifd| ifd.offset == big).count(), 1);
  assert_eq!(subs[1].offset, distinct[0]);
  let held: usize = subs.iter().flat_map(|ifd| ifd.values.iter().flatten()).map(|v| v.count()).sum();
  assert!(held < data.len());

  assert_eq!(root.issues.len(), 2);
  assert!(root.issues.iter().all(|issue| issue.tag == 0x14a));
  assert!(root.issues.iter().any(|issue| matches!(&issue.error, TiffError::General(msg) if msg.contains("999 duplicate"))));
  assert!(root.issues.iter().any(|issue| matches!(&issue.error, TiffError::General(msg) if msg.contains("limit"))));
  Ok(())
}

#[test]
fn zero_denominator_only_affects_its_entry() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Big);
  let ifd = doc.ifd(&[Tag::Rational(0x11a, vec![(72, 0)]), Tag::Short(0x101, vec![480])]);
  doc.set_first_ifd(ifd);
  let tiff = GenericTiffReader::new(&mut Cursor::new(doc.finish()), None, &[])?;
  let root = tiff.root_ifd().unwrap();
  assert!(root.has_entry(0x11a_u16));
  assert_eq!(root.get_value(0x11a_u16), None);
  assert_eq!(root.get_value(0x101_u16), Some(&Value::Short(vec![480])));
  assert_eq!(root.issues[0].error, TiffError::DivideByZero(0x11a));
  assert!(tiff.warnings.is_empty());
  Ok(())
}

#[test]
fn unknown_types_stay_unresolved() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Little);
  // FLOAT and an unknown vendor type
  let ifd = doc.ifd(&[Tag::Raw(0x200, 11, 1, 0x3f80_0000), Tag::Raw(0x201, 99, 1000, 8)]);
  doc.set_first_ifd(ifd);
  let tiff = GenericTiffReader::new(&mut Cursor::new(doc.finish()), None, &[])?;
  let root = tiff.root_ifd().unwrap();
  assert_eq!(root.entries.len(), 2);
  assert!(root.values.iter().all(Option::is_none));
  assert!(root.issues.is_empty());
  Ok(())
}

#[test]
fn cyclic_chain_stops() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Little);
  let first = doc.ifd(&[Tag::Short(0x100, vec![1])]);
  let second = doc.ifd(&[Tag::Short(0x100, vec![2])]);
  doc.link(first, second);
  doc.link(second, first);
  doc.set_first_ifd(first);
  let tiff = GenericTiffReader::new(&mut Cursor::new(doc.finish()), None, &[])?;
  assert_eq!(tiff.chain().len(), 2);
  assert_eq!(tiff.warnings, vec![TiffError::CyclicChain(first)]);
  Ok(())
}

#[test]
fn chain_length_is_limited() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Big);
  let offsets: Vec<u32> = (0..5).map(|i| doc.ifd(&[Tag::Short(0x100, vec![i])])).collect();
  for pair in offsets.windows(2) {
    doc.link(pair[0], pair[1]);
  }
  doc.set_first_ifd(offsets[0]);
  let data = doc.finish();
  let all = GenericTiffReader::new(&mut Cursor::new(&data), None, &[])?;
  assert_eq!(all.chain().len(), 5);
  assert!(all.warnings.is_empty());
  let limited = GenericTiffReader::new(&mut Cursor::new(&data), Some(2), &[])?;
  assert_eq!(limited.chain().len(), 2);
  // Dropped IFDs are visible to the caller
  assert_eq!(limited.warnings.len(), 1);
  assert!(matches!(&limited.warnings[0], TiffError::General(msg) if msg.contains(&offsets[2].to_string())));
  // A chain that fits exactly is complete
  let exact = GenericTiffReader::new(&mut Cursor::new(&data), Some(5), &[])?;
  assert_eq!(exact.chain().len(), 5);
  assert!(exact.warnings.is_empty());
  Ok(())
}

#[test]
fn truncated_chain_keeps_decoded_ifds() -> anyhow::Result<()> {
  let mut doc = DocBuilder::new(Endian::Little);
  let first = doc.ifd(&[Tag::Short(0x100, vec![1])]);
  let second = doc.ifd(&[Tag::Short(0x100, vec![2]), Tag::Short(0x101, vec![3])]);
  doc.link(first, second);
  doc.set_first_ifd(first);
  let mut data = doc.finish();
  // Cut into the entry table of the second IFD
  data.truncate(second as usize + 8);
  let tiff = GenericTiffReader::new(&mut Cursor::new(data), None, &[])?;
  assert_eq!(tiff.chain().len(), 1);
  assert!(matches!(tiff.warnings[..], [TiffError::UnexpectedEof(_)]));
  Ok(())
}

#[test]
fn ifd_outside_document() {
  let data = b"II\x2a\x00\x00\x10\x00\x00".to_vec();
  let tiff = GenericTiffReader::new(&mut Cursor::new(data), None, &[]).unwrap();
  assert!(tiff.chain().is_empty());
  assert!(matches!(tiff.warnings[..], [TiffError::OffsetOutOfRange { offset: 4096, .. }]));
}

#[test]
fn private_ifd_with_correction() -> anyhow::Result<()> {
  // A standalone IFD whose offsets are relative to a blob inside a bigger file
  let mut doc = DocBuilder::new(Endian::Little);
  let ifd = doc.ifd(&[Tag::Short(0x7310, vec![1, 2, 3, 4])]);
  let data = doc.finish();
  let blob = data[ifd as usize..].to_vec();
  let parsed = IFD::read(&mut Cursor::new(blob), ifd, -(ifd as i32), Endian::Little, &[])?;
  assert_eq!(parsed.offset, 0);
  assert_eq!(parsed.get_value(0x7310_u16), Some(&Value::Short(vec![1, 2, 3, 4])));
  Ok(())
}
