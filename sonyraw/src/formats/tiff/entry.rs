// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Seek};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
  Result, TiffError, apply_corr, check_range,
  reader::{EndianReader, ReadByteOrder},
  value::{TagType, Value},
};

/// Raw 12 byte directory entry
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
  pub tag: u16,
  /// Type id as stored in file, may be unknown
  pub typ: u16,
  pub count: u32,
  /// Value or offset word, decoded in document byte order
  pub value_field: u32,
}

impl Entry {
  /// Parse entry at current reader position
  pub fn parse<R: Read + Seek>(reader: &mut EndianReader<R>) -> Result<Entry> {
    let tag = reader.read_u16()?;
    let typ = reader.read_u16()?;
    let count = reader.read_u32()?;
    let value_field = reader.read_u32()?;
    debug!("Tag: {:#x}, Typ: {:#x}, count: {}, value: {:#x}", tag, typ, count, value_field);
    Ok(Entry { tag, typ, count, value_field })
  }

  pub fn tag_type(&self) -> Option<TagType> {
    TagType::n(self.typ)
  }

  /// Total size of the value data in bytes, `None` for unknown types
  pub fn byte_size(&self) -> Option<u64> {
    self.tag_type().map(|t| t.width() * self.count as u64)
  }

  /// True if the value is packed into the value field
  pub fn is_inline(&self) -> bool {
    matches!(self.byte_size(), Some(size) if size <= 4)
  }

  /// Unpack an inline value from the value field.
  ///
  /// The elements are packed left to right starting at the most
  /// significant byte of the value word, regardless of document byte order.
  /// Returns `None` for unknown types or if the value is not inline.
  pub fn unpack_inline(&self) -> Option<Value> {
    if !self.is_inline() {
      return None;
    }
    let bytes = self.value_field.to_be_bytes();
    let count = self.count as usize;
    let short = |i: usize| u16::from_be_bytes([bytes[2 * i], bytes[2 * i + 1]]);
    let value = match self.tag_type()? {
      TagType::Byte => Value::Byte(bytes[..count].to_vec()),
      TagType::Ascii => Value::ascii_from_raw(&bytes[..count]),
      TagType::Undefined => Value::Undefined(bytes[..count].to_vec()),
      TagType::Short => Value::Short((0..count).map(short).collect()),
      TagType::SShort => Value::SShort((0..count).map(|i| short(i) as i16).collect()),
      TagType::Long => Value::Long(vec![self.value_field; count]),
      TagType::SLong => Value::SLong(vec![self.value_field as i32; count]),
      // 8 byte types only fit with a count of zero
      TagType::Rational => Value::Rational(Vec::new()),
      TagType::SRational => Value::SRational(Vec::new()),
    };
    Some(value)
  }

  /// Resolve the value of this entry.
  ///
  /// Inline values never touch the reader. Other values are read from
  /// the offset in the value field (corrected by `corr`) in document byte order,
  /// the range is checked against `limit` first.
  /// Unknown types resolve to `Ok(None)`.
  pub fn resolve<R: Read + Seek>(&self, reader: &mut EndianReader<R>, corr: i32, limit: u64) -> Result<Option<Value>> {
    let Some(typ) = self.tag_type() else {
      debug!("Tag {:#x} has unknown type {}, value not resolved", self.tag, self.typ);
      return Ok(None);
    };
    if self.is_inline() {
      return Ok(self.unpack_inline());
    }
    let offset = apply_corr(self.value_field, corr);
    let size = typ.width() * self.count as u64;
    check_range(offset as u64, size, limit)?;
    reader.goto(offset)?;

    let count = self.count as usize;
    let value = match typ {
      TagType::Byte | TagType::Undefined | TagType::Ascii => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        match typ {
          TagType::Byte => Value::Byte(v),
          TagType::Ascii => Value::ascii_from_raw(&v),
          _ => Value::Undefined(v),
        }
      }
      TagType::Short => {
        let mut v = vec![0; count];
        reader.read_u16_into(&mut v)?;
        Value::Short(v)
      }
      TagType::SShort => {
        let mut v = vec![0; count];
        reader.read_i16_into(&mut v)?;
        Value::SShort(v)
      }
      TagType::Long => {
        let mut v = vec![0; count];
        reader.read_u32_into(&mut v)?;
        Value::Long(v)
      }
      TagType::SLong => {
        let mut v = vec![0; count];
        reader.read_i32_into(&mut v)?;
        Value::SLong(v)
      }
      TagType::Rational => {
        let mut tmp = vec![0; count * 2]; // Rational is 2x u32
        reader.read_u32_into(&mut tmp)?;
        let v = tmp
          .chunks_exact(2)
          .map(|r| if r[1] == 0 { Err(TiffError::DivideByZero(self.tag)) } else { Ok(r[0] as f64 / r[1] as f64) })
          .collect::<Result<Vec<f64>>>()?;
        Value::Rational(v)
      }
      TagType::SRational => {
        let mut tmp = vec![0; count * 2];
        reader.read_i32_into(&mut tmp)?;
        let v = tmp
          .chunks_exact(2)
          .map(|r| if r[1] == 0 { Err(TiffError::DivideByZero(self.tag)) } else { Ok(r[0] as f64 / r[1] as f64) })
          .collect::<Result<Vec<f64>>>()?;
        Value::SRational(v)
      }
    };
    Ok(Some(value))
  }
}
