// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// TIFF field types known by this decoder.
///
/// Other type ids (SBYTE, FLOAT, DOUBLE, vendor types) are carried
/// in the raw entry but never resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, enumn::N)]
#[repr(u16)]
pub enum TagType {
  Byte = 1,
  Ascii = 2,
  Short = 3,
  Long = 4,
  Rational = 5,
  Undefined = 7,
  SShort = 8,
  SLong = 9,
  SRational = 10,
}

impl TagType {
  /// Size of a single element in bytes
  pub const fn width(self) -> u64 {
    match self {
      Self::Byte | Self::Ascii | Self::Undefined => 1,
      Self::Short | Self::SShort => 2,
      Self::Long | Self::SLong => 4,
      Self::Rational | Self::SRational => 8,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
  /// 8-bit unsigned integer
  Byte(Vec<u8>),
  /// 8-bit bytes with 7-bit ASCII codes, NUL terminated
  Ascii(String),
  /// 16-bit unsigned integer
  Short(Vec<u16>),
  /// 32-bit unsigned integer
  Long(Vec<u32>),
  /// Fraction of two 32-bit unsigned integers, reduced to a ratio
  Rational(Vec<f64>),
  /// 8-bit byte that may contain anything
  Undefined(Vec<u8>),
  /// 16-bit signed integer
  SShort(Vec<i16>),
  /// 32-bit signed integer
  SLong(Vec<i32>),
  /// Fraction of two 32-bit signed integers, reduced to a ratio
  SRational(Vec<f64>),
}

impl Value {
  pub fn tag_type(&self) -> TagType {
    match self {
      Self::Byte(_) => TagType::Byte,
      Self::Ascii(_) => TagType::Ascii,
      Self::Short(_) => TagType::Short,
      Self::Long(_) => TagType::Long,
      Self::Rational(_) => TagType::Rational,
      Self::Undefined(_) => TagType::Undefined,
      Self::SShort(_) => TagType::SShort,
      Self::SLong(_) => TagType::SLong,
      Self::SRational(_) => TagType::SRational,
    }
  }

  pub fn count(&self) -> usize {
    match self {
      Self::Byte(v) | Self::Undefined(v) => v.len(),
      Self::Ascii(v) => v.len(),
      Self::Short(v) => v.len(),
      Self::Long(v) => v.len(),
      Self::Rational(v) | Self::SRational(v) => v.len(),
      Self::SShort(v) => v.len(),
      Self::SLong(v) => v.len(),
    }
  }

  /// Get an integer element, converted to u32.
  /// Signed values are only returned if they are not negative.
  pub fn get_u32(&self, idx: usize) -> Option<u32> {
    match self {
      Self::Byte(v) | Self::Undefined(v) => v.get(idx).map(|x| *x as u32),
      Self::Short(v) => v.get(idx).map(|x| *x as u32),
      Self::Long(v) => v.get(idx).copied(),
      Self::SShort(v) => v.get(idx).and_then(|x| u32::try_from(*x).ok()),
      Self::SLong(v) => v.get(idx).and_then(|x| u32::try_from(*x).ok()),
      Self::Ascii(_) | Self::Rational(_) | Self::SRational(_) => None,
    }
  }

  pub fn get_u16(&self, idx: usize) -> Option<u16> {
    self.get_u32(idx).and_then(|v| u16::try_from(v).ok())
  }

  pub fn get_usize(&self, idx: usize) -> Option<usize> {
    self.get_u32(idx).map(|v| v as usize)
  }

  pub fn get_f64(&self, idx: usize) -> Option<f64> {
    match self {
      Self::Rational(v) | Self::SRational(v) => v.get(idx).copied(),
      Self::SShort(v) => v.get(idx).map(|x| *x as f64),
      Self::SLong(v) => v.get(idx).map(|x| *x as f64),
      _ => self.get_u32(idx).map(|x| x as f64),
    }
  }

  /// Raw bytes of BYTE and UNDEFINED values
  pub fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      Self::Byte(v) | Self::Undefined(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_string(&self) -> Option<&str> {
    match self {
      Self::Ascii(v) => Some(v),
      _ => None,
    }
  }

  pub(crate) fn ascii_from_raw(raw: &[u8]) -> Self {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    Self::Ascii(String::from_utf8_lossy(&raw[..end]).into_owned())
  }
}

/// Longer arrays are shortened for display
const DISPLAY_LIMIT: usize = 16;

fn fmt_list<T: Display>(f: &mut std::fmt::Formatter<'_>, list: &[T]) -> std::fmt::Result {
  for (i, v) in list.iter().take(DISPLAY_LIMIT).enumerate() {
    if i > 0 {
      f.write_str(" ")?;
    }
    write!(f, "{}", v)?;
  }
  if list.len() > DISPLAY_LIMIT {
    write!(f, " ... ({} values)", list.len())?;
  }
  Ok(())
}

impl Display for Value {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Byte(v) => fmt_list(f, v),
      Self::Ascii(v) => write!(f, "{:?}", v),
      Self::Short(v) => fmt_list(f, v),
      Self::Long(v) => fmt_list(f, v),
      Self::Rational(v) | Self::SRational(v) => fmt_list(f, v),
      Self::Undefined(v) => {
        if v.len() > DISPLAY_LIMIT {
          write!(f, "{}... ({} bytes)", hex::encode(&v[..DISPLAY_LIMIT]), v.len())
        } else {
          f.write_str(&hex::encode(v))
        }
      }
      Self::SShort(v) => fmt_list(f, v),
      Self::SLong(v) => fmt_list(f, v),
    }
  }
}
