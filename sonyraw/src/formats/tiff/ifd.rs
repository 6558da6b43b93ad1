// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::{
  Entry, Result, TiffError, Value, apply_corr, check_range,
  reader::{EndianReader, ReadByteOrder},
  stream_len,
};
use crate::{bits::Endian, tags::TiffTag};
use log::{debug, warn};
use serde::Serialize;
use std::{
  collections::{BTreeMap, HashSet},
  io::{Read, Seek},
};

/// Size of a single IFD entry in bytes
const ENTRY_SIZE: u64 = 12;

/// Maximum number of sub IFDs decoded for a single tag
pub const MAX_SUB_IFDS: usize = 16;

/// A failure while resolving a single entry value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryIssue {
  pub tag: u16,
  #[serde(serialize_with = "serialize_error")]
  pub error: TiffError,
}

fn serialize_error<S: serde::Serializer>(error: &TiffError, s: S) -> std::result::Result<S::Ok, S::Error> {
  s.collect_str(error)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IFD {
  pub offset: u32,
  pub corr: i32,
  pub endian: Endian,
  pub count: u16,
  pub entries: Vec<Entry>,
  /// Resolved values, parallel to `entries`. `None` for unknown
  /// types or when resolving the value failed.
  pub values: Vec<Option<Value>>,
  pub issues: Vec<EntryIssue>,
  pub next_ifd: u32,
  pub sub: BTreeMap<u16, Vec<IFD>>,
}

impl IFD {
  /// Decode the IFD at `offset`.
  ///
  /// `corr` is a correction value applied to all offsets found in file
  /// structure (and to `offset` itself). Errors in the IFD structure
  /// (count, entry table, next pointer) fail the whole IFD. Errors while
  /// resolving a single value are recorded in `issues`.
  /// Offsets from entries listed in `sub_tags` are decoded as sub IFDs.
  pub fn read<R: Read + Seek>(reader: &mut R, offset: u32, corr: i32, endian: Endian, sub_tags: &[u16]) -> Result<IFD> {
    let limit = stream_len(reader)?;
    let start = apply_corr(offset, corr);
    check_range(start as u64, 2, limit)?;

    let mut reader = EndianReader::new(reader, endian);
    reader.goto(start)?;
    let count = reader.read_u16()?;
    if (start as u64) + 2 + count as u64 * ENTRY_SIZE + 4 > limit {
      return Err(TiffError::UnexpectedEof(format!(
        "IFD at {} with {} entries exceeds document size {}",
        start, count, limit
      )));
    }
    debug!("Parse {} entries of IFD at {}", count, start);
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
      entries.push(Entry::parse(&mut reader)?);
    }
    let next_ifd = reader.read_u32()?;

    let mut values = Vec::with_capacity(entries.len());
    let mut issues = Vec::new();
    for entry in &entries {
      match entry.resolve(&mut reader, corr, limit) {
        Ok(value) => values.push(value),
        Err(error) => {
          warn!("Failed to resolve TIFF tag 0x{:X}, skipping: {}", entry.tag, error);
          issues.push(EntryIssue { tag: entry.tag, error });
          values.push(None);
        }
      }
    }

    let mut ifd = IFD {
      offset: start,
      corr,
      endian,
      count,
      entries,
      values,
      issues,
      next_ifd: if next_ifd == 0 { 0 } else { apply_corr(next_ifd, corr) },
      sub: BTreeMap::new(),
    };

    // Process SubIFDs, each offset only once per IFD
    let reader = reader.into_inner();
    let mut visited = HashSet::new();
    for tag in sub_tags {
      let Some(offsets) = ifd.sub_ifd_offsets(*tag) else {
        continue;
      };
      let mut ifds = Vec::new();
      let mut decoded = 0;
      let mut duplicates = 0;
      for sub_offset in offsets {
        if !visited.insert(sub_offset) {
          duplicates += 1;
          continue;
        }
        if decoded >= MAX_SUB_IFDS {
          warn!("More than {} sub IFDs for tag 0x{:X}, ignoring the rest", MAX_SUB_IFDS, tag);
          ifd.issues.push(EntryIssue {
            tag: *tag,
            error: TiffError::General(format!("sub IFD limit of {} reached", MAX_SUB_IFDS)),
          });
          break;
        }
        decoded += 1;
        // Sub IFD offsets are absolute, except for the correction
        match Self::read(reader, sub_offset, corr, endian, &[]) {
          Ok(sub) => ifds.push(sub),
          Err(error) => {
            warn!("Error while processing TIFF sub-IFD for tag 0x{:X}, ignoring it: {}", tag, error);
            ifd.issues.push(EntryIssue { tag: *tag, error });
          }
        }
      }
      if duplicates > 0 {
        warn!("Skipped {} duplicate sub IFD offsets for tag 0x{:X}", duplicates, tag);
        ifd.issues.push(EntryIssue {
          tag: *tag,
          error: TiffError::General(format!("{} duplicate sub IFD offsets", duplicates)),
        });
      }
      ifd.sub.insert(*tag, ifds);
    }
    Ok(ifd)
  }

  fn sub_ifd_offsets(&self, tag: u16) -> Option<Vec<u32>> {
    match self.get_value(tag)? {
      Value::Long(offsets) => Some(offsets.clone()),
      // Some writers use UNDEFINED for a single IFD pointer
      Value::Undefined(_) => self.get_entry(tag).map(|entry| vec![entry.value_field]),
      val => {
        log::info!(
          "Found IFD offset tag, but type mismatch: {:?}. Ignoring SubIFD parsing for tag 0x{:X}",
          val.tag_type(),
          tag
        );
        None
      }
    }
  }

  fn position<T: TiffTag>(&self, tag: T) -> Option<usize> {
    let tag = tag.into();
    self.entries.iter().position(|entry| entry.tag == tag)
  }

  pub fn get_entry<T: TiffTag>(&self, tag: T) -> Option<&Entry> {
    self.position(tag).map(|idx| &self.entries[idx])
  }

  pub fn get_value<T: TiffTag>(&self, tag: T) -> Option<&Value> {
    self.position(tag).and_then(|idx| self.values[idx].as_ref())
  }

  pub fn has_entry<T: TiffTag>(&self, tag: T) -> bool {
    self.position(tag).is_some()
  }

  pub fn value_iter(&self) -> impl Iterator<Item = (&Entry, Option<&Value>)> {
    self.entries.iter().zip(self.values.iter().map(Option::as_ref))
  }

  pub fn sub_ifds(&self) -> &BTreeMap<u16, Vec<IFD>> {
    &self.sub
  }

  /// Issues of this IFD and of all its sub IFDs
  pub fn all_issues(&self) -> Vec<&EntryIssue> {
    let mut list: Vec<&EntryIssue> = self.issues.iter().collect();
    for subs in self.sub.values() {
      for sub in subs {
        list.extend(sub.all_issues());
      }
    }
    list
  }

  /// Dump the IFD as human readable lines
  pub fn dump<F>(&self, indent: usize, name_of: &F) -> Vec<String>
  where
    F: Fn(u16) -> Option<String>,
  {
    let mut out = Vec::new();
    let pad = " ".repeat(indent);
    out.push(format!("{}IFD offset: {}, entries: {}, next: {}", pad, self.offset, self.count, self.next_ifd));
    for (entry, value) in self.value_iter() {
      let name = name_of(entry.tag).unwrap_or_else(|| format!("<?{:#06x}>", entry.tag));
      match value {
        Some(value) => out.push(format!("{}  {} ({:#06x}) = {}", pad, name, entry.tag, value)),
        None => out.push(format!("{}  {} ({:#06x}) type {} count {} unresolved", pad, name, entry.tag, entry.typ, entry.count)),
      }
    }
    for (tag, subs) in &self.sub {
      for sub in subs {
        let name = name_of(*tag).unwrap_or_else(|| format!("{:#06x}", tag));
        out.push(format!("{}  SubIFD {}:", pad, name));
        out.extend(sub.dump(indent + 4, name_of));
      }
    }
    out
  }
}
