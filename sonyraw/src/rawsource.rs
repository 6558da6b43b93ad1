use std::{
  fmt::Debug,
  fs::File,
  io::Cursor,
  ops::Deref,
  path::{Path, PathBuf},
  sync::Arc,
};

use md5::Digest;
use memmap2::MmapOptions;

/// Read-only view of a raw container, memory mapped or in memory
pub struct RawSource {
  path: PathBuf,
  inner: RawSourceImpl,
}

enum RawSourceImpl {
  Memmap(memmap2::Mmap),
  Memory(Arc<Vec<u8>>),
}

impl RawSource {
  pub fn new(path: &Path) -> std::io::Result<Self> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only, a file changed by another
    // process while mapped is not supported.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    #[cfg(unix)]
    mmap.advise(memmap2::Advice::WillNeed)?;
    Ok(Self {
      path: path.canonicalize().unwrap_or_else(|_| path.to_owned()),
      inner: RawSourceImpl::Memmap(mmap),
    })
  }

  pub fn new_from_shared_vec(buf: Arc<Vec<u8>>) -> Self {
    Self {
      path: PathBuf::default(),
      inner: RawSourceImpl::Memory(buf),
    }
  }

  pub fn new_from_slice(buf: &[u8]) -> Self {
    Self::new_from_shared_vec(Arc::new(Vec::from(buf)))
  }

  /// Calculate digest for file
  pub fn digest(&self) -> Digest {
    md5::compute(self.buf())
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn buf(&self) -> &[u8] {
    self.deref()
  }

  pub fn subview(&self, offset: u64, size: u64) -> std::io::Result<&[u8]> {
    offset
      .checked_add(size)
      .and_then(|end| self.buf().get(offset as usize..end as usize))
      .ok_or(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("subview(): Offset {}+{} is behind EOF", offset, size),
      ))
  }

  pub fn reader(&self) -> Cursor<&[u8]> {
    Cursor::new(self.buf())
  }
}

impl Deref for RawSource {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    match &self.inner {
      RawSourceImpl::Memmap(mmap) => mmap.deref(),
      RawSourceImpl::Memory(mem) => mem.deref(),
    }
  }
}

impl Debug for RawSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RawSource").field("path", &self.path).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn subview_bounds() {
    let src = RawSource::new_from_slice(&[1, 2, 3, 4]);
    assert_eq!(src.subview(1, 2).unwrap(), &[2, 3]);
    assert!(src.subview(3, 2).is_err());
    assert!(src.subview(u64::MAX, 2).is_err());
    assert_eq!(format!("{:x}", src.digest()), "08d6c05a21512a79a1dfeb9d2a8f262f");
  }
}
