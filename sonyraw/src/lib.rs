//! Library to decode Sony ARW/SR2 camera raw containers.
//!
//! A raw container is a TIFF document with an embedded JPEG preview,
//! an encrypted private IFD (SR2) and the sensor data, stored either
//! uncompressed or as compressed 16 sample blocks.
//!
//! # Example
//! ```rust,no_run
//! use std::env;
//!
//! fn main() {
//!   let args: Vec<_> = env::args().collect();
//!   if args.len() != 2 {
//!     println!("Usage: {} <file>", args[0]);
//!     std::process::exit(2);
//!   }
//!   let image = sonyraw::decode_file(&args[1]).unwrap();
//!   println!("{}x{} pixels, {} block errors", image.width, image.height, image.issues.len());
//! }
//! ```

#![deny(unstable_features)]

pub mod analyze;
pub mod bits;
pub mod decoders;
pub mod decompressors;
pub(crate) mod envparams;
pub mod formats;
pub mod pixarray;
pub mod pumps;
pub mod rawimage;
pub mod rawsource;
pub mod tags;

pub use decoders::RawDecodeParams;
pub use decoders::arw::ArwDecoder;
pub use rawimage::RawImage;

use formats::tiff::TiffError;
use rawsource::RawSource;
use std::io::{Read, Seek};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SonyRawError {
  #[error("File is unsupported: {}", _0)]
  Unsupported(String),

  #[error("Decoder failed: {}", _0)]
  DecoderFailed(String),

  /// Pixel block with less bytes than required
  #[error("Truncated block at offset {}: got {} of {} bytes", offset, len, expected)]
  TruncatedBlock { offset: usize, len: usize, expected: usize },

  #[error(transparent)]
  Tiff(#[from] TiffError),

  #[error("I/O error on file: {:?}, {}", _0, _1)]
  Io(std::path::PathBuf, std::io::Error),
}

pub type Result<T> = std::result::Result<T, SonyRawError>;

impl SonyRawError {
  pub fn with_io_error(path: impl AsRef<Path>, error: std::io::Error) -> Self {
    Self::Io(path.as_ref().to_owned(), error)
  }
}

impl From<String> for SonyRawError {
  fn from(str: String) -> Self {
    Self::DecoderFailed(str)
  }
}

/// Take a path to a raw file and return a decoded image or an error
///
/// # Example
/// ```rust,ignore
/// let image = match sonyraw::decode_file("path/to/your/file.ARW") {
///   Ok(val) => val,
///   Err(e) => ... some appropriate action when the file is unreadable ...
/// };
/// ```
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<RawImage> {
  let path = path.as_ref();
  let rawfile = RawSource::new(path).map_err(|err| SonyRawError::with_io_error(path, err))?;
  decode(&mut rawfile.reader(), &RawDecodeParams::default())
}

/// Take a readable source and return a decoded image or an error
pub fn decode<R: Read + Seek>(reader: &mut R, params: &RawDecodeParams) -> Result<RawImage> {
  let decoder = ArwDecoder::new(reader, params)?;
  decoder.raw_image(reader, params)
}
