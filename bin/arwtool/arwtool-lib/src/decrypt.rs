// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use clap::ArgMatches;
use log::debug;
use sonyraw::{ArwDecoder, RawDecodeParams, decoders::arw::decrypt::decrypt_region, rawsource::RawSource};
use std::{
  fs,
  path::{Path, PathBuf},
};

use crate::AppError;

/// Entry point for Clap sub command `decrypt`
pub async fn decrypt(options: &ArgMatches) -> crate::Result<()> {
  let in_file: &PathBuf = options.get_one("FILE").ok_or(AppError::InvalidCmdSwitch("FILE not available".into()))?;
  let out_file: &PathBuf = options.get_one("OUTPUT").ok_or(AppError::InvalidCmdSwitch("OUTPUT not available".into()))?;
  let length = decrypt_file(in_file, out_file, options.get_flag("override"))?;
  if options.get_flag("verbose") {
    println!("Decrypted {} bytes => '{}'", length, out_file.display());
  }
  Ok(())
}

/// Decrypt the SR2 region of `input` into `output`, returns the region length
pub fn decrypt_file(input: &Path, output: &Path, replace: bool) -> crate::Result<usize> {
  if output.exists() && !replace {
    return Err(AppError::AlreadyExists(output.to_owned()));
  }
  let rawfile = RawSource::new(input)?;
  let decoder = ArwDecoder::new(&mut rawfile.reader(), &RawDecodeParams::default())?;
  let region = decoder.sr2_region(&mut rawfile.reader())?;
  debug!("SR2 region: {:?}", region);
  let plain = decrypt_region(&mut rawfile.reader(), &region)?;
  fs::write(output, &plain)?;
  Ok(plain.len())
}
