// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use clap::ArgMatches;
use log::{debug, warn};
use sonyraw::{
  RawDecodeParams,
  analyze::{raw_as_pgm, raw_pixels_digest},
  rawsource::RawSource,
};
use std::{
  fs::File,
  io::{BufWriter, Write},
  path::PathBuf,
};

use crate::AppError;

fn decode_params(options: &ArgMatches) -> RawDecodeParams {
  RawDecodeParams {
    max_chain: options.get_one::<usize>("max_chain").copied(),
    key: options.get_one::<[u8; 4]>("key").copied(),
    width: options.get_one::<usize>("width").copied(),
  }
}

/// Entry point for Clap sub command `decode`
pub async fn decode(options: &ArgMatches) -> crate::Result<()> {
  let in_file: &PathBuf = options.get_one("FILE").ok_or(AppError::InvalidCmdSwitch("FILE not available".into()))?;
  let params = decode_params(options);
  debug!("Infile: {:?}, params: {:?}", in_file, params);

  if options.get_flag("checksum") {
    let digest = raw_pixels_digest(in_file, &params)?;
    println!("{}", hex::encode(digest));
    return Ok(());
  }

  let rawfile = RawSource::new(in_file)?;
  let image = sonyraw::decode(&mut rawfile.reader(), &params)?;
  for issue in &image.issues {
    warn!("{}", issue);
  }
  if options.get_flag("verbose") {
    eprintln!(
      "Decoded {}x{} samples, {} bps, {} damaged blocks",
      image.width,
      image.height,
      image.bps,
      image.issues.len()
    );
  }

  match options.get_one::<PathBuf>("OUTPUT") {
    Some(out_file) => {
      if out_file.exists() && !options.get_flag("override") {
        return Err(AppError::AlreadyExists(out_file.clone()));
      }
      let mut writer = BufWriter::new(File::create(out_file)?);
      raw_as_pgm(image.width, image.height, image.pixels(), &mut writer)?;
      writer.flush()?;
    }
    None => {
      let mut writer = BufWriter::new(std::io::stdout());
      raw_as_pgm(image.width, image.height, image.pixels(), &mut writer)?;
      writer.flush()?;
    }
  }
  Ok(())
}
