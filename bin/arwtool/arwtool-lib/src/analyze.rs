// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use clap::ArgMatches;
use log::debug;
use serde::Serialize;
use sonyraw::analyze::{analyze_metadata, dump_ifds};
use std::path::PathBuf;

use crate::AppError;

pub(crate) fn print_output<T: Serialize + ?Sized>(obj: &T, options: &ArgMatches) -> crate::Result<()> {
  if options.get_flag("yaml") {
    let yaml = serde_yaml::to_string(obj)?;
    println!("{}", yaml);
  } else {
    let json = serde_json::to_string_pretty(obj)?;
    println!("{}", json);
  }
  Ok(())
}

/// Entry point for Clap sub command `analyze`
pub async fn analyze(options: &ArgMatches) -> crate::Result<()> {
  let in_file: &PathBuf = options.get_one("FILE").ok_or(AppError::InvalidCmdSwitch("FILE not available".into()))?;

  debug!("Infile: {:?}", in_file);

  if options.get_flag("dump") {
    for line in dump_ifds(in_file)? {
      println!("{}", line);
    }
  } else {
    let analyze = analyze_metadata(in_file)?;
    print_output(&analyze, options)?;
  }
  Ok(())
}
