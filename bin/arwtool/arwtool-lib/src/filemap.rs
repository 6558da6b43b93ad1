// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{
  fs::{self, read_dir},
  path::{Path, PathBuf},
};

use log::warn;

use crate::{AppError, Result};

/// Source file and where its output goes
#[derive(Debug, Clone, PartialEq)]
pub struct FileMap {
  pub src: PathBuf,
  pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirMap {
  pub src: PathBuf,
  pub dest: PathBuf,
}

/// Process mode
#[derive(Debug, Clone, PartialEq)]
pub enum MapMode {
  File(FileMap),
  Dir(DirMap),
}

impl FileMap {
  pub fn new(src: &Path, dest: &Path) -> Self {
    Self {
      src: PathBuf::from(src),
      dest: PathBuf::from(dest),
    }
  }

  /// Output path for a file with extension `ext`.
  ///
  /// If `dest` is an existing directory, the output is placed inside it
  /// and named after the source file.
  pub fn output_with_extension(&self, ext: &str) -> PathBuf {
    if self.dest.is_dir() {
      let name = self.src.file_name().map(PathBuf::from).unwrap_or_default();
      self.dest.join(name).with_extension(ext)
    } else {
      self.dest.clone()
    }
  }
}

impl DirMap {
  /// Construct new DirMap instance from src and dest
  pub fn new(src: &Path, dest: &Path) -> Self {
    Self {
      src: PathBuf::from(src),
      dest: PathBuf::from(dest),
    }
  }

  /// Get file list of source/destination mapped files
  pub fn file_list<F>(&self, recursive: bool, filter: F) -> Result<Vec<FileMap>>
  where
    F: Fn(&Path) -> bool + Copy,
  {
    read_filtered_dir(&self.src, recursive, filter)?
      .into_iter()
      .map(|entry| self.make_mapping(&entry))
      .collect()
  }

  /// Map `input` path to output, keeping the sub directory structure
  fn make_mapping(&self, input: &Path) -> Result<FileMap> {
    let sub_location = input
      .strip_prefix(&self.src)
      .map_err(|_| AppError::General(format!("{} is not located inside {}", input.display(), self.src.display())))?;
    Ok(FileMap {
      src: PathBuf::from(input),
      dest: self.dest.join(sub_location),
    })
  }
}

impl MapMode {
  /// Construct new MapMode from given input and output
  pub fn new(input: &Path, output: &Path) -> Result<MapMode> {
    if !input.exists() {
      return Err(AppError::NotFound(input.to_owned()));
    }
    let input_md = input.metadata()?;

    if input_md.is_file() {
      Ok(MapMode::File(FileMap::new(&input.canonicalize()?, output)))
    } else if input_md.is_dir() {
      if !output.exists() {
        return Err(AppError::NotFound(output.to_owned()));
      }
      if !output.metadata()?.is_dir() {
        return Err(AppError::InvalidCmdSwitch(format!(
          "Output '{}' must be a directory, because input is a directory",
          output.display()
        )));
      }
      Ok(MapMode::Dir(DirMap::new(&input.canonicalize()?, &output.canonicalize()?)))
    } else {
      Err(AppError::General(format!("Unable to determine type of {}", input.display())))
    }
  }
}

/// Read directory (optionally recursive) and filter entries
fn read_filtered_dir<F>(input: &Path, recursive: bool, filter: F) -> Result<Vec<PathBuf>>
where
  F: Fn(&Path) -> bool + Copy,
{
  let mut result = Vec::new();
  for entry in read_dir(input)? {
    let path = entry?.path();
    let md = fs::metadata(&path)?;
    if md.is_file() {
      if filter(&path) {
        result.push(path);
      }
    } else if md.is_dir() {
      if recursive {
        result.extend(read_filtered_dir(&path, recursive, filter)?);
      }
    } else {
      // Sockets, device files etc.
      warn!("Unable to determine type of {}", path.display());
    }
  }
  result.sort();
  Ok(result)
}
