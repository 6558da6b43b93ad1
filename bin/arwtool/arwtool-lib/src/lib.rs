// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::PathBuf;

use sonyraw::{SonyRawError, formats::tiff::TiffError};
use thiserror::Error;

pub mod analyze;
pub mod app;
pub mod decode;
pub mod decrypt;
pub mod extract;
pub mod filemap;
pub mod jobs;

#[derive(Error, Debug)]
pub enum AppError {
  #[error("{}", _0)]
  General(String),
  #[error("Invalid arguments: {}", _0)]
  InvalidCmdSwitch(String),
  #[error("I/O error: {}", _0)]
  Io(#[from] std::io::Error),
  #[error("Not found: {}", _0.display())]
  NotFound(PathBuf),
  #[error("Already exists: {}", _0.display())]
  AlreadyExists(PathBuf),
  #[error("Decoder failed: {}", _0)]
  DecoderFailed(String),
  #[error("Unsupported file: {}", _0)]
  UnsupportedFile(String),
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for AppError {
  fn from(value: serde_json::Error) -> Self {
    anyhow::Error::new(value).into()
  }
}

impl From<serde_yaml::Error> for AppError {
  fn from(value: serde_yaml::Error) -> Self {
    anyhow::Error::new(value).into()
  }
}

impl From<SonyRawError> for AppError {
  fn from(value: SonyRawError) -> Self {
    match value {
      SonyRawError::DecoderFailed(err) => Self::DecoderFailed(err),
      SonyRawError::Unsupported(_) => Self::UnsupportedFile(value.to_string()),
      SonyRawError::Io(_, err) => Self::Io(err),
      _ => anyhow::Error::new(value).into(),
    }
  }
}

impl From<TiffError> for AppError {
  fn from(value: TiffError) -> Self {
    anyhow::Error::new(value).into()
  }
}

pub type Result<T> = std::result::Result<T, AppError>;
