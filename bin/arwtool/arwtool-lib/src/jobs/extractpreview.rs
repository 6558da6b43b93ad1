// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::Job;
use crate::{AppError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use sonyraw::{ArwDecoder, RawDecodeParams, decoders::preview::is_jpeg, rawsource::RawSource};
use std::{
  fmt::Display,
  fs::{self, File},
  io::{BufWriter, Write},
  path::PathBuf,
  time::Instant,
};

/// Job for writing the embedded preview of an ARW file
#[derive(Debug, Clone)]
pub struct ExtractPreviewJob {
  pub input: PathBuf,
  pub output: PathBuf,
  pub replace: bool,
}

/// State of extraction
#[derive(Debug)]
pub struct JobResult {
  pub job: ExtractPreviewJob,
  pub duration: f32,
  pub bytes: usize,
  pub error: Option<AppError>,
}

impl Display for JobResult {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(error) = self.error.as_ref() {
      f.write_fmt(format_args!("Failed: '{}', {}", self.job.input.display(), error))?;
    } else {
      f.write_fmt(format_args!(
        "Extracted '{}' => '{}' ({} bytes in {:.2}s)",
        self.job.input.display(),
        self.job.output.display(),
        self.bytes,
        self.duration
      ))?;
    }
    Ok(())
  }
}

impl ExtractPreviewJob {
  fn internal_exec(&self) -> Result<JobResult> {
    if self.output.exists() && !self.replace {
      return Err(AppError::AlreadyExists(self.output.clone()));
    }
    let rawfile = RawSource::new(&self.input)?;
    let decoder = ArwDecoder::new(&mut rawfile.reader(), &RawDecodeParams::default())?;
    let preview = decoder
      .preview(&mut rawfile.reader())?
      .ok_or_else(|| AppError::General("No embedded preview found".into()))?;
    if !is_jpeg(&preview) {
      warn!("Preview of '{}' has no JPEG start marker", self.input.display());
    }

    if let Some(parent) = self.output.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut stream = BufWriter::new(File::create(&self.output)?);
    stream.write_all(&preview)?;
    stream.flush()?;
    Ok(JobResult {
      job: self.clone(),
      duration: 0.0,
      bytes: preview.len(),
      error: None,
    })
  }
}

#[async_trait]
impl Job for ExtractPreviewJob {
  type Output = JobResult;

  async fn execute(&self) -> Self::Output {
    debug!("Job running: input: {:?}, output: {:?}", self.input, self.output);
    let now = Instant::now();
    match self.internal_exec() {
      Ok(mut stat) => {
        stat.duration = now.elapsed().as_secs_f32();
        stat
      }
      Err(e) => JobResult {
        job: self.clone(),
        duration: now.elapsed().as_secs_f32(),
        bytes: 0,
        error: Some(e),
      },
    }
  }
}
