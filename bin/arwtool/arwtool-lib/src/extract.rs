// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use clap::ArgMatches;
use futures::future::join_all;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::AppError;
use crate::filemap::{FileMap, MapMode};
use crate::jobs::Job;
use crate::jobs::extractpreview::{ExtractPreviewJob, JobResult};

const SUPPORTED_FILE_EXT: [&str; 2] = ["ARW", "SR2"];
const PREVIEW_EXT: &str = "jpg";

/// Entry point for Clap sub command `extract`
pub async fn extract(options: &ArgMatches) -> crate::Result<()> {
  let now = Instant::now();

  let in_path: &PathBuf = options.get_one("INPUT").ok_or(AppError::InvalidCmdSwitch("INPUT not available".into()))?;
  let out_path: &PathBuf = options.get_one("OUTPUT").ok_or(AppError::InvalidCmdSwitch("OUTPUT not available".into()))?;
  let jobs = generate_jobs(in_path, out_path, options.get_flag("recursive"), options.get_flag("override"))?;

  let verbose = options.get_flag("verbose");
  let results = run_jobs(&jobs, verbose).await;

  let total = results.len();
  let success = results.iter().filter(|j| j.error.is_none()).count();
  let failure = total - success;

  if failure == 0 {
    println!("Extracted {}/{} previews", success, total);
  } else {
    eprintln!("Extracted {}/{} previews, {} failed:", success, total, failure);
    for failed in results.iter().filter(|j| j.error.is_some()) {
      eprintln!("   {}", failed.job.input.display());
    }
  }
  println!("Total time: {:.2}s", now.elapsed().as_secs_f32());
  Ok(())
}

/// One job per input file. A single file maps to `output` (or into it, if
/// it is a directory), a directory maps to the same tree below `output`.
pub fn generate_jobs(input: &Path, output: &Path, recursive: bool, replace: bool) -> crate::Result<Vec<ExtractPreviewJob>> {
  let jobs = match MapMode::new(input, output)? {
    MapMode::File(sd) => vec![generate_job(&sd, replace)],
    MapMode::Dir(sd) => {
      eprintln!("Scanning directory, please wait...");
      sd.file_list(recursive, |file| file.extension().is_some_and(|ext| is_ext_supported(ext.to_string_lossy())))?
        .par_iter()
        .map(|entry| ExtractPreviewJob {
          input: entry.src.clone(),
          output: entry.dest.with_extension(PREVIEW_EXT),
          replace,
        })
        .collect()
    }
  };
  Ok(jobs)
}

/// Run jobs in chunks of 8 and collect the results in input order
pub async fn run_jobs(jobs: &[ExtractPreviewJob], verbose: bool) -> Vec<JobResult> {
  let mut results: Vec<JobResult> = Vec::with_capacity(jobs.len());
  for chunks in jobs.chunks(8) {
    let temp = join_all(chunks.iter().map(|j| j.execute())).await;
    for res in temp {
      if verbose {
        println!("Status: {}", res);
      }
      results.push(res);
    }
  }
  results
}

fn generate_job(entry: &FileMap, replace: bool) -> ExtractPreviewJob {
  ExtractPreviewJob {
    input: entry.src.clone(),
    output: entry.output_with_extension(PREVIEW_EXT),
    replace,
  }
}

/// Check if file extension is a supported extension
fn is_ext_supported<T: AsRef<str>>(ext: T) -> bool {
  let uc = ext.as_ref().to_uppercase();
  SUPPORTED_FILE_EXT.iter().any(|ext| ext.eq(&uc))
}
