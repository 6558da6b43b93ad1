// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::warn;

pub(crate) fn sonyraw_ignore_previews() -> bool {
  match std::env::var("SONYRAW_IGNORE_PREVIEWS").map(|val| val.parse::<u32>()) {
    Ok(Ok(value)) => value == 1,
    Ok(Err(_)) => {
      warn!("Invalid value for SONYRAW_IGNORE_PREVIEWS");
      false
    }
    Err(_) => false,
  }
}

pub(crate) fn sonyraw_max_chain() -> Option<usize> {
  match std::env::var("SONYRAW_MAX_CHAIN").map(|val| val.parse::<usize>()) {
    Ok(Ok(value)) => Some(value),
    Ok(Err(_)) => {
      warn!("Invalid value for SONYRAW_MAX_CHAIN");
      None
    }
    Err(_) => None,
  }
}
