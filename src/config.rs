// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::fubar::{Fubar, Result};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};


/// Serial device the watch cradle usually shows up as on Linux.
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";
/// The watch only talks at this speed.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;
/// Turnaround timeout per read.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;
/// Hours added to the device clock when decoding timestamps (daylight saving
/// compensation). Fixed, not derived from the device or the host clock.
pub const DEFAULT_HOUR_OFFSET: i64 = -1;
/// Largest hour offset accepted from a config file, in either direction.
pub const MAX_HOUR_OFFSET: i64 = 24;


/// Settings for one device session.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, CopyGetters,
         Getters)]
#[serde(default)]
pub struct Config {
  #[getset(get = "pub")]
  port:        String,
  #[getset(get_copy = "pub")]
  baud_rate:   u32,
  #[getset(get_copy = "pub")]
  timeout_ms:  u64,
  #[getset(get_copy = "pub")]
  hour_offset: i64,
}

impl Default for Config {
  fn default() -> Self {
    Self { port:        DEFAULT_PORT.to_string(),
           baud_rate:   DEFAULT_BAUD_RATE,
           timeout_ms:  DEFAULT_TIMEOUT_MS,
           hour_offset: DEFAULT_HOUR_OFFSET, }
  }
}

impl Config {
  pub fn new(port: &str) -> Self {
    Self { port: port.to_string(),
           ..Self::default() }
  }

  /// Reads a JSON config file. Missing keys fall back to their defaults.
  pub fn load(path: &Path) -> Result<Self> {
    let text = fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  pub fn from_json(text: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(text)?;
    if !(-MAX_HOUR_OFFSET..=MAX_HOUR_OFFSET).contains(&config.hour_offset) {
      return Err(Fubar::Config(format!("hour_offset {} outside of -{}..={}",
                                       config.hour_offset,
                                       MAX_HOUR_OFFSET,
                                       MAX_HOUR_OFFSET)));
    }
    Ok(config)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}
