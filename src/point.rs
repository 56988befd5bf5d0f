// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use chrono::{DateTime, Utc};
use getset::CopyGetters;
use serde::Serialize;


/// Size of one track point record on the wire.
pub const POINT_SIZE: usize = 32;

/// Coordinates are transmitted in millionths of a degree.
const COORD_SCALE: f64 = 1_000_000.0;


/// A single GPS sample.
///
/// The device only transmits the time since the previous point
/// (`interval_time`, tenths of a second); `time` is the absolute timestamp
/// reconstructed while decoding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct TrackPoint {
  pub(crate) time:          DateTime<Utc>,
  pub(crate) latitude:      i32,
  pub(crate) longitude:     i32,
  pub(crate) altitude:      i16,
  pub(crate) speed:         u32,
  pub(crate) heart_rate:    u8,
  pub(crate) interval_time: u16,
  pub(crate) cadence:       u16,
  pub(crate) pwr_cadence:   u16,
  pub(crate) power:         u16,
}

impl TrackPoint {
  pub fn latitude_deg(&self) -> f64 {
    f64::from(self.latitude) / COORD_SCALE
  }

  pub fn longitude_deg(&self) -> f64 {
    f64::from(self.longitude) / COORD_SCALE
  }

  pub fn speed_kmh(&self) -> f64 {
    f64::from(self.speed) / 100.0
  }

  pub fn interval_secs(&self) -> f64 {
    f64::from(self.interval_time) / 10.0
  }
}
