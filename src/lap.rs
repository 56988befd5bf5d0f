// Copyright 2020 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Jonas Reitemeyer <jonas@bmc-labs.com>
//   Florian Eich <florian@bmc-labs.com>

use getset::CopyGetters;
use serde::Serialize;
use std::ops::Range;


/// Size of one lap record on the wire.
pub const LAP_SIZE: usize = 40;


/// One lap of a track as recorded by the watch.
///
/// All times are in tenths of a second: `end_time` is relative to the start
/// of the track, `lap_time` is the duration of the lap itself. Speeds are in
/// 0.01 km/h, distances in meters, altitudes in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct TrackLap {
  pub(crate) end_time:       u32,
  pub(crate) lap_time:       u32,
  pub(crate) distance:       u32,
  pub(crate) calories:       u16,
  pub(crate) max_speed:      u32,
  pub(crate) max_heart:      u8,
  pub(crate) avg_heart:      u8,
  pub(crate) min_altitude:   i16,
  pub(crate) max_altitude:   i16,
  pub(crate) avg_cadence:    u16,
  pub(crate) best_cadence:   u16,
  pub(crate) avg_power:      u16,
  pub(crate) max_power:      u16,
  pub(crate) start_pt_index: u32,
  pub(crate) end_pt_index:   u32,
}

impl TrackLap {
  /// Start of the lap relative to the start of the track, in tenths of a
  /// second.
  pub fn start_time(&self) -> u32 {
    self.end_time.saturating_sub(self.lap_time)
  }

  pub fn lap_secs(&self) -> f64 {
    f64::from(self.lap_time) / 10.0
  }

  pub fn end_secs(&self) -> f64 {
    f64::from(self.end_time) / 10.0
  }

  pub fn max_speed_kmh(&self) -> f64 {
    f64::from(self.max_speed) / 100.0
  }

  /// Indices into the track's point sequence covered by this lap, end
  /// inclusive on the device, hence the `+ 1`.
  pub fn point_range(&self) -> Range<usize> {
    self.start_pt_index as usize..self.end_pt_index as usize + 1
  }
}
