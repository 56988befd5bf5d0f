// Copyright 2020 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Jonas Reitemeyer <jonas@bmc-labs.com>
//   Florian Eich <florian@bmc-labs.com>

use super::{util, TrackLap, TrackPoint};
use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use log::warn;
use serde::Serialize;


/// Size of one entry of the track catalog, also the size of the header echo
/// at the start of every lap and point section.
pub const SUMMARY_SIZE: usize = 24;
/// Size of the detailed track header returned by `getTracks`.
pub const HEADER_SIZE: usize = 48;


/// Catalog entry describing one recorded track.
///
/// `total_time` is in tenths of a second, `distance` in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct TrackSummary {
  pub(crate) start:          DateTime<Utc>,
  pub(crate) point_count:    u16,
  pub(crate) total_time:     u32,
  pub(crate) distance:       u32,
  pub(crate) lap_count:      u16,
  pub(crate) track_pt_start: u32,
  pub(crate) track_id:       u16,
}

impl TrackSummary {
  pub fn total_secs(&self) -> f64 {
    f64::from(self.total_time) / 10.0
  }

  /// One line of the track listing, in the column order of `CATALOG_HEADING`.
  pub fn catalog_line(&self) -> String {
    format!("{:02} {} {:08} {} {:08} {:04}",
            self.track_id,
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.distance,
            util::format_decisec(self.total_time),
            self.point_count,
            self.lap_count)
  }
}

/// Column titles for `TrackSummary::catalog_line`.
pub const CATALOG_HEADING: &str =
  "id date                distance duration   trkpnts  laps";


/// Detailed header of the track currently being downloaded.
///
/// Its `start` seeds the reconstruction of absolute point timestamps. Units
/// are the same as on `TrackLap`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct TrackHeader {
  pub(crate) start:        DateTime<Utc>,
  pub(crate) point_count:  u16,
  pub(crate) total_time:   u32,
  pub(crate) distance:     u32,
  pub(crate) lap_count:    u16,
  pub(crate) calories:     u16,
  pub(crate) max_speed:    u32,
  pub(crate) max_heart:    u8,
  pub(crate) avg_heart:    u8,
  pub(crate) ascend:       u16,
  pub(crate) descend:      u16,
  pub(crate) min_altitude: i16,
  pub(crate) max_altitude: i16,
  pub(crate) avg_cadence:  u16,
  pub(crate) best_cadence: u16,
  pub(crate) avg_power:    u16,
  pub(crate) max_power:    u16,
}

impl TrackHeader {
  pub fn total_secs(&self) -> f64 {
    f64::from(self.total_time) / 10.0
  }

  pub fn max_speed_kmh(&self) -> f64 {
    f64::from(self.max_speed) / 100.0
  }
}


/// A downloaded track: the header and the laps and points belonging to it.
///
/// This is the read-only view handed to exporters. Laps and points are kept
/// in the order the device sent them.
#[derive(Clone, Debug, PartialEq, Serialize, Getters)]
#[getset(get = "pub")]
pub struct Track {
  header: TrackHeader,
  laps:   Vec<TrackLap>,
  points: Vec<TrackPoint>,
}

impl Track {
  pub fn new(header: TrackHeader) -> Self {
    Self { laps: Vec::with_capacity(header.lap_count as usize),
           points: Vec::with_capacity(header.point_count as usize),
           header }
  }

  pub(crate) fn push_lap(&mut self, lap: TrackLap) {
    self.laps.push(lap);
  }

  pub(crate) fn push_point(&mut self, point: TrackPoint) {
    self.points.push(point);
  }

  /// Points recorded during `lap`; clamped to what has been downloaded.
  pub fn lap_points(&self, lap: &TrackLap) -> &[TrackPoint] {
    let range = lap.point_range();
    let end = range.end.min(self.points.len());
    let start = range.start.min(end);
    &self.points[start..end]
  }

  /// `true` when as many laps and points arrived as the header announced.
  pub fn is_complete(&self) -> bool {
    self.laps.len() == self.header.lap_count as usize
    && self.points.len() == self.header.point_count as usize
  }

  /// Logs every disagreement between the header and the downloaded data.
  /// Returns the number of problems found.
  pub fn check_consistency(&self) -> usize {
    let mut problems = 0;

    if self.laps.len() != self.header.lap_count as usize {
      warn!("header announced {} laps, received {}",
            self.header.lap_count,
            self.laps.len());
      problems += 1;
    }
    if self.points.len() != self.header.point_count as usize {
      warn!("header announced {} points, received {}",
            self.header.point_count,
            self.points.len());
      problems += 1;
    }
    for (number, lap) in self.laps.iter().enumerate() {
      if lap.end_pt_index > u32::from(self.header.point_count) {
        warn!("lap {} ends at point {} beyond point count {}",
              number,
              lap.end_pt_index,
              self.header.point_count);
        problems += 1;
      }
    }

    problems
  }
}
