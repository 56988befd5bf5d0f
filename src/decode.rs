// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{config::{Config, DEFAULT_HOUR_OFFSET},
            ensure,
            fubar,
            fubar::{Fubar, Result},
            lap::LAP_SIZE,
            point::POINT_SIZE,
            track::{HEADER_SIZE, SUMMARY_SIZE},
            util,
            TrackHeader,
            TrackLap,
            TrackPoint,
            TrackSummary};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use getset::CopyGetters;
use std::convert::TryInto;


/// The device counts years from 2000.
const BASE_YEAR: i32 = 2000;
/// The catalog response starts with a 3 byte status/length prefix ...
pub const CATALOG_HEADER: usize = 3;
/// ... and ends with a single checksum byte.
pub const CATALOG_FOOTER: usize = 1;


// PRIMITIVES ------------------------------------------------------------ //
fn field<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N]> {
  bytes.get(offset..offset + N)
       .and_then(|slice| slice.try_into().ok())
       .ok_or(Fubar::ShortRead { expected: offset + N,
                                 got:      bytes.len(), })
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8> {
  Ok(field::<1>(bytes, offset)?[0])
}

/// Multi-byte fields are little endian on the wire.
pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
  Ok(u16::from_le_bytes(field(bytes, offset)?))
}

pub fn read_i16(bytes: &[u8], offset: usize) -> Result<i16> {
  Ok(i16::from_le_bytes(field(bytes, offset)?))
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
  Ok(u32::from_le_bytes(field(bytes, offset)?))
}

pub fn read_i32(bytes: &[u8], offset: usize) -> Result<i32> {
  Ok(i32::from_le_bytes(field(bytes, offset)?))
}

/// Checks that `bytes` holds at least one full record of `size` bytes.
fn expect_record(bytes: &[u8], size: usize) -> Result<()> {
  if bytes.len() < size {
    return Err(Fubar::ShortRead { expected: size,
                                  got:      bytes.len(), });
  }
  Ok(())
}

/// Strips the status prefix and checksum footer from a `getTracklist`
/// response. Responses too short to hold both are error codes and carry no
/// catalog.
pub fn catalog_payload(response: &[u8]) -> &[u8] {
  if response.len() <= CATALOG_HEADER + CATALOG_FOOTER {
    return &[];
  }
  &response[CATALOG_HEADER..response.len() - CATALOG_FOOTER]
}

/// Splits a catalog payload into its 24 byte entries. A trailing partial
/// entry is dropped.
pub fn chop_catalog(payload: &[u8]) -> impl Iterator<Item = &[u8]> {
  payload.chunks_exact(SUMMARY_SIZE)
}


// DECODER --------------------------------------------------------------- //
/// Turns raw records into the track model.
///
/// The only state is the fixed hour offset applied to every date/time read
/// from the device.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Decoder {
  hour_offset: i64,
}

impl Default for Decoder {
  fn default() -> Self {
    Self::new(DEFAULT_HOUR_OFFSET)
  }
}

impl Decoder {
  pub fn new(hour_offset: i64) -> Self {
    Self { hour_offset }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.hour_offset())
  }

  /// Reads year (since 2000), month, day, hour, minute and second, one byte
  /// each, and shifts the result by the hour offset.
  pub fn read_datetime(&self,
                       bytes: &[u8],
                       offset: usize)
                       -> Result<DateTime<Utc>> {
    let raw = field::<6>(bytes, offset)?;
    let [year, month, day, hour, minute, second] = raw;

    let naive =
      NaiveDate::from_ymd_opt(BASE_YEAR + i32::from(year),
                              u32::from(month),
                              u32::from(day))
        .and_then(|date| {
          date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
        });

    let naive = match naive {
      Some(naive) => naive,
      None => return fubar!("invalid date/time {}", util::bytes_to_hex(&raw)),
    };
    match self.offset()
              .and_then(|offset| naive.checked_add_signed(offset))
    {
      Some(shifted) => Ok(Utc.from_utc_datetime(&shifted)),
      None => fubar!("hour offset {} out of range", self.hour_offset),
    }
  }

  fn offset(&self) -> Option<Duration> {
    Duration::try_hours(self.hour_offset)
  }

  /// Inverse of `read_datetime`.
  pub fn encode_datetime(&self, datetime: &DateTime<Utc>) -> Result<[u8; 6]> {
    let device = match self.offset()
                           .and_then(|offset| {
                             datetime.naive_utc().checked_sub_signed(offset)
                           }) {
      Some(device) => device,
      None => return fubar!("hour offset {} out of range", self.hour_offset),
    };
    let year = device.year() - BASE_YEAR;
    ensure!((0..=255).contains(&year),
            "year {} can't be represented",
            device.year());

    Ok([year as u8,
        device.month() as u8,
        device.day() as u8,
        device.hour() as u8,
        device.minute() as u8,
        device.second() as u8])
  }

  // CATALOG ------------------------------------------------------------- //
  pub fn decode_track_summary(&self, bytes: &[u8]) -> Result<TrackSummary> {
    expect_record(bytes, SUMMARY_SIZE)?;

    Ok(TrackSummary { start:          self.read_datetime(bytes, 0)?,
                      point_count:    read_u16(bytes, 6)?,
                      total_time:     read_u32(bytes, 8)?,
                      distance:       read_u32(bytes, 12)?,
                      lap_count:      read_u16(bytes, 16)?,
                      track_pt_start: read_u32(bytes, 18)?,
                      track_id:       read_u16(bytes, 22)?, })
  }

  /// Inverse of `decode_track_summary`.
  pub fn encode_track_summary(&self,
                              summary: &TrackSummary)
                              -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(SUMMARY_SIZE);
    bytes.extend_from_slice(&self.encode_datetime(&summary.start)?);
    bytes.extend_from_slice(&summary.point_count.to_le_bytes());
    bytes.extend_from_slice(&summary.total_time.to_le_bytes());
    bytes.extend_from_slice(&summary.distance.to_le_bytes());
    bytes.extend_from_slice(&summary.lap_count.to_le_bytes());
    bytes.extend_from_slice(&summary.track_pt_start.to_le_bytes());
    bytes.extend_from_slice(&summary.track_id.to_le_bytes());
    Ok(bytes)
  }

  /// Decodes every entry of a full `getTracklist` response, in device order.
  pub fn decode_track_catalog(&self,
                              response: &[u8])
                              -> Result<Vec<TrackSummary>> {
    chop_catalog(catalog_payload(response))
      .map(|entry| self.decode_track_summary(entry))
      .collect()
  }

  // TRACK ---------------------------------------------------------------- //
  pub fn decode_track_header(&self, bytes: &[u8]) -> Result<TrackHeader> {
    expect_record(bytes, HEADER_SIZE)?;

    Ok(TrackHeader { start:        self.read_datetime(bytes, 0)?,
                     point_count:  read_u16(bytes, 6)?,
                     total_time:   read_u32(bytes, 8)?,
                     distance:     read_u32(bytes, 12)?,
                     lap_count:    read_u16(bytes, 16)?,
                     calories:     read_u16(bytes, 18)?,
                     max_speed:    read_u32(bytes, 20)?,
                     max_heart:    read_u8(bytes, 24)?,
                     avg_heart:    read_u8(bytes, 25)?,
                     ascend:       read_u16(bytes, 26)?,
                     descend:      read_u16(bytes, 28)?,
                     min_altitude: read_i16(bytes, 30)?,
                     max_altitude: read_i16(bytes, 32)?,
                     avg_cadence:  read_u16(bytes, 34)?,
                     best_cadence: read_u16(bytes, 36)?,
                     avg_power:    read_u16(bytes, 38)?,
                     max_power:    read_u16(bytes, 40)?, })
  }

  pub fn decode_lap(&self, bytes: &[u8]) -> Result<TrackLap> {
    expect_record(bytes, LAP_SIZE)?;

    let lap = TrackLap { end_time:       read_u32(bytes, 0)?,
                         lap_time:       read_u32(bytes, 4)?,
                         distance:       read_u32(bytes, 8)?,
                         calories:       read_u16(bytes, 12)?,
                         max_speed:      read_u32(bytes, 14)?,
                         max_heart:      read_u8(bytes, 18)?,
                         avg_heart:      read_u8(bytes, 19)?,
                         min_altitude:   read_i16(bytes, 20)?,
                         max_altitude:   read_i16(bytes, 22)?,
                         avg_cadence:    read_u16(bytes, 24)?,
                         best_cadence:   read_u16(bytes, 26)?,
                         avg_power:      read_u16(bytes, 28)?,
                         max_power:      read_u16(bytes, 30)?,
                         start_pt_index: read_u32(bytes, 32)?,
                         end_pt_index:   read_u32(bytes, 36)?, };

    ensure!(lap.start_pt_index <= lap.end_pt_index,
            "lap starts at point {} after its end at point {}",
            lap.start_pt_index,
            lap.end_pt_index);
    Ok(lap)
  }

  /// Decodes one point and stamps it with `running_time` plus its interval.
  ///
  /// Returns the point and the running time for the next point; points must
  /// be fed in device order.
  pub fn decode_point(&self,
                      bytes: &[u8],
                      running_time: DateTime<Utc>)
                      -> Result<(TrackPoint, DateTime<Utc>)> {
    expect_record(bytes, POINT_SIZE)?;

    let interval_time = read_u16(bytes, 16)?;
    let time =
      running_time + Duration::milliseconds(i64::from(interval_time) * 100);

    let point = TrackPoint { time,
                             latitude: read_i32(bytes, 0)?,
                             longitude: read_i32(bytes, 4)?,
                             altitude: read_i16(bytes, 8)?,
                             speed: read_u32(bytes, 10)?,
                             heart_rate: read_u8(bytes, 14)?,
                             interval_time,
                             cadence: read_u16(bytes, 18)?,
                             pwr_cadence: read_u16(bytes, 20)?,
                             power: read_u16(bytes, 22)? };
    Ok((point, time))
  }

  /// Folds `decode_point` over consecutive point records starting at `seed`.
  /// Trailing bytes shorter than a record are ignored.
  pub fn decode_points(&self,
                       bytes: &[u8],
                       seed: DateTime<Utc>)
                       -> Result<(Vec<TrackPoint>, DateTime<Utc>)> {
    bytes.chunks_exact(POINT_SIZE).try_fold(
      (Vec::with_capacity(bytes.len() / POINT_SIZE), seed),
      |(mut points, running), record| {
        let (point, running) = self.decode_point(record, running)?;
        points.push(point);
        Ok((points, running))
      },
    )
  }
}
