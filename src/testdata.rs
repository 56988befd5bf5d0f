// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Canned device responses and an in-memory channel for the unit tests.

use super::util;
use std::{collections::VecDeque,
          io::{self, Read, Write}};


// RECORDS --------------------------------------------------------------- //
/// 2014-10-29 18:42:44 device time, 1846 points, 3 laps.
const HEADER_HEX: &str = "0E0A1D122A2C3607649800001E760000\
                          03002E03100E0000B48C7B007C00F6FF\
                          2C0155006E0000000000000000000000";

pub fn header_bytes() -> Vec<u8> {
  util::hex_to_bytes(HEADER_HEX).unwrap()
}

/// `header_bytes` with different point and lap counts.
pub fn header_bytes_with(point_count: u16, lap_count: u16) -> Vec<u8> {
  let mut bytes = header_bytes();
  bytes[6..8].copy_from_slice(&point_count.to_le_bytes());
  bytes[16..18].copy_from_slice(&lap_count.to_le_bytes());
  bytes
}

pub fn summary_bytes(track_id: u16,
                     point_count: u16,
                     total_time: u32,
                     distance: u32)
                     -> Vec<u8> {
  let mut bytes = vec![0x0E, 0x0A, 0x1D, 0x12, 0x2A, 0x2C];
  bytes.extend_from_slice(&point_count.to_le_bytes());
  bytes.extend_from_slice(&total_time.to_le_bytes());
  bytes.extend_from_slice(&distance.to_le_bytes());
  bytes.extend_from_slice(&3u16.to_le_bytes());
  bytes.extend_from_slice(&(u32::from(track_id) * 0x100).to_le_bytes());
  bytes.extend_from_slice(&track_id.to_le_bytes());
  bytes
}

pub fn lap_bytes(end_time: u32,
                 lap_time: u32,
                 start_pt_index: u32,
                 end_pt_index: u32)
                 -> Vec<u8> {
  let mut bytes = Vec::with_capacity(40);
  bytes.extend_from_slice(&end_time.to_le_bytes());
  bytes.extend_from_slice(&lap_time.to_le_bytes());
  bytes.extend_from_slice(&1_000u32.to_le_bytes());
  bytes.extend_from_slice(&42u16.to_le_bytes());
  bytes.extend_from_slice(&3_512u32.to_le_bytes());
  bytes.extend_from_slice(&[171, 150]);
  bytes.extend_from_slice(&(-3i16).to_le_bytes());
  bytes.extend_from_slice(&120i16.to_le_bytes());
  bytes.extend_from_slice(&88u16.to_le_bytes());
  bytes.extend_from_slice(&101u16.to_le_bytes());
  bytes.extend_from_slice(&[0x00; 4]);
  bytes.extend_from_slice(&start_pt_index.to_le_bytes());
  bytes.extend_from_slice(&end_pt_index.to_le_bytes());
  bytes
}

pub fn point_bytes(latitude: i32, longitude: i32, interval_time: u16) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(32);
  bytes.extend_from_slice(&latitude.to_le_bytes());
  bytes.extend_from_slice(&longitude.to_le_bytes());
  bytes.extend_from_slice(&657i16.to_le_bytes());
  bytes.extend_from_slice(&2_345u32.to_le_bytes());
  bytes.extend_from_slice(&[142, 0x00]);
  bytes.extend_from_slice(&interval_time.to_le_bytes());
  bytes.extend_from_slice(&84u16.to_le_bytes());
  bytes.extend_from_slice(&0u16.to_le_bytes());
  bytes.extend_from_slice(&250u16.to_le_bytes());
  bytes.extend_from_slice(&[0x00; 8]);
  bytes
}


// RESPONSES ------------------------------------------------------------- //
/// Wraps `payload` in the 3 byte prefix and 2 byte trailer.
pub fn envelope(payload: &[u8]) -> Vec<u8> {
  let mut bytes = vec![0x80];
  bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
  bytes.extend_from_slice(payload);
  bytes.extend_from_slice(&[0x00, 0x55]);
  bytes
}

pub fn catalog_response(entries: &[Vec<u8>]) -> Vec<u8> {
  let mut bytes = vec![0x78];
  bytes.extend_from_slice(&((entries.len() * 24) as u16).to_be_bytes());
  bytes.extend(entries.concat());
  bytes.push(0x00);
  bytes
}

pub fn header_response(point_count: u16, lap_count: u16) -> Vec<u8> {
  envelope(&header_bytes_with(point_count, lap_count))
}

/// A lap or point section: header echo followed by `records`.
pub fn section_response(records: &[Vec<u8>]) -> Vec<u8> {
  let mut section = summary_bytes(0, 1846, 39_012, 30_238);
  section.extend(records.concat());
  envelope(&section)
}

pub fn whoami_response(identifier: &str) -> Vec<u8> {
  envelope(identifier.as_bytes())
}


// CHANNELS -------------------------------------------------------------- //
/// Replays one scripted response per written frame and keeps every frame.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
  responses: VecDeque<Vec<u8>>,
  pending:   VecDeque<u8>,
  written:   Vec<Vec<u8>>,
}

impl ScriptedChannel {
  pub fn new(responses: Vec<Vec<u8>>) -> Self {
    Self { responses: responses.into(),
           ..Self::default() }
  }

  pub fn written(&self) -> &Vec<Vec<u8>> {
    &self.written
  }
}

impl Write for ScriptedChannel {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.written.push(buf.to_vec());
    if let Some(response) = self.responses.pop_front() {
      self.pending.extend(response);
    }
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl Read for ScriptedChannel {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    let n = buf.len().min(self.pending.len());
    for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
      *slot = byte;
    }
    Ok(n)
  }
}


/// Accepts every write, fails every read with the given kind.
#[derive(Debug)]
pub struct FailingChannel(pub io::ErrorKind);

impl Write for FailingChannel {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl Read for FailingChannel {
  fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
    Err(io::Error::new(self.0, "scripted failure"))
  }
}
