// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{frame::Command,
            fubar::Result,
            lap::LAP_SIZE,
            point::POINT_SIZE,
            session::{ResponseEnvelope, Session, PREFIX_SIZE, TRAILER_SIZE},
            track::SUMMARY_SIZE,
            util};
use getset::{CopyGetters, Getters};
use log::{debug, info, warn};
use std::io::{Read, Write};


/// Every section starts with an echo of the 24 byte track summary.
pub const HEADER_SLOT: usize = SUMMARY_SIZE;
/// Assumed by analogy with points: the largest whole number of laps that
/// fits a 2040 byte section, i.e. 2024 byte lap sections. A device sending
/// 2040 byte lap sections shows up as a lap transfer ending after one
/// section with 16 bytes of slack.
pub const LAPS_PER_SECTION: usize = 50;
pub const POINTS_PER_SECTION: usize = 63;


/// The kind of records a multi-section transfer carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
  Lap,
  Point,
}

impl RecordKind {
  pub fn record_size(self) -> usize {
    match self {
      Self::Lap => LAP_SIZE,
      Self::Point => POINT_SIZE,
    }
  }

  pub fn records_per_section(self) -> usize {
    match self {
      Self::Lap => LAPS_PER_SECTION,
      Self::Point => POINTS_PER_SECTION,
    }
  }

  /// Length of a full section; anything shorter ends the transfer.
  pub fn max_section_size(self) -> usize {
    HEADER_SLOT + self.record_size() * self.records_per_section()
  }

  /// Bytes to wait for per section, envelope included.
  pub fn response_size(self) -> usize {
    PREFIX_SIZE + self.max_section_size() + TRAILER_SIZE
  }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
  Collecting,
  Done,
}


/// One section of a lap or point transfer, envelope already stripped.
#[derive(Clone, Debug, PartialEq, CopyGetters, Getters)]
pub struct Section {
  #[getset(get_copy = "pub")]
  kind:    RecordKind,
  #[getset(get = "pub")]
  echo:    Vec<u8>,
  #[getset(get = "pub")]
  payload: Vec<u8>,
}

impl Section {
  pub fn new(kind: RecordKind, section: &[u8]) -> Self {
    let split = HEADER_SLOT.min(section.len());
    Self { kind,
           echo: section[..split].to_vec(),
           payload: section[split..].to_vec() }
  }

  /// Full records, in device order.
  pub fn records(&self) -> impl Iterator<Item = &[u8]> {
    self.payload.chunks_exact(self.kind.record_size())
  }

  /// Bytes at the end too short to form a record.
  pub fn slack(&self) -> usize {
    self.payload.len() % self.kind.record_size()
  }
}


/// Pulls lap or point sections from the watch until a short one arrives.
///
/// The device has no explicit end marker: a section of exactly
/// `max_section_size` bytes means more is pending, anything shorter is the
/// last one.
#[derive(Clone, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct SegmentedTransfer {
  kind:     RecordKind,
  state:    TransferState,
  sections: usize,
}

impl SegmentedTransfer {
  pub fn new(kind: RecordKind) -> Self {
    Self { kind,
           state: TransferState::Collecting,
           sections: 0 }
  }

  /// Requests and returns the next section, or `None` once done.
  pub fn next_section<C: Read + Write>(&mut self,
                                       session: &mut Session<C>)
                                       -> Result<Option<Section>> {
    if self.state == TransferState::Done {
      return Ok(None);
    }

    let response =
      session.request_response(&Command::RequestNextTrackSegment,
                               self.kind.response_size())?;
    let section = ResponseEnvelope::parse(&response)?.payload();
    self.sections += 1;

    if section.len() != self.kind.max_section_size() {
      self.state = TransferState::Done;
    }
    debug!("{:?} section {}: {} bytes, {:?}",
           self.kind,
           self.sections,
           section.len(),
           self.state);

    Ok(Some(Section::new(self.kind, section)))
  }

  /// Drives the transfer to the end, handing every record to `on_record` in
  /// device order. Returns the number of records handed over.
  ///
  /// An error from `on_record` or the session aborts the transfer; records
  /// handed over before stay with the caller.
  pub fn run<C, F>(&mut self,
                   session: &mut Session<C>,
                   mut on_record: F)
                   -> Result<usize>
    where C: Read + Write,
          F: FnMut(&[u8]) -> Result<()>
  {
    let mut count = 0;
    while let Some(section) = self.next_section(session)? {
      if self.sections == 1 {
        debug!("track echo {}", util::preview(section.echo()));
      }
      for record in section.records() {
        on_record(record)?;
        count += 1;
      }
      if section.slack() > 0 {
        warn!("ignoring {} trailing bytes in {:?} section {}",
              section.slack(),
              self.kind,
              self.sections);
      }
    }

    info!("{:?} transfer done: {} records in {} sections",
          self.kind,
          count,
          self.sections);
    Ok(count)
  }
}
