// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{config::Config,
            decode::Decoder,
            ensure,
            fubar,
            fubar::Result,
            frame::Command,
            session::{ResponseEnvelope, Session},
            transfer::{RecordKind, SegmentedTransfer},
            Track,
            TrackSummary};
use getset::Getters;
use log::info;
use serde::Serialize;
use serialport::SerialPort;
use std::io::{Read, Write};


/// Bytes read for responses of unknown length.
pub const DEFAULT_RESPONSE_SIZE: usize = 2070;
/// `getTracks` may answer with more than the 48 header bytes; the whole
/// answer is drained so nothing leaks into the first lap section.
const TRACK_RESPONSE_SIZE: usize = 2075;


/// Identification returned by `whoAmI`, e.g. product `GB580`, model `P`.
#[derive(Clone, Debug, PartialEq, Serialize, Getters)]
#[getset(get = "pub")]
pub struct DeviceModel {
  product: String,
  model:   String,
}

impl DeviceModel {
  /// Splits the identifier into product name and trailing model letter.
  pub fn parse(identifier: &str) -> Result<Self> {
    let identifier = identifier.trim_end_matches(char::from(0)).trim();
    let mut chars = identifier.chars();
    match chars.next_back() {
      Some(model) if !chars.as_str().is_empty() => {
        Ok(Self { product: chars.as_str().to_string(),
                  model:   model.to_string(), })
      }
      _ => fubar!("device identifier '{}' too short", identifier),
    }
  }
}


/// The watch on the other end of a session, together with the track most
/// recently loaded from it.
#[derive(Debug)]
pub struct Watch<C: Read + Write> {
  session: Session<C>,
  decoder: Decoder,
  track:   Option<Track>,
}

impl Watch<Box<dyn SerialPort>> {
  /// Opens the serial port named in `config`.
  pub fn open(config: &Config) -> Result<Self> {
    Ok(Self::new(Session::open(config)?, Decoder::from_config(config)))
  }
}

impl<C: Read + Write> Watch<C> {
  pub fn new(session: Session<C>, decoder: Decoder) -> Self {
    Self { session,
           decoder,
           track: None }
  }

  pub fn session(&self) -> &Session<C> {
    &self.session
  }

  pub fn into_session(self) -> Session<C> {
    self.session
  }

  // INFORMATION --------------------------------------------------------- //
  pub fn model(&mut self) -> Result<DeviceModel> {
    let response = self.session
                       .request_response(&Command::WhoAmI, DEFAULT_RESPONSE_SIZE)?;
    let payload = ResponseEnvelope::parse(&response)?.payload();
    ensure!(payload.is_ascii(), "device identifier is not ASCII");

    let model = DeviceModel::parse(&String::from_utf8_lossy(payload))?;
    info!("connected to {} model {}", model.product(), model.model());
    Ok(model)
  }

  /// Raw `unitInformation` payload.
  pub fn unit_information(&mut self) -> Result<Vec<u8>> {
    let response =
      self.session
          .request_response(&Command::UnitInformation, DEFAULT_RESPONSE_SIZE)?;
    Ok(ResponseEnvelope::parse(&response)?.payload().to_vec())
  }

  /// Summaries of all tracks stored on the watch, in device order.
  pub fn track_list(&mut self) -> Result<Vec<TrackSummary>> {
    let response =
      self.session
          .request_response(&Command::GetTrackList, DEFAULT_RESPONSE_SIZE)?;
    let catalog = self.decoder.decode_track_catalog(&response)?;
    info!("{} tracks on the device", catalog.len());
    Ok(catalog)
  }

  // TRACKS -------------------------------------------------------------- //
  /// Downloads track `id` with all of its laps and points.
  ///
  /// The previously loaded track is discarded first. When the download fails
  /// midway, whatever arrived so far stays available through `track()`.
  pub fn load_track(&mut self, id: u16) -> Result<&Track> {
    self.track = None;

    let command = Command::GetTracks { ids: vec![id] };
    let response = self.session
                       .request_response(&command, TRACK_RESPONSE_SIZE)?;
    let header = self.decoder
                     .decode_track_header(ResponseEnvelope::parse(&response)?
                                            .payload())?;
    info!("track {}: {} laps, {} points, started {}",
          id,
          header.lap_count(),
          header.point_count(),
          header.start());

    let decoder = self.decoder;
    let session = &mut self.session;
    let track = self.track.get_or_insert(Track::new(header));

    let mut laps = SegmentedTransfer::new(RecordKind::Lap);
    laps.run(session, |record| {
          track.push_lap(decoder.decode_lap(record)?);
          Ok(())
        })?;

    // point times are reconstructed from the header start onwards
    let mut running = header.start();
    let mut points = SegmentedTransfer::new(RecordKind::Point);
    points.run(session, |record| {
            let (point, next) = decoder.decode_point(record, running)?;
            running = next;
            track.push_point(point);
            Ok(())
          })?;

    track.check_consistency();
    Ok(&*track)
  }

  /// The most recently loaded track, complete or not.
  pub fn track(&self) -> Option<&Track> {
    self.track.as_ref()
  }

  pub fn take_track(&mut self) -> Option<Track> {
    self.track.take()
  }
}
