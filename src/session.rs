// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{config::Config,
            frame::{Command, Frame},
            fubar::{Fubar, Result},
            util};
use log::{debug, info};
use serialport::SerialPort;
use std::{io::{ErrorKind, Read, Write},
          time::{Duration, Instant}};


/// Status/length bytes in front of every response payload.
pub const PREFIX_SIZE: usize = 3;
/// Status bytes after every response payload.
pub const TRAILER_SIZE: usize = 2;


/// Owns the byte channel to the watch and performs one request/response turn
/// at a time.
///
/// The protocol is half-duplex: a new command must only be sent once the
/// previous response has been read completely (or timed out). Taking
/// `&mut self` everywhere makes overlapping requests impossible.
#[derive(Debug)]
pub struct Session<C: Read + Write> {
  channel: C,
  timeout: Duration,
}

impl Session<Box<dyn SerialPort>> {
  /// Opens the serial port named in `config`.
  pub fn open(config: &Config) -> Result<Self> {
    info!("opening serial port {} at {} baud",
          config.port(),
          config.baud_rate());
    let port = serialport::new(config.port(), config.baud_rate())
      .timeout(config.timeout())
      .open()?;
    Ok(Self::new(port, config.timeout()))
  }
}

impl<C: Read + Write> Session<C> {
  pub fn new(channel: C, timeout: Duration) -> Self {
    Self { channel, timeout }
  }

  pub fn channel(&self) -> &C {
    &self.channel
  }

  pub fn into_channel(self) -> C {
    self.channel
  }

  /// Writes a frame. No response is read here.
  pub fn send(&mut self, frame: &Frame) -> Result<()> {
    debug!("writing {}", frame);
    self.channel.write_all(frame.as_bytes())?;
    self.channel.flush()?;
    Ok(())
  }

  /// Blocks until `expected` bytes arrived or the timeout elapsed.
  ///
  /// Fails with `Timeout` when nothing arrived at all. A short, non-empty
  /// buffer is returned as is; it is up to the caller to decide whether that
  /// is an error.
  pub fn receive(&mut self, expected: usize) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; expected];
    let mut read = 0;
    let deadline = Instant::now() + self.timeout;

    while read < expected {
      match self.channel.read(&mut buffer[read..]) {
        Ok(0) => break,
        Ok(n) => read += n,
        Err(err) if err.kind() == ErrorKind::Interrupted => continue,
        Err(err)
          if err.kind() == ErrorKind::TimedOut
             || err.kind() == ErrorKind::WouldBlock =>
        {
          break
        }
        Err(err) => return Err(err.into()),
      }
      if Instant::now() >= deadline {
        break;
      }
    }

    buffer.truncate(read);
    if buffer.is_empty() {
      return Err(Fubar::Timeout);
    }
    if read < expected {
      debug!("short response, {} of {} bytes", read, expected);
    }
    debug!("read {}", util::preview(&buffer));
    Ok(buffer)
  }

  /// Sends `command` and reads up to `expected` bytes of response. Incoming
  /// bytes are not checksummed.
  pub fn request_response(&mut self,
                          command: &Command,
                          expected: usize)
                          -> Result<Vec<u8>> {
    let frame = command.frame()?;
    self.send(&frame)?;
    self.receive(expected)
  }
}


/// Splits a raw response into prefix, payload and trailer.
///
/// The last two prefix bytes carry the payload length, big endian. Bytes
/// after the trailer are ignored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponseEnvelope<'a> {
  raw: &'a [u8],
  len: usize,
}

impl<'a> ResponseEnvelope<'a> {
  pub fn parse(raw: &'a [u8]) -> Result<Self> {
    if raw.len() < PREFIX_SIZE + TRAILER_SIZE {
      return Err(Fubar::ShortRead { expected: PREFIX_SIZE + TRAILER_SIZE,
                                    got:      raw.len(), });
    }

    let len = usize::from(u16::from_be_bytes([raw[1], raw[2]]));
    let expected = PREFIX_SIZE + len + TRAILER_SIZE;
    if raw.len() < expected {
      return Err(Fubar::ShortRead { expected,
                                    got: raw.len(), });
    }
    if raw.len() > expected {
      debug!("ignoring {} bytes after the response trailer",
             raw.len() - expected);
    }
    Ok(Self { raw, len })
  }

  pub fn prefix(&self) -> &'a [u8] {
    &self.raw[..PREFIX_SIZE]
  }

  pub fn payload(&self) -> &'a [u8] {
    &self.raw[PREFIX_SIZE..PREFIX_SIZE + self.len]
  }

  pub fn trailer(&self) -> &'a [u8] {
    let start = PREFIX_SIZE + self.len;
    &self.raw[start..start + TRAILER_SIZE]
  }
}


#[cfg(test)]
mod tests {
  use super::{super::testdata::{self, ScriptedChannel},
              *};
  use pretty_assertions::assert_eq;
  use std::io;


  fn session(responses: Vec<Vec<u8>>) -> Session<ScriptedChannel> {
    Session::new(ScriptedChannel::new(responses), Duration::from_millis(50))
  }

  #[test]
  fn request_response_test() {
    let mut session = session(vec![vec![0x78, 0x00, 0x01, 0xAB, 0xCD]]);
    let response = session.request_response(&Command::GetTrackList, 5)
                          .unwrap();

    assert_eq!(vec![0x78, 0x00, 0x01, 0xAB, 0xCD], response);
    assert_eq!(&vec![vec![0x02, 0x00, 0x01, 0x78, 0x79]],
               session.channel().written());
  }

  #[test]
  fn receive_short_test() {
    let mut session = session(vec![vec![0x01, 0x02, 0x03]]);
    session.send(&Command::WhoAmI.frame().unwrap()).unwrap();
    assert_eq!(vec![0x01, 0x02, 0x03], session.receive(2070).unwrap());
  }

  #[test]
  fn receive_stops_at_expected_test() {
    let mut session = session(vec![vec![0xAA; 10]]);
    session.send(&Command::WhoAmI.frame().unwrap()).unwrap();
    assert_eq!(vec![0xAA; 4], session.receive(4).unwrap());
    // the rest is still pending on the channel
    assert_eq!(vec![0xAA; 6], session.receive(6).unwrap());
  }

  #[test]
  fn receive_timeout_test() {
    let mut session = session(vec![]);
    assert_eq!(Err(Fubar::Timeout),
               session.request_response(&Command::WhoAmI, 2070));

    // a port reporting a timeout is treated the same way
    let mut session =
      Session::new(testdata::FailingChannel(io::ErrorKind::TimedOut),
                   Duration::from_millis(50));
    assert_eq!(Err(Fubar::Timeout), session.receive(10));
  }

  #[test]
  fn receive_io_error_test() {
    let mut session =
      Session::new(testdata::FailingChannel(io::ErrorKind::BrokenPipe),
                   Duration::from_millis(50));
    assert!(matches!(session.receive(10), Err(Fubar::Io(_))));
  }

  #[test]
  fn envelope_test() {
    let raw = [0x80, 0x00, 0x03, 0x11, 0x22, 0x33, 0xEE, 0xFF];
    let envelope = ResponseEnvelope::parse(&raw).unwrap();
    assert_eq!(&[0x80, 0x00, 0x03], envelope.prefix());
    assert_eq!(&[0x11, 0x22, 0x33], envelope.payload());
    assert_eq!(&[0xEE, 0xFF], envelope.trailer());

    let empty = [0x80, 0x00, 0x00, 0xEE, 0xFF];
    assert!(ResponseEnvelope::parse(&empty).unwrap().payload().is_empty());

    assert_eq!(Err(Fubar::ShortRead { expected: 5, got: 4 }),
               ResponseEnvelope::parse(&raw[..4]));
  }

  #[test]
  fn envelope_length_test() {
    let raw = [0x80, 0x00, 0x03, 0x11, 0x22, 0x33, 0xEE, 0xFF];

    // cut off inside the payload
    assert_eq!(Err(Fubar::ShortRead { expected: 8, got: 6 }),
               ResponseEnvelope::parse(&raw[..6]));
    assert_eq!(Err(Fubar::ShortRead { expected: 8, got: 7 }),
               ResponseEnvelope::parse(&raw[..7]));

    // trailing bytes are not part of the payload
    let mut long = raw.to_vec();
    long.extend_from_slice(&[0xAA, 0xBB]);
    let envelope = ResponseEnvelope::parse(&long).unwrap();
    assert_eq!(&[0x11, 0x22, 0x33], envelope.payload());
    assert_eq!(&[0xEE, 0xFF], envelope.trailer());
  }
}
