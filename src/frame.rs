// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{fubar::{Fubar, Result},
            util};
use getset::Getters;
use lazy_static::lazy_static;
use log::error;
use std::{collections::HashMap, fmt};


/// Every outgoing frame starts with this byte. It is not covered by the
/// checksum.
pub const START_BYTE: u8 = 0x02;

/// `getTracks` carries its length in the high byte of the payload field and
/// the command byte `0x80` in the low byte, hence the odd looking constants.
const TRACKS_PAYLOAD_BASE: usize = 896;
const TRACKS_PAYLOAD_PER_ID: usize = 512;

/// Command table, as hexadecimal text with `{hole}` placeholders.
const COMMANDS: [(&str, &str); 7] = [
  ("getTracklist", "0200017879"),
  ("getTracks", "0200{payload}{count}{ids}{checksum}"),
  ("requestNextTrackSegment", "0200018180"),
  ("requestErrornousTrackSegment", "0200018283"),
  ("formatTracks", "0200037900641E"),
  ("unitInformation", "0200018584"),
  ("whoAmI", "020001BFBE"),
];

lazy_static! {
  static ref TEMPLATES: HashMap<&'static str, CommandTemplate> =
    COMMANDS.iter()
            .filter_map(|&(name, pattern)| {
              CommandTemplate::parse(name, pattern)
                .map_err(|err| error!("dropping command '{}': {}", name, err))
                .ok()
            })
            .map(|template| (template.name, template))
            .collect();
}


// TEMPLATES ------------------------------------------------------------- //
/// Named holes a template may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hole {
  Payload,
  Count,
  Ids,
  Checksum,
}

impl Hole {
  fn from_name(name: &str) -> Result<Self> {
    match name {
      "payload" => Ok(Self::Payload),
      "count" => Ok(Self::Count),
      "ids" => Ok(Self::Ids),
      "checksum" => Ok(Self::Checksum),
      _ => Err(malformed(format!("unknown hole '{}'", name))),
    }
  }
}

impl fmt::Display for Hole {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      Self::Payload => "payload",
      Self::Count => "count",
      Self::Ids => "ids",
      Self::Checksum => "checksum",
    };
    write!(f, "{}", name)
  }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
  Literal(Vec<u8>),
  Hole(Hole),
}

/// A named command pattern, parsed once from its hexadecimal text.
#[derive(Clone, Debug, PartialEq, Getters)]
pub struct CommandTemplate {
  #[getset(get = "pub")]
  name:    &'static str,
  #[getset(get = "pub")]
  pattern: &'static str,
  tokens:  Vec<Token>,
}

impl CommandTemplate {
  /// Splits `pattern` into literal bytes and `{hole}` placeholders.
  pub fn parse(name: &'static str, pattern: &'static str) -> Result<Self> {
    let mut tokens = Vec::new();
    let mut rest = pattern;

    while !rest.is_empty() {
      match rest.find('{') {
        Some(0) => {
          let end = rest.find('}')
                        .ok_or_else(|| malformed(format!("unterminated hole \
                                                          in '{}'",
                                                         pattern)))?;
          tokens.push(Token::Hole(Hole::from_name(&rest[1..end])?));
          rest = &rest[end + 1..];
        }
        Some(start) => {
          tokens.push(Token::Literal(util::hex_to_bytes(&rest[..start])?));
          rest = &rest[start..];
        }
        None => {
          tokens.push(Token::Literal(util::hex_to_bytes(rest)?));
          rest = "";
        }
      }
    }

    Ok(Self { name,
              pattern,
              tokens })
  }

  /// Looks up a template in the process wide command table.
  pub fn lookup(name: &str) -> Result<&'static CommandTemplate> {
    TEMPLATES.get(name)
             .ok_or_else(|| Fubar::UnknownCommand(name.to_string()))
  }

  pub fn holes(&self) -> Vec<Hole> {
    self.tokens
        .iter()
        .filter_map(|token| match token {
          Token::Hole(hole) => Some(*hole),
          Token::Literal(_) => None,
        })
        .collect()
  }

  /// Substitutes `params` into the holes and appends the checksum where the
  /// template asks for it.
  pub fn fill(&self, params: &Params) -> Result<Frame> {
    if params.values.contains_key(&Hole::Checksum) {
      return Err(malformed(format!("checksum of '{}' is computed, not \
                                    supplied",
                                   self.name)));
    }

    let mut bytes = Vec::new();
    for token in &self.tokens {
      match token {
        Token::Literal(literal) => bytes.extend_from_slice(literal),
        Token::Hole(Hole::Checksum) => {
          let sum = checksum(bytes.get(1..).unwrap_or_default());
          bytes.push(sum);
        }
        Token::Hole(hole) => {
          let value = params.values.get(hole).ok_or_else(|| {
                        malformed(format!("command '{}' requires a value for \
                                           '{}'",
                                          self.name, hole))
                      })?;
          bytes.extend_from_slice(value);
        }
      }
    }

    Ok(Frame { name: self.name,
               bytes })
  }
}


// PARAMETERS ------------------------------------------------------------ //
/// Values for template holes, already encoded to their wire bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
  values: HashMap<Hole, Vec<u8>>,
}

impl Params {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, hole: Hole, value: Vec<u8>) -> Self {
    self.values.insert(hole, value);
    self
  }
}


// FRAMES ---------------------------------------------------------------- //
/// A complete outgoing command: header, payload and trailing checksum.
#[derive(Clone, Debug, PartialEq, Getters)]
pub struct Frame {
  #[getset(get = "pub")]
  name:  &'static str,
  bytes: Vec<u8>,
}

impl Frame {
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// `true` if the last byte is the checksum over everything between the
  /// start byte and itself.
  pub fn verify(bytes: &[u8]) -> bool {
    match bytes.split_last() {
      Some((&sum, rest)) if rest.first() == Some(&START_BYTE) => {
        checksum(&rest[1..]) == sum
      }
      _ => false,
    }
  }
}

impl fmt::Display for Frame {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{} {}", self.name, util::bytes_to_hex(&self.bytes))
  }
}

/// Builds the frame for command `name` from the command table.
pub fn build(name: &str, params: &Params) -> Result<Frame> {
  CommandTemplate::lookup(name)?.fill(params)
}

fn malformed(msg: String) -> Fubar {
  Fubar::MalformedParameter(msg)
}

/// XOR of all bytes.
pub fn checksum(bytes: &[u8]) -> u8 {
  bytes.iter().fold(0, |acc, b| acc ^ b)
}


// ENCODERS -------------------------------------------------------------- //
/// Little endian wire encoding, the inverse of `decode::read_u16`.
pub fn encode_u16(value: u16) -> [u8; 2] {
  value.to_le_bytes()
}

/// Little endian wire encoding, the inverse of `decode::read_u32`.
pub fn encode_u32(value: u32) -> [u8; 4] {
  value.to_le_bytes()
}

/// Track ids as consecutive 2-byte big endian fields.
pub fn encode_track_id_list(ids: &[u16]) -> Vec<u8> {
  ids.iter().flat_map(|id| id.to_be_bytes().to_vec()).collect()
}

/// All holes of `getTracks` for the given track ids.
pub fn track_request_params(ids: &[u16]) -> Result<Params> {
  if ids.is_empty() {
    return Err(malformed("getTracks requires at least one track id".to_string()));
  }

  let payload = TRACKS_PAYLOAD_BASE + TRACKS_PAYLOAD_PER_ID * ids.len();
  if payload > u16::MAX as usize {
    return Err(malformed(format!("{} track ids do not fit into one request",
                                 ids.len())));
  }

  Ok(Params::new().with(Hole::Payload, (payload as u16).to_be_bytes().to_vec())
                  .with(Hole::Count, (ids.len() as u16).to_be_bytes().to_vec())
                  .with(Hole::Ids, encode_track_id_list(ids)))
}


// TYPED COMMANDS -------------------------------------------------------- //
/// Every request the watch understands, with strongly typed arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
  GetTrackList,
  GetTracks { ids: Vec<u16> },
  RequestNextTrackSegment,
  RequestErroneousTrackSegment,
  FormatTracks,
  UnitInformation,
  WhoAmI,
}

impl Command {
  /// Name of the command in the command table.
  pub fn name(&self) -> &'static str {
    match self {
      Self::GetTrackList => "getTracklist",
      Self::GetTracks { .. } => "getTracks",
      Self::RequestNextTrackSegment => "requestNextTrackSegment",
      Self::RequestErroneousTrackSegment => "requestErrornousTrackSegment",
      Self::FormatTracks => "formatTracks",
      Self::UnitInformation => "unitInformation",
      Self::WhoAmI => "whoAmI",
    }
  }

  pub fn params(&self) -> Result<Params> {
    match self {
      Self::GetTracks { ids } => track_request_params(ids),
      _ => Ok(Params::new()),
    }
  }

  pub fn frame(&self) -> Result<Frame> {
    build(self.name(), &self.params()?)
  }
}


#[cfg(test)]
mod tests {
  use super::{super::decode, *};
  use pretty_assertions::assert_eq;


  fn all_commands() -> Vec<Command> {
    vec![Command::GetTrackList,
         Command::GetTracks { ids: vec![0] },
         Command::GetTracks { ids: vec![3, 7, 512] },
         Command::RequestNextTrackSegment,
         Command::RequestErroneousTrackSegment,
         Command::FormatTracks,
         Command::UnitInformation,
         Command::WhoAmI]
  }

  #[test]
  fn command_table_test() {
    for &(name, pattern) in COMMANDS.iter() {
      let template = CommandTemplate::lookup(name).unwrap();
      assert_eq!(&name, template.name());
      assert_eq!(&pattern, template.pattern());
    }

    assert_eq!(vec![Hole::Payload, Hole::Count, Hole::Ids, Hole::Checksum],
               CommandTemplate::lookup("getTracks").unwrap().holes());
    assert!(CommandTemplate::lookup("whoAmI").unwrap().holes().is_empty());
  }

  #[test]
  fn fixed_frames_test() {
    let frame = |command: Command| command.frame().unwrap().as_bytes().to_vec();

    assert_eq!(vec![0x02, 0x00, 0x01, 0x78, 0x79],
               frame(Command::GetTrackList));
    assert_eq!(vec![0x02, 0x00, 0x01, 0x81, 0x80],
               frame(Command::RequestNextTrackSegment));
    assert_eq!(vec![0x02, 0x00, 0x01, 0x82, 0x83],
               frame(Command::RequestErroneousTrackSegment));
    assert_eq!(vec![0x02, 0x00, 0x03, 0x79, 0x00, 0x64, 0x1E],
               frame(Command::FormatTracks));
    assert_eq!(vec![0x02, 0x00, 0x01, 0x85, 0x84],
               frame(Command::UnitInformation));
    assert_eq!(vec![0x02, 0x00, 0x01, 0xBF, 0xBE], frame(Command::WhoAmI));
  }

  #[test]
  fn get_tracks_frame_test() {
    let frame = Command::GetTracks { ids: vec![0] }.frame().unwrap();
    assert_eq!(&"getTracks", frame.name());
    assert_eq!(vec![0x02, 0x00, 0x05, 0x80, 0x00, 0x01, 0x00, 0x00, 0x84],
               frame.as_bytes());

    let frame = Command::GetTracks { ids: vec![3, 7] }.frame().unwrap();
    assert_eq!(vec![0x02, 0x00, 0x07, 0x80, 0x00, 0x02, 0x00, 0x03, 0x00, 0x07,
                    0x81],
               frame.as_bytes());
    assert_eq!("getTracks 0200078000020003000781", frame.to_string());
  }

  #[test]
  fn checksum_covers_frame_body_test() {
    for command in all_commands() {
      let frame = command.frame().unwrap();
      let bytes = frame.as_bytes();
      let (last, body) = (bytes[bytes.len() - 1], &bytes[1..bytes.len() - 1]);
      assert_eq!(START_BYTE, bytes[0]);
      assert_eq!(checksum(body), last);
      assert!(Frame::verify(bytes));
    }
  }

  #[test]
  fn verify_test() {
    assert!(Frame::verify(&[0x02, 0x00, 0x01, 0x78, 0x79]));
    assert!(!Frame::verify(&[0x02, 0x00, 0x01, 0x78, 0x7A]));
    assert!(!Frame::verify(&[0x03, 0x00, 0x01, 0x78, 0x79]));
    assert!(!Frame::verify(&[]));
  }

  #[test]
  fn checksum_test() {
    assert_eq!(0x00, checksum(&[]));
    assert_eq!(0x79, checksum(&[0x00, 0x01, 0x78]));
    assert_eq!(0xFF, checksum(&[0xF0, 0x0F]));
    assert_eq!(0x00, checksum(&[0xAB, 0xAB]));
  }

  #[test]
  fn build_errors_test() {
    assert_eq!(Err(Fubar::UnknownCommand("setWaypoints".to_string())),
               build("setWaypoints", &Params::new()));

    let missing_ids = Params::new().with(Hole::Payload, vec![0x05, 0x80])
                                   .with(Hole::Count, vec![0x00, 0x01]);
    assert!(matches!(build("getTracks", &missing_ids),
                     Err(Fubar::MalformedParameter(_))));
    assert!(matches!(build("getTracks", &Params::new()),
                     Err(Fubar::MalformedParameter(_))));

    let with_checksum = Params::new().with(Hole::Checksum, vec![0x00]);
    assert!(matches!(build("whoAmI", &with_checksum),
                     Err(Fubar::MalformedParameter(_))));

    assert!(matches!(Command::GetTracks { ids: vec![] }.frame(),
                     Err(Fubar::MalformedParameter(_))));
    assert!(matches!(Command::GetTracks { ids: vec![1; 127] }.frame(),
                     Err(Fubar::MalformedParameter(_))));
    assert!(Command::GetTracks { ids: vec![1; 126] }.frame().is_ok());
  }

  #[test]
  fn template_parse_errors_test() {
    assert!(matches!(CommandTemplate::parse("bad", "02{payload"),
                     Err(Fubar::MalformedParameter(_))));
    assert!(matches!(CommandTemplate::parse("bad", "02{length}"),
                     Err(Fubar::MalformedParameter(_))));
    assert!(matches!(CommandTemplate::parse("bad", "020"),
                     Err(Fubar::MalformedParameter(_))));
  }

  #[test]
  fn track_id_list_test() {
    assert_eq!(vec![0x00, 0x00, 0x01, 0x02, 0xFF, 0xFF],
               encode_track_id_list(&[0, 0x0102, 0xFFFF]));
    assert!(encode_track_id_list(&[]).is_empty());
  }

  #[test]
  fn encode_read_inverse_test() {
    for &x in &[0u32, 1, 0xFF, 0x1234_5678, 39_012, u32::MAX] {
      assert_eq!(x, decode::read_u32(&encode_u32(x), 0).unwrap());
    }
    for &x in &[0u16, 1, 1846, 0xBEEF, u16::MAX] {
      assert_eq!(x, decode::read_u16(&encode_u16(x), 0).unwrap());
    }
    assert_eq!([0x36, 0x07], encode_u16(1846));
    assert_eq!([0x64, 0x98, 0x00, 0x00], encode_u32(39_012));
  }
}
