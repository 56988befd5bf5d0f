// Copyright 2020 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <jonas@bmc-labs.com>
//   Jannik Schütz <jannik@bmc-labs.com>

use std::{error, fmt, io, result};


/// The crate's result type `Result` will work with any error type
/// implementing the `std::error::Error` trait.
pub type Result<T> = result::Result<T, Fubar>;


/// Error used throughout the crate to bubble failures back to the caller.
///
/// The first five variants are the protocol's own failure taxonomy, the rest
/// wrap errors from the environment (serial port, file system, config files).
///
/// It is recommended to return `MalformedRecord` through the `fubar!` macro,
/// which accepts the same parameters as the `format!` macro and returns an
/// `Err(Fubar::MalformedRecord)`. See the macro documentation for an example.
///
/// FUBAR: Fucked Up Beyond All {Recognition, Repair, Reason}
#[derive(Clone, Debug, PartialEq)]
pub enum Fubar {
  /// The command name is not in the command table.
  UnknownCommand(String),
  /// A template hole had no value, or a template could not be parsed.
  MalformedParameter(String),
  /// Not a single byte arrived within the turnaround timeout.
  Timeout,
  /// Fewer bytes than required to decode a record or envelope.
  ShortRead { expected: usize, got: usize },
  /// A decoded field is outside of its documented range.
  MalformedRecord(String),
  Io(String),
  Serial(String),
  Config(String),
}

impl fmt::Display for Fubar {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::UnknownCommand(name) => write!(f, "unknown command '{}'", name),
      Self::MalformedParameter(msg) => write!(f, "malformed parameter: {}", msg),
      Self::Timeout => write!(f, "device did not respond within timeout"),
      Self::ShortRead { expected, got } => {
        write!(f, "short read: expected {} bytes, got {}", expected, got)
      }
      Self::MalformedRecord(msg) => write!(f, "malformed record: {}", msg),
      Self::Io(msg) => write!(f, "i/o error: {}", msg),
      Self::Serial(msg) => write!(f, "serial port error: {}", msg),
      Self::Config(msg) => write!(f, "config error: {}", msg),
    }
  }
}

impl error::Error for Fubar {}


/// This macro - internal use only - generates the implementation of the
/// `From` trait for `Fubar` for a given list of types and target variants.
macro_rules! implement_from {
  ($($ErrType:ty => $Variant:ident),*) => {$(
    impl From<$ErrType> for Fubar {
      fn from(error: $ErrType) -> Self {
        Self::$Variant(error.to_string())
      }
    }
  )*}
}

// here the macro is called with a list of types used in our codebase
implement_from!(io::Error => Io,
                serialport::Error => Serial,
                serde_json::Error => Config);


/// The `fubar!` macro provides an easy way to return formatted errors
/// from functions returning a `Result`. It takes something which can be
/// formatted using the `format!` macro and returns an
/// `Err(Fubar::MalformedRecord)`. You can use it in your code as follows:
///
/// ```ignore
/// match month {
///   1..=12 => Ok(month),  // the world is a happy place
///   _ => fubar!("month {} out of range", month),
/// }
/// ```
#[macro_export]
macro_rules! fubar {
  ($($arg:tt)*) => {
      Err($crate::fubar::Fubar::MalformedRecord(format!($($arg)*)))
  }
}


/// The `ensure!` macro provides and easy way to make sure a condition is true,
/// and if not, return an `Err(Fubar::MalformedRecord)` (exactly as `fubar!`
/// does - `ensure!` is actually implemented on top of `fubar!`). Use it as
/// follows:
///
/// ```ignore
/// fn decode(&self) -> Result<()> {
///   ensure!(self.lap_count() < 100, "sorry, {} laps", self.lap_count());
/// }
/// ```
#[macro_export]
macro_rules! ensure {
  ($cond:expr, $($arg:tt)*) => {
    if !($cond) { return fubar!($($arg)*) }
  }
}
