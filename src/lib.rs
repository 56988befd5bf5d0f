// Copyright 2020 bmc::labs Gmbh. All rights reserved.
//
// Author: Florian Eich <florian@bmc-labs.com>

//! Talks to Globalsat GB-580 GPS sport watches over their serial link and
//! decodes the tracks stored on them.

pub mod fubar;

pub mod config;
pub mod decode;
pub mod frame;
mod lap;
mod point;
pub mod session;
mod track;
pub mod transfer;
pub mod util;
mod watch;

#[cfg(test)]
mod testdata;

pub use config::Config;
pub use decode::Decoder;
pub use frame::{Command, Frame};
pub use fubar::{Fubar, Result};
pub use lap::TrackLap;
pub use point::TrackPoint;
pub use session::Session;
pub use track::{Track, TrackHeader, TrackSummary, CATALOG_HEADING};
pub use watch::{DeviceModel, Watch};
