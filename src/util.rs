// Copyright 2020 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <jonas@bmc-labs.com>

use super::fubar::{Fubar, Result};


/// Number of bytes shown when a frame or response is dumped to the log.
const LOG_PREVIEW_BYTES: usize = 15;


/// Converts hexadecimal text (two characters per byte, no separators) to raw
/// bytes, e.g. `"0200017879"` to `[0x02, 0x00, 0x01, 0x78, 0x79]`.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
  if hex.len() % 2 != 0 {
    return Err(Fubar::MalformedParameter(format!("odd length hex text '{}'",
                                                 hex)));
  }

  hex.as_bytes()
     .chunks(2)
     .map(|pair| {
       std::str::from_utf8(pair).ok()
                                .and_then(|s| u8::from_str_radix(s, 16).ok())
                                .ok_or_else(|| {
                                  Fubar::MalformedParameter(format!(
                                    "invalid hex text '{}'",
                                    hex
                                  ))
                                })
     })
     .collect()
}

/// Converts raw bytes to upper case hexadecimal text.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
  bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Hex dump for log lines; long buffers are truncated.
pub fn preview(bytes: &[u8]) -> String {
  if bytes.len() <= LOG_PREVIEW_BYTES {
    bytes_to_hex(bytes)
  } else {
    format!("{}... ({} bytes)",
            bytes_to_hex(&bytes[..LOG_PREVIEW_BYTES]),
            bytes.len())
  }
}

/// Formats a duration given in tenths of a second as `HH:MM:SS.d`.
pub fn format_decisec(decisec: u32) -> String {
  let hours = decisec / 36_000;
  let minutes = (decisec % 36_000) / 600;
  let seconds = (decisec % 600) / 10;
  let tenths = decisec % 10;
  format!("{:02}:{:02}:{:02}.{}", hours, minutes, seconds, tenths)
}
