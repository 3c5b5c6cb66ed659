// SPDX-License-Identifier: GPL-3.0-or-later
//! Turning the thermal plane into temperatures.
mod byte_order;
mod decoder;

use crate::temperature::{round_decimals, DISPLAY_DIGITS, KELVIN_OFFSET};

pub use byte_order::{detect_byte_order, ByteOrder, ByteOrderCell};
pub use decoder::{Extremum, FrameTemperatureStats, TemperatureDecoder, TemperatureSample};

/// Each raw count is 1/64 of a Kelvin.
pub const RAW_DIVISOR: f64 = 64.0;

/// Convert a raw sensor sample to degrees Celsius, rounded to two decimal places.
pub fn normalize(raw: u16) -> f64 {
    round_decimals(f64::from(raw) / RAW_DIVISOR - KELVIN_OFFSET, DISPLAY_DIGITS)
}
