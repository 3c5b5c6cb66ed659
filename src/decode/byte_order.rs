// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use crate::device::DeviceDescriptor;

use super::normalize;

/// Which of the two thermal-plane channels holds the low (least significant) byte.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Channel 0 is the low byte, channel 1 the high byte.
    LowByteFirst,

    /// Channel 0 is the high byte, channel 1 the low byte.
    HighByteFirst,
}

impl ByteOrder {
    /// Combine the two bytes of a thermal pixel into a raw sample.
    pub fn compose(self, first: u8, second: u8) -> u16 {
        match self {
            Self::LowByteFirst => u16::from_le_bytes([first, second]),
            Self::HighByteFirst => u16::from_be_bytes([first, second]),
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::LowByteFirst
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LowByteFirst => "low byte first",
            Self::HighByteFirst => "high byte first",
        })
    }
}

const UNRESOLVED: u8 = 0;
const LOW_FIRST: u8 = 1;
const HIGH_FIRST: u8 = 2;

/// A write-once cell holding the session's byte order.
#[derive(Debug, Default)]
pub struct ByteOrderCell(AtomicU8);

impl ByteOrderCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ByteOrder> {
        decode_state(self.0.load(Ordering::Acquire))
    }

    /// Store `order` if nothing has been stored yet.
    ///
    /// Returns the order now in effect, and whether this call was the one that set it.
    pub fn resolve(&self, order: ByteOrder) -> (ByteOrder, bool) {
        let state = match order {
            ByteOrder::LowByteFirst => LOW_FIRST,
            ByteOrder::HighByteFirst => HIGH_FIRST,
        };
        match self
            .0
            .compare_exchange(UNRESOLVED, state, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => (order, true),
            Err(existing) => (decode_state(existing).unwrap_or(order), false),
        }
    }
}

fn decode_state(state: u8) -> Option<ByteOrder> {
    match state {
        LOW_FIRST => Some(ByteOrder::LowByteFirst),
        HIGH_FIRST => Some(ByteOrder::HighByteFirst),
        _ => None,
    }
}

/// Probe the center pixel of a thermal plane to guess which byte is significant.
///
/// High byte first is only chosen when it gives a plausible reading and low byte first does
/// not. Returns `None` if the plane has no center pixel to probe.
pub fn detect_byte_order(
    thermal: &ArrayView3<u8>,
    descriptor: &DeviceDescriptor,
) -> Option<ByteOrder> {
    let (rows, cols, channels) = thermal.dim();
    if rows == 0 || cols == 0 || channels < 2 {
        return None;
    }
    let (row, col) = (rows / 2, cols / 2);
    let first = thermal[(row, col, 0)];
    let second = thermal[(row, col, 1)];
    let low_first = normalize(ByteOrder::LowByteFirst.compose(first, second));
    let high_first = normalize(ByteOrder::HighByteFirst.compose(first, second));
    if descriptor.is_plausible(high_first) && !descriptor.is_plausible(low_first) {
        Some(ByteOrder::HighByteFirst)
    } else {
        Some(ByteOrder::LowByteFirst)
    }
}
