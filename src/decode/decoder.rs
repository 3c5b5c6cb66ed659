// SPDX-License-Identifier: GPL-3.0-or-later
use ndarray::{ArrayView3, Axis};
use serde::Serialize;
use tracing::{debug, info};

use crate::device::DeviceDescriptor;

use super::{detect_byte_order, normalize, ByteOrder, ByteOrderCell};

/// A raw sensor sample and the temperature it decodes to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TemperatureSample {
    pub raw: u16,
    pub celsius: f64,
}

impl TemperatureSample {
    pub fn new(raw: u16) -> Self {
        Self {
            raw,
            celsius: normalize(raw),
        }
    }
}

/// The coldest or hottest pixel in a frame, with its position in the thermal plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Extremum {
    #[serde(flatten)]
    pub sample: TemperatureSample,
    pub row: usize,
    pub col: usize,
}

impl Extremum {
    pub fn celsius(&self) -> f64 {
        self.sample.celsius
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Everything decoded from a single thermal plane.
///
/// The default value (all zeroes) is what a degenerate plane decodes to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FrameTemperatureStats {
    pub center: TemperatureSample,

    /// Composed from the (truncated) mean of each channel, not the mean of the decoded pixels.
    pub average: TemperatureSample,

    pub minimum: Extremum,
    pub maximum: Extremum,
}

#[derive(Debug)]
pub struct TemperatureDecoder {
    descriptor: DeviceDescriptor,
    byte_order: ByteOrderCell,
}

impl TemperatureDecoder {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            byte_order: ByteOrderCell::new(),
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// The byte order in use, if it has been resolved yet.
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order.get()
    }

    /// Resolve the byte order from `thermal` if it isn't already known.
    fn resolve_byte_order(&self, thermal: &ArrayView3<u8>) -> Option<ByteOrder> {
        if let Some(order) = self.byte_order.get() {
            return Some(order);
        }
        let detected = detect_byte_order(thermal, &self.descriptor)?;
        let (order, newly_set) = self.byte_order.resolve(detected);
        if newly_set {
            if order == ByteOrder::HighByteFirst {
                info!(
                    device = %self.descriptor.name,
                    "Thermal data is high byte first on this capture path, swapping bytes"
                );
            } else {
                debug!(byte_order = %order, "Resolved thermal byte order");
            }
        }
        Some(order)
    }

    /// Compute the center, average, minimum and maximum temperatures of a thermal plane.
    pub fn decode_stats(&self, thermal: ArrayView3<u8>) -> FrameTemperatureStats {
        let (rows, cols, channels) = thermal.dim();
        if rows == 0 || cols == 0 || channels < 2 {
            return FrameTemperatureStats::default();
        }
        let order = match self.resolve_byte_order(&thermal) {
            Some(order) => order,
            None => return FrameTemperatureStats::default(),
        };
        let sample_at = |row: usize, col: usize| {
            TemperatureSample::new(order.compose(thermal[(row, col, 0)], thermal[(row, col, 1)]))
        };

        let center = sample_at(rows / 2, cols / 2);

        let pixel_count = (rows * cols) as u64;
        let channel_mean = |channel: usize| {
            let sum: u64 = thermal
                .index_axis(Axis(2), channel)
                .iter()
                .map(|b| u64::from(*b))
                .sum();
            // A mean of bytes always fits in a byte.
            (sum / pixel_count) as u8
        };
        let average = TemperatureSample::new(order.compose(channel_mean(0), channel_mean(1)));

        // Extremes are located using channel 1 alone, first occurrence wins.
        let significant = thermal.index_axis(Axis(2), 1);
        let mut coldest = ((0, 0), significant[(0, 0)]);
        let mut hottest = coldest;
        for (position, value) in significant.indexed_iter() {
            if *value < coldest.1 {
                coldest = (position, *value);
            }
            if *value > hottest.1 {
                hottest = (position, *value);
            }
        }
        let extremum = |(row, col): (usize, usize)| Extremum {
            sample: sample_at(row, col),
            row,
            col,
        };

        FrameTemperatureStats {
            center,
            average,
            minimum: extremum(coldest.0),
            maximum: extremum(hottest.0),
        }
    }
}
