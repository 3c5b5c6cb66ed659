// SPDX-License-Identifier: GPL-3.0-or-later
use std::borrow::Cow;

use ndarray::{s, ArrayView3, Ix3};
use tracing::{trace, warn};

use crate::device::DeviceDescriptor;
use crate::error::LayoutError;

use super::{RawFrame, SplitFrame};

/// Split a raw capture buffer into its visual and thermal planes.
///
/// Each frame is handled on its own; nothing is cached between calls.
pub fn split_frame(raw: &RawFrame, descriptor: &DeviceDescriptor) -> Result<SplitFrame, LayoutError> {
    let samples = raw.samples();
    if samples.is_empty() {
        return Err(LayoutError::Empty);
    }
    match samples.ndim() {
        3 => {
            let channels = samples.shape()[2];
            if channels != 2 {
                return Err(LayoutError::ColorConverted { channels });
            }
            let image = samples
                .view()
                .into_dimensionality::<Ix3>()
                .map_err(|_| unsupported(raw))?;
            split_planes(image, descriptor.height).ok_or_else(|| unsupported(raw))
        }
        1 | 2 => {
            // Flattened buffers may carry padding at the end of every row.
            let flat: Cow<[u8]> = match samples.as_slice() {
                Some(slice) => Cow::Borrowed(slice),
                None => Cow::Owned(samples.iter().copied().collect()),
            };
            let image = unflatten(&flat, descriptor).ok_or_else(|| unsupported(raw))?;
            split_planes(image, descriptor.height).ok_or_else(|| unsupported(raw))
        }
        _ => Err(unsupported(raw)),
    }
}

fn unsupported(raw: &RawFrame) -> LayoutError {
    LayoutError::Unsupported {
        shape: raw.shape().to_vec(),
    }
}

/// Reshape a flat buffer to `(2 * height, stride / 2, 2)` and crop off any row padding.
fn unflatten<'a>(flat: &'a [u8], descriptor: &DeviceDescriptor) -> Option<ArrayView3<'a, u8>> {
    let total_rows = descriptor.capture_rows();
    if total_rows == 0 || flat.len() % total_rows != 0 {
        return None;
    }
    let bytes_per_row = flat.len() / total_rows;
    if bytes_per_row % 2 != 0 {
        return None;
    }
    let pixels_per_row = bytes_per_row / 2;
    if pixels_per_row < descriptor.width {
        return None;
    }
    trace!(
        bytes_per_row,
        padding = pixels_per_row - descriptor.width,
        "Reshaping flattened frame"
    );
    let image = ArrayView3::from_shape((total_rows, pixels_per_row, 2), flat).ok()?;
    Some(image.slice_move(s![.., ..descriptor.width, ..]))
}

fn split_planes(image: ArrayView3<u8>, height: usize) -> Option<SplitFrame> {
    let rows = image.shape()[0];
    let (visual, thermal) = if rows >= height * 2 {
        (
            image.slice(s![..height, .., ..]),
            image.slice(s![height..height * 2, .., ..]),
        )
    } else if rows >= 2 {
        // Best effort: two halves, the first one gets the extra row.
        let middle = (rows + 1) / 2;
        (
            image.slice(s![..middle, .., ..]),
            image.slice(s![middle.., .., ..]),
        )
    } else {
        return None;
    };
    Some(SplitFrame {
        visual: visual.to_owned(),
        thermal: thermal.to_owned(),
    })
}

/// Splits frames for one capture session, logging the first failure only.
///
/// A long session can see thousands of frames; a layout problem is nearly always a property of
/// the backend, so repeating the warning for every frame adds nothing.
#[derive(Debug)]
pub struct FrameSplitter {
    descriptor: DeviceDescriptor,
    warned: bool,
}

impl FrameSplitter {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            warned: false,
        }
    }

    pub fn split(&mut self, raw: &RawFrame) -> Result<SplitFrame, LayoutError> {
        let result = split_frame(raw, &self.descriptor);
        if let Err(err) = &result {
            if !self.warned {
                self.warned = true;
                match err {
                    LayoutError::ColorConverted { .. } => warn!(
                        shape = ?raw.shape(),
                        "{}. Try a different capture backend, or disable RGB conversion", err
                    ),
                    _ => warn!(shape = ?raw.shape(), "Failed to split frame data: {}", err),
                }
            }
        }
        result
    }

    /// Whether a layout failure has already been reported for this session.
    pub fn has_warned(&self) -> bool {
        self.warned
    }
}
