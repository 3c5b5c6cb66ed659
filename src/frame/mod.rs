// SPDX-License-Identifier: GPL-3.0-or-later
//! Raw capture buffers and the visual/thermal planes they contain.
mod layout;

use ndarray::{Array1, Array3, ArrayD, ArrayView3, Axis, IxDyn, ShapeError};
use serde::{Deserialize, Serialize};

pub use layout::{split_frame, FrameSplitter};

/// An unprocessed buffer of 8-bit samples, as returned by a capture backend.
///
/// The shape depends on the backend: some return a `(rows, cols, channels)` image, others a
/// flattened buffer (possibly with padding at the end of every row).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawFrame(ArrayD<u8>);

impl RawFrame {
    pub fn new(samples: ArrayD<u8>) -> Self {
        Self(samples)
    }

    /// Wrap a flat byte buffer as a single-row, two-dimensional frame.
    pub fn flat(bytes: Vec<u8>) -> Self {
        Self(Array1::from(bytes).insert_axis(Axis(0)).into_dyn())
    }

    pub fn from_shape_vec(shape: &[usize], bytes: Vec<u8>) -> Result<Self, ShapeError> {
        ArrayD::from_shape_vec(IxDyn(shape), bytes).map(Self)
    }

    pub fn samples(&self) -> &ArrayD<u8> {
        &self.0
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ArrayD<u8>> for RawFrame {
    fn from(samples: ArrayD<u8>) -> Self {
        Self(samples)
    }
}

impl From<Array3<u8>> for RawFrame {
    fn from(samples: Array3<u8>) -> Self {
        Self(samples.into_dyn())
    }
}

/// The two halves of a capture frame. Both are `(rows, cols, 2)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitFrame {
    /// The viewable (YUYV) image.
    pub visual: Array3<u8>,

    /// Calibration data, two bytes per pixel.
    pub thermal: Array3<u8>,
}

impl SplitFrame {
    pub fn thermal(&self) -> ArrayView3<'_, u8> {
        self.thermal.view()
    }
}
