// SPDX-License-Identifier: GPL-3.0-or-later
//! Temperature readings from Topdon TC001/TS001 and Infiray P2 Pro USB thermal cameras.
//!
//! These cameras show up as ordinary video devices, streaming YUYV frames that are twice as tall
//! as the sensor. The top half is a viewable image, the bottom half carries two bytes of
//! temperature data for every pixel.

pub mod acquisition;
pub mod camera;
pub mod decode;
pub mod device;
pub mod error;
pub mod frame;
pub mod settings;
pub mod temperature;

pub use acquisition::{AcquisitionLoop, DisplayStats, FrameSink};
pub use camera::{negotiate_capture, CaptureSession};
pub use decode::{normalize, ByteOrder, FrameTemperatureStats, TemperatureDecoder};
pub use device::{DeviceDescriptor, DeviceModel};
pub use error::{CaptureError, LayoutError, NegotiationError};
pub use frame::{split_frame, RawFrame, SplitFrame};
pub use temperature::{convert_delta_for_display, convert_for_display, TemperatureUnit};
