// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

use crate::device::DeviceDescriptor;
use crate::error::CaptureError;
use crate::frame::RawFrame;

/// The stream configuration asked of every backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    pub device_index: usize,

    /// Open the device by path instead of by index, when set.
    pub device_path: Option<PathBuf>,

    pub width: u32,

    /// Full frame height, which is both planes stacked.
    pub height: u32,

    pub frame_rate: u32,

    pub fourcc: [u8; 4],

    /// Whether the backend may convert frames to RGB. Converting destroys the thermal plane.
    pub convert_rgb: bool,
}

impl CaptureRequest {
    pub const RAW_FOURCC: [u8; 4] = *b"YUYV";

    pub fn new(descriptor: &DeviceDescriptor, device_index: usize) -> Self {
        Self {
            device_index,
            device_path: None,
            width: descriptor.width as u32,
            height: descriptor.capture_rows() as u32,
            frame_rate: descriptor.frame_rate,
            fourcc: Self::RAW_FOURCC,
            convert_rgb: false,
        }
    }

    /// Open the device through its `/dev/video*` node.
    pub fn with_device_path(mut self) -> Self {
        self.device_path = Some(PathBuf::from(format!("/dev/video{}", self.device_index)));
        self
    }
}

/// A way of getting frames from a video device.
pub trait CaptureBackend {
    /// A short identifier used in logs and errors.
    fn id(&self) -> &str;

    fn open(&self, request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

/// An open capture stream. Dropping it releases the device.
pub trait CaptureHandle {
    fn configure(&mut self, request: &CaptureRequest) -> Result<(), CaptureError>;

    /// Block until the next frame is available.
    ///
    /// `Ok(None)` means the stream has ended and no more frames will be produced.
    fn read(&mut self) -> Result<Option<RawFrame>, CaptureError>;
}

/// The capture backends that can be named in the configuration.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
pub enum BackendKind {
    /// V4L2 with memory mapped buffers.
    #[serde(rename = "v4l2-mmap", alias = "mmap")]
    V4l2Mmap,

    /// V4L2 with user-allocated buffers.
    #[serde(rename = "v4l2-userptr", alias = "userptr")]
    V4l2UserPtr,

    /// Recorded frames, played back from a file.
    #[serde(rename = "replay")]
    Replay,
}

impl BackendKind {
    pub const KINDS: &'static [&'static str] = &["v4l2-mmap", "v4l2-userptr", "replay"];

    /// The native backends for this platform, most preferred first.
    pub fn platform_default() -> Vec<Self> {
        if cfg!(target_os = "linux") {
            vec![Self::V4l2Mmap, Self::V4l2UserPtr]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V4l2Mmap => "v4l2-mmap",
            Self::V4l2UserPtr => "v4l2-userptr",
            Self::Replay => "replay",
        })
    }
}

impl FromStr for BackendKind {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::deserialize(s.into_deserializer())
    }
}

const DEVICE_TREE_MODEL: &str = "/sys/firmware/devicetree/base/model";

/// Check if we're running on a Raspberry Pi, where cameras have to be opened by path.
pub fn is_raspberry_pi() -> bool {
    fs::read_to_string(DEVICE_TREE_MODEL)
        .map(|model| model_is_raspberry_pi(&model))
        .unwrap_or(false)
}

fn model_is_raspberry_pi(model: &str) -> bool {
    model.to_ascii_lowercase().contains("raspberry pi")
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use serde_test::{assert_tokens, Token};

    use crate::device::DeviceDescriptor;

    use super::{model_is_raspberry_pi, BackendKind, CaptureRequest};

    #[test]
    fn request_doubles_height() {
        let request = CaptureRequest::new(&DeviceDescriptor::default(), 2);
        assert_eq!((request.width, request.height), (256, 384));
        assert_eq!(request.frame_rate, 25);
        assert_eq!(&request.fourcc, b"YUYV");
        assert!(!request.convert_rgb);
        assert_eq!(request.device_path, None);
        assert_eq!(
            request.with_device_path().device_path,
            Some(PathBuf::from("/dev/video2"))
        );
    }

    #[test]
    fn backend_kind_names() {
        for name in BackendKind::KINDS {
            let kind: BackendKind = name.parse().unwrap();
            assert_eq!(&kind.to_string(), name);
        }
        assert_eq!("mmap".parse::<BackendKind>().ok(), Some(BackendKind::V4l2Mmap));
        assert!("dshow".parse::<BackendKind>().is_err());
    }

    #[test]
    fn backend_kind_tokens() {
        assert_tokens(
            &BackendKind::V4l2UserPtr,
            &[Token::UnitVariant {
                name: "BackendKind",
                variant: "v4l2-userptr",
            }],
        );
    }

    #[test]
    fn raspberry_pi_model() {
        assert!(model_is_raspberry_pi("Raspberry Pi 4 Model B Rev 1.4\0"));
        assert!(!model_is_raspberry_pi("Pine64 RockPro64"));
    }
}
