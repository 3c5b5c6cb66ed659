// SPDX-License-Identifier: GPL-3.0-or-later
use std::io;

use tracing::{debug, trace};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::io::userptr::Stream as UserptrStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::error::CaptureError;
use crate::frame::RawFrame;

use super::backend::{CaptureBackend, CaptureHandle, CaptureRequest};

const BUFFER_COUNT: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BufferMode {
    Mmap,
    UserPtr,
}

/// Capture through Video4Linux2, which never converts the pixel format on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct V4l2Backend {
    mode: BufferMode,
}

impl V4l2Backend {
    pub fn mmap() -> Self {
        Self {
            mode: BufferMode::Mmap,
        }
    }

    pub fn userptr() -> Self {
        Self {
            mode: BufferMode::UserPtr,
        }
    }
}

impl CaptureBackend for V4l2Backend {
    fn id(&self) -> &str {
        match self.mode {
            BufferMode::Mmap => "v4l2-mmap",
            BufferMode::UserPtr => "v4l2-userptr",
        }
    }

    fn open(&self, request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let device = match &request.device_path {
            Some(path) => Device::with_path(path),
            None => Device::new(request.device_index),
        }
        .map_err(|e| CaptureError::Open(e.to_string()))?;
        let format = device
            .format()
            .map_err(|e| CaptureError::Open(e.to_string()))?;
        debug!(
            backend = self.id(),
            index = request.device_index,
            path = ?request.device_path,
            "Opened V4L2 device"
        );
        Ok(Box::new(V4l2Handle {
            stream: None,
            device,
            format,
            mode: self.mode,
        }))
    }
}

enum V4l2Stream {
    Mmap(MmapStream<'static>),
    UserPtr(UserptrStream),
}

impl V4l2Stream {
    fn next(&mut self) -> io::Result<&[u8]> {
        let (buf, meta) = match self {
            Self::Mmap(stream) => stream.next()?,
            Self::UserPtr(stream) => stream.next()?,
        };
        let used = meta.bytesused as usize;
        if used > 0 && used <= buf.len() {
            Ok(&buf[..used])
        } else {
            Ok(buf)
        }
    }
}

struct V4l2Handle {
    // Declared before the device, so it is dropped (and the buffers released) first.
    stream: Option<V4l2Stream>,
    device: Device,
    format: Format,
    mode: BufferMode,
}

impl V4l2Handle {
    fn start_stream(&mut self) -> Result<&mut V4l2Stream, CaptureError> {
        if self.stream.is_none() {
            let stream = match self.mode {
                BufferMode::Mmap => {
                    MmapStream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
                        .map(V4l2Stream::Mmap)
                }
                BufferMode::UserPtr => {
                    UserptrStream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
                        .map(V4l2Stream::UserPtr)
                }
            }
            .map_err(|e| CaptureError::Configure(format!("unable to start stream: {}", e)))?;
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| CaptureError::Configure("stream was not started".to_string()))
    }
}

impl CaptureHandle for V4l2Handle {
    fn configure(&mut self, request: &CaptureRequest) -> Result<(), CaptureError> {
        // The format can't be changed while buffers are allocated.
        self.stream = None;
        let fourcc = FourCC::new(&request.fourcc);
        let requested = Format::new(request.width, request.height, fourcc);
        let actual = self
            .device
            .set_format(&requested)
            .map_err(|e| CaptureError::Configure(e.to_string()))?;
        if actual.fourcc != fourcc {
            return Err(CaptureError::Configure(format!(
                "device chose pixel format {} instead of {}",
                actual.fourcc, fourcc
            )));
        }
        if let Err(e) = self.device.set_params(&Parameters::with_fps(request.frame_rate)) {
            // Plenty of UVC devices only have one frame rate and reject this.
            debug!(error = %e, fps = request.frame_rate, "Unable to set frame rate");
        }
        debug!(
            width = actual.width,
            height = actual.height,
            stride = actual.stride,
            fourcc = %actual.fourcc,
            "Configured V4L2 format"
        );
        self.format = actual;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        let rows = self.format.height as usize;
        let stride = self.format.stride as usize;
        let bytes = self
            .start_stream()?
            .next()
            .map_err(|e| CaptureError::Read(e.to_string()))?
            .to_vec();
        trace!(len = bytes.len(), "Read V4L2 frame");
        // Keep the row structure when the driver told us the stride, the layout parser crops
        // any padding.
        if rows > 0 && stride > 0 && bytes.len() == rows * stride {
            RawFrame::from_shape_vec(&[rows, stride], bytes)
                .map(Some)
                .map_err(|e| CaptureError::Read(e.to_string()))
        } else {
            Ok(Some(RawFrame::flat(bytes)))
        }
    }
}
