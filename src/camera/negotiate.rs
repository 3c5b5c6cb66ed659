// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;

use tracing::{debug, info, warn};

use crate::device::DeviceDescriptor;
use crate::error::{CaptureError, NegotiationError};
use crate::frame::{split_frame, RawFrame};

use super::backend::{is_raspberry_pi, CaptureBackend, CaptureHandle, CaptureRequest};

/// How many frames a backend gets to produce a usable frame before it is rejected.
pub const PRIME_ATTEMPTS: usize = 5;

/// An open capture stream that has been shown to deliver raw two-channel frames.
///
/// The session owns the device handle; dropping the session releases the device.
pub struct CaptureSession {
    handle: Box<dyn CaptureHandle>,
    backend: String,
    request: CaptureRequest,
    primed: Option<RawFrame>,
}

impl CaptureSession {
    /// The identifier of the backend that was accepted.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    /// Read the next raw frame. `Ok(None)` means the stream has ended.
    pub fn read_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        match self.primed.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.handle.read(),
        }
    }

    /// Send the capture configuration to the device again.
    pub fn reconfigure(&mut self) -> Result<(), CaptureError> {
        self.handle.configure(&self.request)
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("backend", &self.backend)
            .field("request", &self.request)
            .field("primed", &self.primed.is_some())
            .finish()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        debug!(backend = %self.backend, "Releasing capture device");
    }
}

/// Why a single candidate backend was not accepted.
enum Rejection {
    Failed(CaptureError),
    EndOfStream,
    NoUsableFrame(Option<CaptureError>),
}

/// Configure a freshly opened handle, then read until a frame splits cleanly.
fn prime(
    handle: &mut dyn CaptureHandle,
    request: &CaptureRequest,
    descriptor: &DeviceDescriptor,
) -> Result<RawFrame, Rejection> {
    handle.configure(request).map_err(Rejection::Failed)?;
    let mut last_error = None;
    for attempt in 1..=PRIME_ATTEMPTS {
        match handle.read() {
            Ok(Some(frame)) => match split_frame(&frame, descriptor) {
                Ok(split) if split.thermal.shape()[2] == 2 => return Ok(frame),
                Ok(split) => {
                    debug!(attempt, shape = ?split.thermal.shape(), "Thermal plane has the wrong channel count");
                }
                Err(err) => {
                    debug!(attempt, shape = ?frame.shape(), "Primed frame rejected: {}", err);
                    last_error = Some(CaptureError::from(err));
                }
            },
            Ok(None) => return Err(Rejection::EndOfStream),
            Err(err) => {
                debug!(attempt, "Priming read failed: {}", err);
                last_error = Some(err);
            }
        }
    }
    Err(Rejection::NoUsableFrame(last_error))
}

/// Find the first backend that actually delivers raw two-channel frames for a device.
///
/// Backends are tried in order. Each one is opened, configured, and given [`PRIME_ATTEMPTS`]
/// reads to produce a frame that [`split_frame`] accepts. A backend that fails is closed before
/// the next one is tried.
pub fn negotiate_capture(
    candidates: &[Box<dyn CaptureBackend>],
    device_index: usize,
    descriptor: &DeviceDescriptor,
) -> Result<CaptureSession, NegotiationError> {
    let mut request = CaptureRequest::new(descriptor, device_index);
    if is_raspberry_pi() {
        debug!("Running on a Raspberry Pi, opening the camera by path");
        request = request.with_device_path();
    }
    let mut tried = Vec::with_capacity(candidates.len());
    let mut last_error = None;
    for backend in candidates {
        let id = backend.id().to_string();
        debug!(backend = %id, device_index, "Trying capture backend");
        tried.push(id.clone());
        let mut handle = match backend.open(&request) {
            Ok(handle) => handle,
            Err(err) => {
                debug!(backend = %id, "Unable to open device: {}", err);
                last_error = Some(err);
                continue;
            }
        };
        match prime(handle.as_mut(), &request, descriptor) {
            Ok(frame) => {
                info!(backend = %id, device_index, "Capture backend accepted");
                let mut session = CaptureSession {
                    handle,
                    backend: id,
                    request,
                    primed: Some(frame),
                };
                // Some drivers reset parts of the configuration once streaming starts.
                if let Err(err) = session.reconfigure() {
                    warn!(backend = %session.backend, "Unable to re-apply capture configuration: {}", err);
                }
                return Ok(session);
            }
            Err(Rejection::Failed(err)) => {
                debug!(backend = %id, "Backend rejected configuration: {}", err);
                last_error = Some(err);
            }
            Err(Rejection::EndOfStream) => {
                debug!(backend = %id, "Stream ended while priming");
            }
            Err(Rejection::NoUsableFrame(err)) => {
                debug!(backend = %id, "No usable frame after {} reads", PRIME_ATTEMPTS);
                if err.is_some() {
                    last_error = err;
                }
            }
        }
        // Close this device before opening the next backend.
        drop(handle);
    }
    Err(NegotiationError {
        device_index,
        tried,
        last_error,
    })
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use ndarray::{Array3, ArrayD, IxDyn};

    use crate::camera::{CaptureBackend, CaptureHandle, CaptureRequest};
    use crate::device::DeviceDescriptor;
    use crate::error::{CaptureError, LayoutError};
    use crate::frame::RawFrame;

    use super::{negotiate_capture, PRIME_ATTEMPTS};

    type Script = Vec<Result<Option<RawFrame>, String>>;

    /// Counters shared between a fake backend and the test inspecting it.
    #[derive(Default)]
    struct Probe {
        opened: Cell<usize>,
        released: Cell<usize>,
        reads: Cell<usize>,
        configured: Cell<usize>,
    }

    struct FakeBackend {
        id: &'static str,
        open_error: bool,
        script: Script,
        probe: Rc<Probe>,
    }

    impl FakeBackend {
        fn new(id: &'static str, script: Script) -> (Self, Rc<Probe>) {
            let probe = Rc::new(Probe::default());
            let backend = Self {
                id,
                open_error: false,
                script,
                probe: Rc::clone(&probe),
            };
            (backend, probe)
        }
    }

    struct FakeHandle {
        script: VecDeque<Result<Option<RawFrame>, String>>,
        probe: Rc<Probe>,
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.probe.released.set(self.probe.released.get() + 1);
        }
    }

    impl CaptureBackend for FakeBackend {
        fn id(&self) -> &str {
            self.id
        }

        fn open(&self, _request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CaptureError> {
            if self.open_error {
                return Err(CaptureError::Open(format!("{} is unavailable", self.id)));
            }
            self.probe.opened.set(self.probe.opened.get() + 1);
            Ok(Box::new(FakeHandle {
                script: self.script.clone().into(),
                probe: Rc::clone(&self.probe),
            }))
        }
    }

    impl CaptureHandle for FakeHandle {
        fn configure(&mut self, request: &CaptureRequest) -> Result<(), CaptureError> {
            assert_eq!(&request.fourcc, b"YUYV");
            assert!(!request.convert_rgb);
            self.probe.configured.set(self.probe.configured.get() + 1);
            Ok(())
        }

        fn read(&mut self) -> Result<Option<RawFrame>, CaptureError> {
            self.probe.reads.set(self.probe.reads.get() + 1);
            match self.script.pop_front() {
                Some(Ok(frame)) => Ok(frame),
                Some(Err(msg)) => Err(CaptureError::Read(msg)),
                // A camera that keeps going once the script runs out
                None => Ok(Some(raw_frame())),
            }
        }
    }

    fn raw_frame() -> RawFrame {
        Array3::<u8>::zeros((384, 256, 2)).into()
    }

    fn rgb_frame() -> RawFrame {
        RawFrame::new(ArrayD::zeros(IxDyn(&[384, 256, 3])))
    }

    fn boxed(backends: Vec<FakeBackend>) -> Vec<Box<dyn CaptureBackend>> {
        backends
            .into_iter()
            .map(|b| Box::new(b) as Box<dyn CaptureBackend>)
            .collect()
    }

    #[test]
    fn first_working_backend_wins() {
        let (good, good_probe) = FakeBackend::new("good", vec![Ok(Some(raw_frame()))]);
        let (unused, unused_probe) = FakeBackend::new("unused", vec![]);
        let candidates = boxed(vec![good, unused]);
        let mut session =
            negotiate_capture(&candidates, 0, &DeviceDescriptor::default()).unwrap();
        assert_eq!(session.backend(), "good");
        assert_eq!(unused_probe.opened.get(), 0);
        // Configured while priming, then once more after acceptance.
        assert_eq!(good_probe.configured.get(), 2);
        // The primed frame is handed out first, without another read.
        let reads = good_probe.reads.get();
        assert!(session.read_frame().unwrap().is_some());
        assert_eq!(good_probe.reads.get(), reads);
        assert!(session.read_frame().unwrap().is_some());
        assert_eq!(good_probe.reads.get(), reads + 1);
        assert_eq!(good_probe.released.get(), 0);
        drop(session);
        assert_eq!(good_probe.released.get(), 1);
    }

    #[test]
    fn color_converting_backend_is_skipped() {
        let (rgb, rgb_probe) = FakeBackend::new("rgb", vec![Ok(Some(rgb_frame())); 10]);
        let (raw, _raw_probe) = FakeBackend::new("raw", vec![Ok(Some(raw_frame()))]);
        let candidates = boxed(vec![rgb, raw]);
        let session = negotiate_capture(&candidates, 1, &DeviceDescriptor::default()).unwrap();
        assert_eq!(session.backend(), "raw");
        assert_eq!(session.request().device_index, 1);
        assert_eq!(rgb_probe.reads.get(), PRIME_ATTEMPTS);
        assert_eq!(rgb_probe.released.get(), 1);
    }

    #[test]
    fn late_good_frame_accepted() {
        let script = vec![
            Err("timeout".to_string()),
            Ok(Some(RawFrame::flat(Vec::new()))),
            Ok(Some(rgb_frame())),
            Ok(Some(raw_frame())),
        ];
        let (slow, probe) = FakeBackend::new("slow", script);
        let candidates = boxed(vec![slow]);
        let session = negotiate_capture(&candidates, 0, &DeviceDescriptor::default()).unwrap();
        assert_eq!(session.backend(), "slow");
        assert_eq!(probe.reads.get(), 4);
    }

    #[test]
    fn exhausted_candidates_fail() {
        let (mut closed, closed_probe) = FakeBackend::new("closed", vec![]);
        closed.open_error = true;
        let (ended, ended_probe) = FakeBackend::new("ended", vec![Ok(None)]);
        let (rgb, rgb_probe) = FakeBackend::new("rgb", vec![Ok(Some(rgb_frame())); 10]);
        let candidates = boxed(vec![closed, ended, rgb]);
        let err = negotiate_capture(&candidates, 3, &DeviceDescriptor::default()).unwrap_err();
        assert_eq!(err.device_index, 3);
        assert_eq!(err.tried, vec!["closed", "ended", "rgb"]);
        match err.last_error {
            Some(CaptureError::Rejected(LayoutError::ColorConverted { channels: 3 })) => (),
            other => panic!("Unexpected last error {:?}", other),
        }
        assert_eq!(closed_probe.opened.get(), 0);
        assert_eq!(ended_probe.released.get(), ended_probe.opened.get());
        assert_eq!(rgb_probe.released.get(), 1);
    }

    #[test]
    fn no_candidates() {
        let err = negotiate_capture(&[], 0, &DeviceDescriptor::default()).unwrap_err();
        assert!(err.tried.is_empty());
        assert!(err.last_error.is_none());
    }
}
