// SPDX-License-Identifier: GPL-3.0-or-later
mod backend;
mod negotiate;
mod replay;
#[cfg(target_os = "linux")]
mod v4l2;

pub use backend::{is_raspberry_pi, BackendKind, CaptureBackend, CaptureHandle, CaptureRequest};
pub use negotiate::{negotiate_capture, CaptureSession, PRIME_ATTEMPTS};
pub use replay::{RecordedFrame, Recording, RepeatMode, ReplayBackend};
#[cfg(target_os = "linux")]
pub use v4l2::V4l2Backend;

/// Create a backend that talks to real hardware.
///
/// Returns `None` for kinds that aren't available on this platform, or that need more than a
/// kind to be created (like [`BackendKind::Replay`]).
pub fn native_backend(kind: BackendKind) -> Option<Box<dyn CaptureBackend>> {
    match kind {
        #[cfg(target_os = "linux")]
        BackendKind::V4l2Mmap => Some(Box::new(V4l2Backend::mmap())),
        #[cfg(target_os = "linux")]
        BackendKind::V4l2UserPtr => Some(Box::new(V4l2Backend::userptr())),
        _ => None,
    }
}
