// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::fmt;

/// Reasons a raw frame could not be normalized into a visual and a thermal plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// The buffer had no samples at all.
    Empty,

    /// The frame did not have exactly two channels per pixel. The backend converted it to some
    /// other pixel format, and the thermal bytes are gone.
    ColorConverted { channels: usize },

    /// The buffer shape could not be split into two planes.
    Unsupported { shape: Vec<usize> },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty frame buffer"),
            Self::ColorConverted { channels } => write!(
                f,
                "Frame was already color converted ({} channels), thermal bytes are unrecoverable",
                channels
            ),
            Self::Unsupported { shape } => write!(f, "Unsupported frame layout {:?}", shape),
        }
    }
}

impl StdError for LayoutError {}

/// Errors from a single capture backend.
#[derive(Debug)]
pub enum CaptureError {
    /// The backend could not open the device.
    Open(String),

    /// The backend rejected the requested stream configuration.
    Configure(String),

    /// A read from an open stream failed.
    Read(String),

    /// A frame was read, but it could not be split into visual and thermal planes.
    Rejected(LayoutError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "Unable to open capture device: {}", msg),
            Self::Configure(msg) => write!(f, "Unable to configure capture stream: {}", msg),
            Self::Read(msg) => write!(f, "Unable to read frame: {}", msg),
            Self::Rejected(e) => write!(f, "Frame rejected: {}", e),
        }
    }
}

impl StdError for CaptureError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for CaptureError {
    fn from(e: LayoutError) -> Self {
        Self::Rejected(e)
    }
}

/// No capture backend produced a raw two-channel frame.
#[derive(Debug)]
pub struct NegotiationError {
    pub device_index: usize,

    /// Identifiers of every backend that was tried, in the order they were tried.
    pub tried: Vec<String>,

    /// The last error reported by a backend, if any backend reported one.
    pub last_error: Option<CaptureError>,
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Could not obtain a raw two-channel frame from device index {}. Tried backends: [{}]",
            self.device_index,
            self.tried.join(", ")
        )?;
        if let Some(e) = &self.last_error {
            write!(f, ". Last error: {}", e)?;
        }
        Ok(())
    }
}

impl StdError for NegotiationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.last_error
            .as_ref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod test {
    use super::{CaptureError, LayoutError, NegotiationError};

    #[test]
    fn negotiation_names_candidates() {
        let err = NegotiationError {
            device_index: 2,
            tried: vec!["v4l2-mmap".to_string(), "v4l2-userptr".to_string()],
            last_error: None,
        };
        let message = err.to_string();
        assert!(message.contains("device index 2"), "{}", message);
        assert!(message.contains("v4l2-mmap, v4l2-userptr"), "{}", message);
    }

    #[test]
    fn negotiation_includes_last_error() {
        let err = NegotiationError {
            device_index: 0,
            tried: vec!["replay".to_string()],
            last_error: Some(CaptureError::Open("no such device".to_string())),
        };
        assert!(err.to_string().ends_with("Last error: Unable to open capture device: no such device"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn layout_messages() {
        assert_eq!(
            LayoutError::Unsupported { shape: vec![1] }.to_string(),
            "Unsupported frame layout [1]"
        );
        assert!(LayoutError::ColorConverted { channels: 3 }
            .to_string()
            .contains("3 channels"));
    }

    #[test]
    fn rejected_frames_keep_layout_error() {
        let err: CaptureError = LayoutError::ColorConverted { channels: 1 }.into();
        assert!(err.to_string().starts_with("Frame rejected: "), "{}", err);
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&CaptureError::Read("timeout".to_string())).is_none());
    }
}
