// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CaptureError;
use crate::frame::RawFrame;

use super::backend::{CaptureBackend, CaptureHandle, CaptureRequest};

/// A raw frame, and how long to wait after the previous frame before returning it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RecordedFrame {
    pub frame: RawFrame,

    #[serde(default)]
    pub delay: Duration,
}

impl RecordedFrame {
    pub fn new(frame: RawFrame, delay: Duration) -> Self {
        Self { frame, delay }
    }
}

/// The on-disk format for recorded frames.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Recording {
    pub frames: Vec<RecordedFrame>,
}

/// Controls how frames are repeated by [`ReplayBackend`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Don't repeat.
    ///
    /// Once the end of the recording has been reached, the stream ends.
    None,

    /// Loop over the recording.
    ///
    /// Once the end has been reached, the recording restarts from the beginning, reusing the last
    /// delay for the first frame. This is the default mode.
    Loop,

    /// Alternate between forward and reverse playback.
    ///
    /// The frames at either end of the recording are *not* repeated.
    Bounce,
}

impl RepeatMode {
    pub const KINDS: &'static [&'static str] = &["none", "loop", "bounce"];
}

impl Default for RepeatMode {
    fn default() -> Self {
        Self::Loop
    }
}

impl FromStr for RepeatMode {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepeatMode::deserialize(s.into_deserializer())
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepeatMode::None => "none",
            RepeatMode::Loop => "loop",
            RepeatMode::Bounce => "bounce",
        };
        write!(f, "{}", s)
    }
}

/// Plays back recorded frames as if they came from a camera.
#[derive(Clone, Debug)]
pub struct ReplayBackend {
    frames: Arc<[RecordedFrame]>,
    repeat: RepeatMode,
}

impl ReplayBackend {
    pub fn new(frames: Vec<RecordedFrame>, repeat: RepeatMode) -> Self {
        Self {
            frames: frames.into(),
            repeat,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(feature = "mock_camera")]
impl ReplayBackend {
    /// Load a recording from a file.
    ///
    /// Files ending in `.bin` are read as bincode, anything else as TOML.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P, repeat: RepeatMode) -> anyhow::Result<Self> {
        use anyhow::Context as _;

        let path = path.as_ref();
        let recording: Recording = if path.extension().map_or(false, |ext| ext == "bin") {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Unable to open recording {}", path.display()))?;
            bincode::deserialize_from(std::io::BufReader::new(file))
                .with_context(|| format!("Unable to decode recording {}", path.display()))?
        } else {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Unable to read recording {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Unable to parse recording {}", path.display()))?
        };
        Ok(Self::new(recording.frames, repeat))
    }
}

impl CaptureBackend for ReplayBackend {
    fn id(&self) -> &str {
        "replay"
    }

    fn open(&self, _request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        if self.frames.is_empty() {
            return Err(CaptureError::Open("recording has no frames".to_string()));
        }
        Ok(Box::new(ReplayHandle::new(
            Arc::clone(&self.frames),
            self.repeat,
        )))
    }
}

struct ReplayHandle {
    frames: Arc<[RecordedFrame]>,
    index: Box<dyn Iterator<Item = usize>>,
    last_delay: Duration,
}

impl ReplayHandle {
    fn new(frames: Arc<[RecordedFrame]>, repeat: RepeatMode) -> Self {
        let num_frames = frames.len();
        let index: Box<dyn Iterator<Item = usize>> = match repeat {
            RepeatMode::None => Box::new(0..num_frames),
            RepeatMode::Loop => Box::new((0..num_frames).cycle()),
            RepeatMode::Bounce => {
                let forwards = 0..num_frames;
                let backwards = (1..num_frames.saturating_sub(1)).rev();
                Box::new(forwards.chain(backwards).cycle())
            }
        };
        Self {
            frames,
            index,
            last_delay: Duration::ZERO,
        }
    }
}

impl CaptureHandle for ReplayHandle {
    fn configure(&mut self, request: &CaptureRequest) -> Result<(), CaptureError> {
        trace!(?request, "Ignoring capture configuration for replay");
        Ok(())
    }

    fn read(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        let index = match self.index.next() {
            Some(index) => index,
            None => return Ok(None),
        };
        let recorded = &self.frames[index];
        // When we loop, the first delay is 0. Repeat the previous delay instead.
        if recorded.delay != Duration::ZERO {
            self.last_delay = recorded.delay;
        }
        if self.last_delay != Duration::ZERO {
            trace!(delay = ?self.last_delay, index, "Delaying replayed frame");
            thread::sleep(self.last_delay);
        }
        Ok(Some(recorded.frame.clone()))
    }
}
