// SPDX-License-Identifier: GPL-3.0-or-later
#[cfg(feature = "mock_camera")]
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::camera::{native_backend, BackendKind, CaptureBackend};
#[cfg(feature = "mock_camera")]
use crate::camera::{RepeatMode, ReplayBackend};

/// A recording to play back instead of (or before) a real camera.
#[cfg(feature = "mock_camera")]
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReplaySettings {
    pub path: PathBuf,

    #[serde(default)]
    pub repeat_mode: RepeatMode,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CaptureSettings {
    /// Backends to try, in order. Defaults to the native backends for this platform.
    #[serde(default)]
    pub backends: Option<Vec<BackendKind>>,

    #[cfg(feature = "mock_camera")]
    #[serde(default)]
    pub replay: Option<ReplaySettings>,
}

impl CaptureSettings {
    #[cfg(feature = "mock_camera")]
    fn replay_configured(&self) -> bool {
        self.replay.is_some()
    }

    #[cfg(not(feature = "mock_camera"))]
    fn replay_configured(&self) -> bool {
        false
    }

    /// The order backends will be tried in.
    pub fn backend_order(&self) -> Vec<BackendKind> {
        match &self.backends {
            Some(backends) => backends.clone(),
            None => {
                let mut order = BackendKind::platform_default();
                if self.replay_configured() {
                    order.insert(0, BackendKind::Replay);
                }
                order
            }
        }
    }

    /// Create the candidate backends, skipping any that can't be used here.
    pub fn create_backends(&self) -> anyhow::Result<Vec<Box<dyn CaptureBackend>>> {
        let mut backends = Vec::new();
        for kind in self.backend_order() {
            if kind == BackendKind::Replay {
                #[cfg(feature = "mock_camera")]
                {
                    if let Some(replay) = &self.replay {
                        let backend = ReplayBackend::from_path(&replay.path, replay.repeat_mode)?;
                        backends.push(Box::new(backend) as Box<dyn CaptureBackend>);
                        continue;
                    }
                }
                warn!("The replay backend needs a [capture.replay] section, skipping it");
                continue;
            }
            match native_backend(kind) {
                Some(backend) => backends.push(backend),
                None => warn!(backend = %kind, "Capture backend is not available on this platform"),
            }
        }
        Ok(backends)
    }
}
