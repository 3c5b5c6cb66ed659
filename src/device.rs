// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::str::FromStr;

use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

/// Static description of a thermal camera.
///
/// Created once at startup and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceDescriptor {
    pub name: String,

    /// Width of the sensor in pixels.
    pub width: usize,

    /// Height of the sensor in pixels. The raw capture stream is twice this tall.
    pub height: usize,

    /// Coldest temperature (in Celsius) the device can report.
    pub temp_min_c: f64,

    /// Hottest temperature (in Celsius) the device can report.
    pub temp_max_c: f64,

    /// Advertised accuracy, in degrees Celsius.
    pub temp_accuracy_c: f64,

    pub frame_rate: u32,

    /// The OS video device index the camera is attached to.
    pub index: usize,
}

impl DeviceDescriptor {
    /// Whether a Celsius value falls within the device's operating range (inclusive).
    pub fn is_plausible(&self, celsius: f64) -> bool {
        self.temp_min_c <= celsius && celsius <= self.temp_max_c
    }

    /// Number of rows in a full capture frame (visual plane stacked on the thermal plane).
    pub fn capture_rows(&self) -> usize {
        self.height * 2
    }
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        DeviceModel::default().descriptor(0)
    }
}

/// Cameras with known geometry and range.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    Tc001,
    Ts001,
    #[serde(alias = "p2_pro", alias = "p2-pro")]
    P2Pro,
}

impl DeviceModel {
    pub const KINDS: &'static [&'static str] = &["tc001", "ts001", "p2pro"];

    /// The descriptor for this model, attached to video device `index`.
    pub fn descriptor(self, index: usize) -> DeviceDescriptor {
        // All three share the same sensor. Only the names differ.
        DeviceDescriptor {
            name: self.to_string(),
            width: 256,
            height: 192,
            temp_min_c: -20.0,
            temp_max_c: 550.0,
            temp_accuracy_c: 2.0,
            frame_rate: 25,
            index,
        }
    }
}

impl Default for DeviceModel {
    fn default() -> Self {
        Self::Ts001
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tc001 => "Topdon TC001",
            Self::Ts001 => "Topdon TS001",
            Self::P2Pro => "Infiray P2 Pro",
        })
    }
}

impl FromStr for DeviceModel {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceModel::deserialize(s.to_ascii_lowercase().into_deserializer())
    }
}
