// SPDX-License-Identifier: GPL-3.0-or-later
use serde::Deserialize;

use crate::temperature::TemperatureUnit;

fn default_label_threshold() -> f64 {
    2.0
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DisplaySettings {
    #[serde(default)]
    pub unit: TemperatureUnit,

    /// How far (in degrees Celsius) the extremes have to be from the average before they're
    /// labelled.
    #[serde(default = "default_label_threshold")]
    pub label_threshold: f64,

    /// Print one JSON object per frame instead of log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            unit: TemperatureUnit::default(),
            label_threshold: default_label_threshold(),
            json: false,
        }
    }
}
