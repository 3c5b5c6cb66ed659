// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::bail;
use serde::Deserialize;

use crate::device::{DeviceDescriptor, DeviceModel};
use crate::temperature::Temperature;

/// Which camera to use, and any corrections to its built-in description.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DeviceSettings {
    #[serde(default)]
    pub model: DeviceModel,

    /// The video device index, as in `/dev/video{index}`.
    #[serde(default)]
    pub index: usize,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub width: Option<usize>,

    #[serde(default)]
    pub height: Option<usize>,

    #[serde(default)]
    pub frame_rate: Option<u32>,

    #[serde(default)]
    pub temp_min: Option<Temperature>,

    #[serde(default)]
    pub temp_max: Option<Temperature>,

    /// Accuracy in degrees Celsius.
    #[serde(default)]
    pub temp_accuracy: Option<f64>,
}

impl DeviceSettings {
    /// Build the device description from the model preset and any overrides.
    pub fn descriptor(&self) -> anyhow::Result<DeviceDescriptor> {
        let mut descriptor = self.model.descriptor(self.index);
        if let Some(name) = &self.name {
            descriptor.name = name.clone();
        }
        if let Some(width) = self.width {
            descriptor.width = width;
        }
        if let Some(height) = self.height {
            descriptor.height = height;
        }
        if let Some(frame_rate) = self.frame_rate {
            descriptor.frame_rate = frame_rate;
        }
        if let Some(temp_min) = self.temp_min {
            descriptor.temp_min_c = temp_min.in_celsius();
        }
        if let Some(temp_max) = self.temp_max {
            descriptor.temp_max_c = temp_max.in_celsius();
        }
        if let Some(accuracy) = self.temp_accuracy {
            descriptor.temp_accuracy_c = accuracy;
        }
        if descriptor.width == 0 || descriptor.height == 0 {
            bail!(
                "Invalid sensor size {}x{}",
                descriptor.width,
                descriptor.height
            );
        }
        if descriptor.frame_rate == 0 {
            bail!("Frame rate must be greater than zero");
        }
        if descriptor.temp_min_c > descriptor.temp_max_c {
            bail!(
                "Minimum temperature ({}) is above the maximum ({})",
                descriptor.temp_min_c,
                descriptor.temp_max_c
            );
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;

    use crate::device::DeviceModel;

    use super::DeviceSettings;

    #[test]
    fn defaults() {
        let settings: DeviceSettings = toml::from_str("").unwrap();
        assert_eq!(settings.model, DeviceModel::Ts001);
        assert_eq!(settings.index, 0);
        let descriptor = settings.descriptor().unwrap();
        assert_eq!(descriptor.name, "Topdon TS001");
        assert_eq!((descriptor.width, descriptor.height), (256, 192));
    }

    #[test]
    fn overrides() {
        let settings: DeviceSettings = toml::from_str(
            r#"
            model = "p2pro"
            index = 2
            height = 120
            temp_min = -10
            temp_max = { fahrenheit = 1022 }
            "#,
        )
        .unwrap();
        let descriptor = settings.descriptor().unwrap();
        assert_eq!(descriptor.index, 2);
        assert_eq!(descriptor.name, "Infiray P2 Pro");
        assert_eq!(descriptor.height, 120);
        assert_eq!(descriptor.width, 256);
        assert!(approx_eq!(f64, descriptor.temp_min_c, -10.0));
        assert!(approx_eq!(f64, descriptor.temp_max_c, 550.0, epsilon = 1e-9));
    }

    #[test]
    fn inverted_range() {
        let settings: DeviceSettings = toml::from_str(
            r#"
            temp_min = 100.0
            temp_max = 0.0
            "#,
        )
        .unwrap();
        assert!(settings.descriptor().is_err());
    }

    #[test]
    fn zero_size() {
        let settings: DeviceSettings = toml::from_str("width = 0").unwrap();
        assert!(settings.descriptor().is_err());
    }

    #[test]
    fn unknown_model() {
        let parsed: Result<DeviceSettings, _> = toml::from_str(r#"model = "tc002""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_field() {
        let parsed: Result<DeviceSettings, _> = toml::from_str("colour = true");
        assert!(parsed.is_err());
    }
}
