// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tracing::{debug, info};

mod capture;
mod cli;
mod device;
mod display;

pub use capture::CaptureSettings;
#[cfg(feature = "mock_camera")]
pub use capture::ReplaySettings;
pub use cli::Args;
pub use device::DeviceSettings;
pub use display::DisplaySettings;

/// The configuration file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Which camera to read from.
    #[serde(default)]
    pub device: DeviceSettings,

    /// How to get frames from the camera.
    #[serde(default)]
    pub capture: CaptureSettings,

    /// How temperatures are reported.
    #[serde(default)]
    pub display: DisplaySettings,
}

impl Settings {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Unable to parse config file {}", path.display()))
    }

    /// Load the configuration file named in `args` (or the default one), then apply the
    /// command line overrides.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut settings = match &args.config_path {
            Some(path) => Self::from_path(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_path(&default_path)?
                } else {
                    info!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        settings.apply_args(args);
        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    /// Command line arguments take precedence over the configuration file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(index) = args.device_index {
            self.device.index = index;
        }
        if let Some(model) = args.model {
            self.device.model = model;
        }
        if let Some(unit) = args.unit {
            self.display.unit = unit;
        }
        if args.json {
            self.display.json = true;
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::device::DeviceModel;
    use crate::temperature::TemperatureUnit;

    use super::{Args, Settings};

    #[test]
    fn empty_config() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn full_config() {
        let settings: Settings = toml::from_str(
            r#"
            [device]
            model = "tc001"
            index = 1

            [capture]
            backends = ["v4l2-mmap"]

            [display]
            unit = "k"
            label_threshold = 5
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.device.model, DeviceModel::Tc001);
        assert_eq!(settings.device.index, 1);
        assert_eq!(settings.display.unit, TemperatureUnit::Kelvin);
        assert_eq!(settings.display.label_threshold, 5.0);
        assert!(settings.display.json);
    }

    #[test]
    fn unknown_section() {
        let parsed: Result<Settings, _> = toml::from_str("[mqtt]\nserver = \"localhost\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn args_override_file() {
        let mut file = NamedTempFile::new().expect("to be able to create a temp file");
        write!(
            file,
            r#"
            [device]
            model = "ts001"
            index = 4

            [display]
            unit = "celsius"
            "#
        )
        .expect("to be able to write to a new temp file");
        let args = Args {
            config_path: Some(file.path().to_path_buf()),
            device_index: Some(0),
            model: None,
            unit: Some(TemperatureUnit::Fahrenheit),
            json: false,
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.device.index, 0);
        assert_eq!(settings.device.model, DeviceModel::Ts001);
        assert_eq!(settings.display.unit, TemperatureUnit::Fahrenheit);
        assert!(!settings.display.json);
    }

    #[test]
    fn missing_explicit_file() {
        let args = Args {
            config_path: Some("/not/a/real/path/config.toml".into()),
            ..Args::default()
        };
        assert!(Settings::load(&args).is_err());
    }

    #[test]
    fn invalid_file() {
        let mut file = NamedTempFile::new().expect("to be able to create a temp file");
        write!(file, "[device]\nmodel = 7").expect("to be able to write to a new temp file");
        let err = Settings::from_path(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Unable to parse config file"));
    }
}
