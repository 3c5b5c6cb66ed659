// SPDX-License-Identifier: GPL-3.0-or-later
use structopt::StructOpt;

use std::path::PathBuf;

use crate::device::DeviceModel;
use crate::temperature::TemperatureUnit;

#[derive(Debug, Default, StructOpt)]
#[structopt(about = "Read temperatures from a USB thermal camera")]
pub struct Args {
    /// Path to a configuration file. Defaults to `config.toml`, if it exists.
    #[structopt(short, long, parse(from_os_str))]
    pub config_path: Option<PathBuf>,

    /// The video device index of the camera.
    #[structopt(short, long)]
    pub device_index: Option<usize>,

    /// The camera model.
    #[structopt(short, long, possible_values = DeviceModel::KINDS)]
    pub model: Option<DeviceModel>,

    /// The unit temperatures are shown in (celsius, fahrenheit or kelvin).
    #[structopt(short, long)]
    pub unit: Option<TemperatureUnit>,

    /// Print one line of JSON for every frame.
    #[structopt(long)]
    pub json: bool,
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use structopt::StructOpt;

    use crate::device::DeviceModel;
    use crate::temperature::TemperatureUnit;

    use super::Args;

    #[test]
    fn no_args() {
        let args = Args::from_iter_safe(&["tc-thermal"]).unwrap();
        assert_eq!(args.config_path, None);
        assert_eq!(args.device_index, None);
        assert_eq!(args.model, None);
        assert!(!args.json);
    }

    #[test]
    fn all_args() {
        let args = Args::from_iter_safe(&[
            "tc-thermal",
            "--config-path",
            "/etc/tc-thermal.toml",
            "-d",
            "2",
            "--model",
            "tc001",
            "--unit",
            "f",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.config_path.as_deref(), Some(Path::new("/etc/tc-thermal.toml")));
        assert_eq!(args.device_index, Some(2));
        assert_eq!(args.model, Some(DeviceModel::Tc001));
        assert_eq!(args.unit, Some(TemperatureUnit::Fahrenheit));
        assert!(args.json);
    }

    #[test]
    fn bad_model() {
        assert!(Args::from_iter_safe(&["tc-thermal", "--model", "flir"]).is_err());
    }
}
