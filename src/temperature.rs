// SPDX-License-Identifier: GPL-3.0-or-later
//! Temperature values and the display-unit conversions.
//!
//! Everything decoded from a camera is in degrees Celsius. Conversions to other units only happen
//! right before a value is handed to something that displays it, and come in two flavors:
//! absolute conversions for readings, and delta conversions for differences (like the label
//! threshold) that are not anchored at zero.
use std::cmp;
use std::fmt;
use std::str::FromStr;

use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Offset between the Celsius and Kelvin scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Number of decimal digits every displayed or decoded temperature is rounded to.
pub const DISPLAY_DIGITS: i32 = 2;

/// Round `value` to `digits` decimal places, with halves rounded away from zero.
pub fn round_decimals(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[serde(alias = "c", alias = "C")]
    Celsius,

    #[serde(alias = "f", alias = "F")]
    Fahrenheit,

    #[serde(alias = "k", alias = "K")]
    Kelvin,
}

impl Default for TemperatureUnit {
    fn default() -> Self {
        Self::Celsius
    }
}

impl TemperatureUnit {
    /// The unit after this one when cycling through the display units.
    pub fn next(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Kelvin,
            Self::Kelvin => Self::Celsius,
        }
    }

    /// Convert an absolute Celsius reading into this unit for display.
    ///
    /// Celsius readings are passed through untouched, the others are rounded to
    /// [`DISPLAY_DIGITS`].
    pub fn display_absolute(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => round_decimals(celsius * 9.0 / 5.0 + 32.0, DISPLAY_DIGITS),
            Self::Kelvin => round_decimals(celsius + KELVIN_OFFSET, DISPLAY_DIGITS),
        }
    }

    /// Convert a Celsius temperature *difference* into this unit for display.
    ///
    /// Differences only scale; there is no offset. A Kelvin difference is the same size as a
    /// Celsius one.
    pub fn display_delta(self, celsius_delta: f64) -> f64 {
        match self {
            Self::Celsius => celsius_delta,
            Self::Fahrenheit => round_decimals(celsius_delta * 9.0 / 5.0, DISPLAY_DIGITS),
            Self::Kelvin => round_decimals(celsius_delta, DISPLAY_DIGITS),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Kelvin => "K",
        })
    }
}

impl FromStr for TemperatureUnit {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.trim().to_ascii_lowercase() as &str {
            "celsius" | "c" => Ok(TemperatureUnit::Celsius),
            "fahrenheit" | "f" => Ok(TemperatureUnit::Fahrenheit),
            "kelvin" | "k" => Ok(TemperatureUnit::Kelvin),
            _ => Err("unknown temperature unit"),
        }
    }
}

/// Convert a Celsius reading for display in `unit`.
pub fn convert_for_display(celsius: f64, unit: TemperatureUnit) -> f64 {
    unit.display_absolute(celsius)
}

/// Convert a Celsius difference for display in `unit`.
pub fn convert_delta_for_display(celsius_delta: f64, unit: TemperatureUnit) -> f64 {
    unit.display_delta(celsius_delta)
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(from = "DeserializedTemperature<T>", into = "SerializedTemperature<T>")]
pub enum Temperature<T = f64>
where
    T: Float,
{
    Celsius(T),
    Fahrenheit(T),
    Kelvin(T),
}

impl<T> Temperature<T>
where
    T: Float,
{
    fn constant(value: f64) -> T {
        T::from(value).expect("temperature constants to be representable by a float")
    }

    /// Get the temperature in Celsius.
    pub fn in_celsius(&self) -> T {
        match self {
            Self::Celsius(_) => self.value(),
            Self::Fahrenheit(_) => {
                (self.value() - Self::constant(32.0)) * Self::constant(5.0) / Self::constant(9.0)
            }
            Self::Kelvin(_) => self.value() - Self::constant(KELVIN_OFFSET),
        }
    }

    /// Get the temperature in Fahrenheit.
    pub fn in_fahrenheit(&self) -> T {
        match self {
            Self::Fahrenheit(_) => self.value(),
            _ => self.in_celsius() * Self::constant(9.0) / Self::constant(5.0) + Self::constant(32.0),
        }
    }

    /// Get the temperature in Kelvin.
    pub fn in_kelvin(&self) -> T {
        match self {
            Self::Kelvin(_) => self.value(),
            _ => self.in_celsius() + Self::constant(KELVIN_OFFSET),
        }
    }

    pub fn unit(&self) -> TemperatureUnit {
        match self {
            Temperature::Celsius(_) => TemperatureUnit::Celsius,
            Temperature::Fahrenheit(_) => TemperatureUnit::Fahrenheit,
            Temperature::Kelvin(_) => TemperatureUnit::Kelvin,
        }
    }

    fn value(&self) -> T {
        match self {
            Temperature::Celsius(c) => *c,
            Temperature::Fahrenheit(f) => *f,
            Temperature::Kelvin(k) => *k,
        }
    }
}

impl<T> cmp::PartialEq<Self> for Temperature<T>
where
    T: Float,
{
    fn eq(&self, other: &Self) -> bool {
        // Always compare in celsius.
        self.in_celsius().eq(&other.in_celsius())
    }
}

impl<T> From<T> for Temperature<T>
where
    T: Float,
{
    fn from(value: T) -> Self {
        Self::Celsius(value)
    }
}

// Accept either a bare number (Celsius) or a map of a unit to a number.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(untagged)]
enum DeserializedTemperature<T>
where
    T: Float,
{
    Number(T),
    Wrapped(SerializedTemperature<T>),
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum SerializedTemperature<T = f64>
where
    T: Float,
{
    #[serde(alias = "c", alias = "C")]
    Celsius(T),

    #[serde(alias = "f", alias = "F")]
    Fahrenheit(T),

    #[serde(alias = "k", alias = "K")]
    Kelvin(T),
}

impl<T> From<DeserializedTemperature<T>> for Temperature<T>
where
    T: Float,
{
    fn from(maybe_wrapped: DeserializedTemperature<T>) -> Self {
        match maybe_wrapped {
            DeserializedTemperature::Number(temperature) => temperature.into(),
            DeserializedTemperature::Wrapped(temperature) => temperature.into(),
        }
    }
}

impl<T> From<SerializedTemperature<T>> for Temperature<T>
where
    T: Float,
{
    fn from(value: SerializedTemperature<T>) -> Self {
        match value {
            SerializedTemperature::Celsius(c) => Self::Celsius(c),
            SerializedTemperature::Fahrenheit(f) => Self::Fahrenheit(f),
            SerializedTemperature::Kelvin(k) => Self::Kelvin(k),
        }
    }
}

impl<T> From<Temperature<T>> for SerializedTemperature<T>
where
    T: Float,
{
    fn from(value: Temperature<T>) -> Self {
        match value {
            Temperature::Celsius(c) => Self::Celsius(c),
            Temperature::Fahrenheit(f) => Self::Fahrenheit(f),
            Temperature::Kelvin(k) => Self::Kelvin(k),
        }
    }
}
