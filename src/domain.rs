use alloc::string::String;
use core::fmt::{Display, Formatter, Result};
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};

/// One duty cycle worth of readings, serialized as the state topic payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub device_id: String,
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub water: f32,
    pub light: f32,
}

impl Display for SensorReading {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Channel::iter().try_for_each(|channel| {
            let value = match channel {
                Channel::Temperature => self.temperature_celsius,
                Channel::Humidity => self.humidity_percent,
                Channel::Water => self.water,
                Channel::Light => self.light,
            };
            writeln!(f, "{}: {:.2} {}", channel.key(), value, channel.descriptor().unit)
        })
    }
}

/// Raw ADC readings that correspond to 0% and 100%.
///
/// `raw_zero` may be larger than `raw_full` for sensors whose output falls as
/// the measured quantity rises (capacitive soil probes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRange {
    pub raw_zero: i32,
    pub raw_full: i32,
}

impl CalibrationRange {
    pub const fn new(raw_zero: i32, raw_full: i32) -> Self {
        Self { raw_zero, raw_full }
    }
}

/// Static description of one Home Assistant sensor entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryDescriptor {
    pub device_class: Option<&'static str>,
    pub name_suffix: &'static str,
    pub unique_id_suffix: &'static str,
    pub unit: &'static str,
    pub value_template: &'static str,
    pub icon: Option<&'static str>,
}

/// The four channels every reading carries, in publish order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Channel {
    Temperature, // Air temperature in °C
    Humidity,    // Relative air humidity in %
    Water,       // Soil moisture in %
    Light,       // Light level in %
}

impl Channel {
    /// Key of the channel inside the state payload.
    pub fn key(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperature_celsius",
            Channel::Humidity => "humidity_percent",
            Channel::Water => "water",
            Channel::Light => "light",
        }
    }

    pub const fn descriptor(self) -> DiscoveryDescriptor {
        match self {
            Channel::Temperature => DiscoveryDescriptor {
                device_class: Some("temperature"),
                name_suffix: " temperature",
                unique_id_suffix: "_temperature",
                unit: "°C",
                value_template: "{{ value_json.temperature_celsius }}",
                icon: None,
            },
            Channel::Humidity => DiscoveryDescriptor {
                device_class: Some("humidity"),
                name_suffix: " humidity",
                unique_id_suffix: "_humidity",
                unit: "%",
                value_template: "{{ value_json.humidity_percent }}",
                icon: None,
            },
            Channel::Water => DiscoveryDescriptor {
                device_class: None,
                name_suffix: " water",
                unique_id_suffix: "_water",
                unit: "%",
                value_template: "{{ value_json.water }}",
                icon: Some("mdi:water-percent"),
            },
            Channel::Light => DiscoveryDescriptor {
                device_class: None,
                name_suffix: " light",
                unique_id_suffix: "_light",
                unit: "%",
                value_template: "{{ value_json.light }}",
                icon: Some("mdi:theme-light-dark"),
            },
        }
    }
}

/// Discovery descriptors for all channels, in publish order.
pub const DESCRIPTORS: [DiscoveryDescriptor; 4] = [
    Channel::Temperature.descriptor(),
    Channel::Humidity.descriptor(),
    Channel::Water.descriptor(),
    Channel::Light.descriptor(),
];
