use core::{fmt, num::ParseIntError};

use embassy_time::Duration;

use crate::domain::CalibrationRange;

pub const CLIENT_ID_PREFIX: &str = "higrow_";
pub const STATE_TOPIC_PREFIX: &str = "higrow_plant_monitor/";
pub const STATE_TOPIC_SUFFIX: &str = "/state";
pub const HOMEASSISTANT_DISCOVERY_TOPIC_PREFIX: &str = "homeassistant";
pub const HOMEASSISTANT_SENSOR_TOPIC: &str = "sensor";

pub const DEVICE_MANUFACTURER: &str = "DIY More";
pub const DEVICE_MODEL: &str = "ESP32 DHT11 WIFI Bluetooth Soil Temperature Humidity Sensor18650";
pub const SOFTWARE_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

// ESP will go to deep sleep and not report any data for this duration
pub const DEEP_SLEEP_DURATION_SECONDS: u64 = 60 * 30;
// let in-flight TCP writes leave the radio before it is torn down
pub const FLUSH_HOLD: Duration = Duration::from_secs(2);
pub const NETWORK_ASSOCIATE_TIMEOUT: Duration = Duration::from_secs(30);
pub const BROKER_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const SOIL_MEASUREMENTS: usize = 10;
pub const SOIL_MEASURE_INTERVAL: Duration = Duration::from_millis(200);

// calibrated using a glass of water: dry reads high, wet reads low
pub const SOIL_CALIBRATION: CalibrationRange = CalibrationRange::new(3323, 1389);
pub const LIGHT_CALIBRATION: CalibrationRange = CalibrationRange::new(0, 4095);

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Optional broker login. The password is only ever sent with a username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub username: &'static str,
    pub password: Option<&'static str>,
}

/// Broker address and login, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: &'static str,
    pub port: u16,
    pub credentials: Option<Credentials>,
}

impl BrokerConfig {
    /// Read `MQTT_HOSTNAME`, `MQTT_PORT`, `MQTT_USERNAME` and `MQTT_PASSWORD`
    /// from the build environment.
    pub fn from_build_env() -> Result<Self, Error> {
        Self::parse(
            option_env!("MQTT_HOSTNAME"),
            option_env!("MQTT_PORT"),
            option_env!("MQTT_USERNAME"),
            option_env!("MQTT_PASSWORD"),
        )
    }

    pub fn parse(
        host: Option<&'static str>,
        port: Option<&'static str>,
        username: Option<&'static str>,
        password: Option<&'static str>,
    ) -> Result<Self, Error> {
        let host = non_empty(host).ok_or(Error::MissingHost)?;
        let port = match non_empty(port) {
            Some(port) => port.trim().parse()?,
            None => DEFAULT_MQTT_PORT,
        };
        let credentials = non_empty(username).map(|username| Credentials {
            username,
            password: non_empty(password),
        });

        Ok(Self {
            host,
            port,
            credentials,
        })
    }
}

/// Station credentials for the access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub psk: &'static str,
}

impl WifiConfig {
    pub fn from_build_env() -> Result<Self, Error> {
        let ssid = non_empty(option_env!("WIFI_SSID")).ok_or(Error::MissingSsid)?;
        let psk = option_env!("WIFI_PSK").unwrap_or_default();
        Ok(Self { ssid, psk })
    }
}

fn non_empty(value: Option<&'static str>) -> Option<&'static str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    MissingHost,
    MissingSsid,
    Port,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingHost => write!(f, "MQTT_HOSTNAME is not set"),
            Error::MissingSsid => write!(f, "WIFI_SSID is not set"),
            Error::Port => write!(f, "MQTT_PORT is not a valid port number"),
        }
    }
}

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Self {
        Self::Port
    }
}
