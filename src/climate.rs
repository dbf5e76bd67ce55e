use core::fmt::Debug;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use log::{info, warn};

use crate::dht11::{self, Dht11, Measurement};

/// Humidity/temperature sensor driver.
pub trait ClimateSensor {
    type Error: Debug;

    /// Prepare the bus before the first measurement.
    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// One blocking measurement.
    fn measure(&mut self) -> Result<Measurement, Self::Error>;
}

impl<GPIO, D, E> ClimateSensor for Dht11<GPIO, D>
where
    GPIO: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
    E: Debug,
{
    type Error = dht11::Error<E>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Dht11::begin(self)
    }

    fn measure(&mut self) -> Result<Measurement, Self::Error> {
        self.read()
    }
}

/// Temperature and relative humidity straight from the driver.
///
/// Readings are not filtered or validated. A failed measurement is logged and
/// reported as `NaN`, which ends up as `null` in the published JSON.
pub struct ClimateReader<S> {
    sensor: S,
}

impl<S: ClimateSensor> ClimateReader<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    pub fn begin(&mut self) {
        if let Err(e) = self.sensor.begin() {
            warn!("Error initialising climate sensor: {:?}", e);
        }
    }

    pub fn read_temperature(&mut self) -> f32 {
        match self.sensor.measure() {
            Ok(measurement) => {
                info!("Temperature: {}°C", measurement.temperature);
                measurement.temperature
            }
            Err(e) => {
                warn!("Error reading temperature: {:?}", e);
                f32::NAN
            }
        }
    }

    pub fn read_humidity(&mut self) -> f32 {
        match self.sensor.measure() {
            Ok(measurement) => {
                info!("Humidity: {}%", measurement.humidity);
                measurement.humidity
            }
            Err(e) => {
                warn!("Error reading humidity: {:?}", e);
                f32::NAN
            }
        }
    }
}
