use esp_hal::{
    analog::adc::{Adc, AdcConfig, AdcPin, Attenuation},
    gpio::{DriveMode, Flex, OutputConfig, Pull},
    peripherals::{ADC1, GPIO22, GPIO32, GPIO33},
    Blocking,
};
use higrow_mqtt_sender::analog::{AnalogInput, AnalogSampler};
use log::error;

// HiGrow board pinout
pub struct SensorPeripherals {
    pub dht11_pin: GPIO22<'static>,
    pub soil_pin: GPIO32<'static>,
    pub light_pin: GPIO33<'static>,
    pub adc1: ADC1<'static>,
}

/// Soil and light probes, both on ADC1 so they keep working while the radio is up.
pub struct AdcSampler {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    soil_pin: AdcPin<GPIO32<'static>, ADC1<'static>>,
    light_pin: AdcPin<GPIO33<'static>, ADC1<'static>>,
}

impl AnalogSampler for AdcSampler {
    fn sample(&mut self, input: AnalogInput) -> u16 {
        let result = match input {
            AnalogInput::Soil => nb::block!(self.adc.read_oneshot(&mut self.soil_pin)),
            AnalogInput::Light => nb::block!(self.adc.read_oneshot(&mut self.light_pin)),
        };
        result.unwrap_or_else(|_| {
            error!("Error reading {:?} sensor", input);
            0
        })
    }
}

impl SensorPeripherals {
    /// Split into the DHT11 data line and the analog sampler.
    pub fn into_parts(self) -> (Flex<'static>, AdcSampler) {
        // open drain with pull-up, the sensor pulls the line low to answer
        let mut dht11_pin = Flex::new(self.dht11_pin);
        dht11_pin.apply_output_config(
            &OutputConfig::default()
                .with_drive_mode(DriveMode::OpenDrain)
                .with_pull(Pull::Up),
        );
        dht11_pin.set_input_enable(true);
        dht11_pin.set_output_enable(true);
        dht11_pin.set_high();

        let mut adc1_config = AdcConfig::new();
        let soil_pin = adc1_config.enable_pin(self.soil_pin, Attenuation::_11dB);
        let light_pin = adc1_config.enable_pin(self.light_pin, Attenuation::_11dB);
        let adc = Adc::new(self.adc1, adc1_config);

        (
            dht11_pin,
            AdcSampler {
                adc,
                soil_pin,
                light_pin,
            },
        )
    }
}
