#![no_std]
#![no_main]

use board::SensorPeripherals;
use embassy_executor::Spawner;
use embassy_time::{Delay, Duration};
use esp_alloc::heap_allocator;
use esp_hal::{
    efuse::Efuse,
    gpio::{Level, Output, OutputConfig},
    timer::timg::TimerGroup,
};
use higrow_mqtt_sender::{
    analog::AnalogReader,
    climate::ClimateReader,
    config::{BrokerConfig, WifiConfig, DEEP_SLEEP_DURATION_SECONDS},
    cycle::{log_boot_info, DeepSleep, Node},
    dht11::Dht11,
    identity::Identity,
    session::SessionManager,
};
use log::{error, info};
use sleep::RtcSleep;
use transport::MqttTransport;
use wifi::WifiLink;
use esp_backtrace as _;

extern crate alloc;

mod board;
mod sleep;
mod transport;
mod wifi;

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let sleeper = RtcSleep::new(peripherals.LPWR);
    let give_up = DeepSleep::new(Duration::from_secs(DEEP_SLEEP_DURATION_SECONDS));

    // lit while the node is setting up
    let mut info_led = Output::new(peripherals.GPIO16, Level::High, OutputConfig::default());

    let identity = Identity::from_mac(&Efuse::mac_address());

    let (broker, wifi_config) = match (BrokerConfig::from_build_env(), WifiConfig::from_build_env())
    {
        (Ok(broker), Ok(wifi_config)) => (broker, wifi_config),
        (Err(e), _) | (_, Err(e)) => {
            error!("Invalid build configuration: {}", e);
            give_up.enter(sleeper)
        }
    };

    log_boot_info(&identity, &broker);

    let link = match WifiLink::new(peripherals.WIFI, wifi_config, spawner) {
        Ok(link) => link,
        Err(e) => {
            error!("Error while bringing up the radio: {}", e);
            give_up.enter(sleeper)
        }
    };
    let transport = MqttTransport::new(link.stack(), &broker);

    let (dht11_pin, sampler) = SensorPeripherals {
        dht11_pin: peripherals.GPIO22,
        soil_pin: peripherals.GPIO32,
        light_pin: peripherals.GPIO33,
        adc1: peripherals.ADC1,
    }
    .into_parts();

    let mut node = Node::new(
        identity,
        link,
        SessionManager::new(transport, broker.credentials),
        ClimateReader::new(Dht11::new(dht11_pin, Delay)),
        AnalogReader::new(sampler),
        Delay,
    );

    info!("Setup done");
    info_led.set_low();

    let outcome = node.run().await;
    info!(
        "Cycle done: {} discovery documents, telemetry published: {}",
        outcome.discovery_published, outcome.telemetry_published
    );

    outcome.sleep.enter(sleeper)
}
