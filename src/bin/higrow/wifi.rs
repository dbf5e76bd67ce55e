use core::fmt;

use embassy_executor::{SpawnError, Spawner};
use embassy_net::{Runner, Stack, StackResources};
use esp_hal::{peripherals::WIFI, rng::Rng};
use esp_radio::{
    wifi::{ClientConfig, Config, ModeConfig, WifiController, WifiDevice, WifiError},
    Controller, InitializationError,
};
use higrow_mqtt_sender::{config::WifiConfig, cycle::NetworkLink};
use log::{error, info};
use static_cell::StaticCell;

/// Static cell for network stack resources
static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
static RADIO: StaticCell<Controller<'static>> = StaticCell::new();

/// Station link to the configured access point.
pub struct WifiLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    config: WifiConfig,
}

impl WifiLink {
    /// Bring up the radio and the network stack. The station is not
    /// associated until [`NetworkLink::associate`] runs.
    pub fn new(wifi: WIFI<'static>, config: WifiConfig, spawner: Spawner) -> Result<Self, Error> {
        let radio = RADIO.init(esp_radio::init()?);
        let (controller, interfaces) = esp_radio::wifi::new(radio, wifi, Config::default())?;

        let rng = Rng::new();
        let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
        let net_config = embassy_net::Config::dhcpv4(Default::default());

        info!("Initialize network stack");
        let stack_resources: &'static mut _ = STACK_RESOURCES.init(StackResources::new());
        let (stack, runner) = embassy_net::new(interfaces.sta, net_config, stack_resources, seed);

        spawner.spawn(net_task(runner)?);

        Ok(Self {
            controller,
            stack,
            config,
        })
    }

    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl NetworkLink for WifiLink {
    type Error = Error;

    async fn associate(&mut self) -> Result<(), Self::Error> {
        info!("Connecting to wifi with SSID: {}", self.config.ssid);
        let client_config = ClientConfig::default()
            .with_ssid(self.config.ssid.into())
            .with_password(self.config.psk.into());
        self.controller
            .set_config(&ModeConfig::Client(client_config))?;

        info!("Starting WiFi controller");
        self.controller.start_async().await?;

        self.controller.connect_async().await?;
        info!("Connected to WiFi network");

        info!("Wait for IP address");
        self.stack.wait_config_up().await;
        if let Some(config) = self.stack.config_v4() {
            info!("Connected to WiFi with IP address {}", config.address);
        }

        Ok(())
    }

    async fn quiesce(&mut self) {
        info!("Stopping WiFi");
        if let Err(e) = self.controller.disconnect_async().await {
            error!("Failed to disconnect from WiFi: {:?}", e);
        }
        if let Err(e) = self.controller.stop_async().await {
            error!("Failed to stop WiFi controller: {:?}", e);
        }
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

#[derive(Debug)]
pub enum Error {
    Radio(InitializationError),
    Wifi(WifiError),
    Spawn(SpawnError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Radio(e) => write!(f, "Radio initialization error: {:?}", e),
            Error::Wifi(e) => write!(f, "WiFi error: {:?}", e),
            Error::Spawn(e) => write!(f, "Task spawn error: {:?}", e),
        }
    }
}

impl From<InitializationError> for Error {
    fn from(error: InitializationError) -> Self {
        Self::Radio(error)
    }
}

impl From<WifiError> for Error {
    fn from(error: WifiError) -> Self {
        Self::Wifi(error)
    }
}

impl From<SpawnError> for Error {
    fn from(error: SpawnError) -> Self {
        Self::Spawn(error)
    }
}
