use core::{fmt, slice::IterMut};

use embassy_net::{
    dns::{DnsQueryType, Error as DnsError},
    tcp::{ConnectError, TcpSocket},
    Stack,
};
use higrow_mqtt_sender::{
    config::{BrokerConfig, Credentials, BROKER_CONNECT_TIMEOUT},
    session::BrokerTransport,
};
use log::{info, warn};
use rust_mqtt::{
    client::{
        client::MqttClient,
        client_config::{ClientConfig, MqttVersion::MQTTv5},
    },
    packet::v5::{publish_packet::QualityOfService, reason_codes::ReasonCode},
    utils::rng_generator::CountingRng,
};
use static_cell::ConstStaticCell;

const BUFFER_SIZE: usize = 4096;
const BUFFER_SIZE_CLIENT: usize = 1024;

/// One buffer set per publish burst: discovery and telemetry.
const BURSTS: usize = 2;

pub struct MqttResources {
    rx_buffer: [u8; BUFFER_SIZE],
    tx_buffer: [u8; BUFFER_SIZE],
    client_rx_buffer: [u8; BUFFER_SIZE_CLIENT],
    client_tx_buffer: [u8; BUFFER_SIZE_CLIENT],
    client_id: heapless::String<64>,
}

impl MqttResources {
    const EMPTY: Self = Self {
        rx_buffer: [0u8; BUFFER_SIZE],
        tx_buffer: [0u8; BUFFER_SIZE],
        client_rx_buffer: [0u8; BUFFER_SIZE_CLIENT],
        client_tx_buffer: [0u8; BUFFER_SIZE_CLIENT],
        client_id: heapless::String::new(),
    };
}

static RESOURCES: ConstStaticCell<[MqttResources; BURSTS]> =
    ConstStaticCell::new([MqttResources::EMPTY; BURSTS]);

type MqttClientImpl = MqttClient<'static, TcpSocket<'static>, 5, CountingRng>;

/// rust-mqtt over an embassy-net TCP socket.
///
/// rust-mqtt borrows its buffers for the life of the client, so every
/// connect consumes one buffer set from a static pool sized for one wake
/// cycle.
pub struct MqttTransport {
    stack: Stack<'static>,
    host: &'static str,
    port: u16,
    spare: IterMut<'static, MqttResources>,
    client: Option<MqttClientImpl>,
}

impl MqttTransport {
    pub fn new(stack: Stack<'static>, broker: &BrokerConfig) -> Self {
        Self {
            stack,
            host: broker.host,
            port: broker.port,
            spare: RESOURCES.take().iter_mut(),
            client: None,
        }
    }
}

impl BrokerTransport for MqttTransport {
    type Error = Error;

    async fn connect(
        &mut self,
        client_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<(), Self::Error> {
        self.client = None;
        let MqttResources {
            rx_buffer,
            tx_buffer,
            client_rx_buffer,
            client_tx_buffer,
            client_id: id,
        } = self.spare.next().ok_or(Error::NoBuffers)?;

        id.clear();
        id.push_str(client_id).map_err(|_| Error::ClientIdTooLong)?;
        let id: &'static heapless::String<64> = id;

        let host_addr = self
            .stack
            .dns_query(self.host, DnsQueryType::A)
            .await?
            .first()
            .copied()
            .ok_or(Error::NoAddress)?;
        let socket_addr = (host_addr, self.port);

        let mut socket = TcpSocket::new(self.stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(BROKER_CONNECT_TIMEOUT));

        info!("Connecting to MQTT server...");
        socket.connect(socket_addr).await?;
        info!("Connected to MQTT server");

        info!("Initializing MQTT connection");
        let mut mqtt_config: ClientConfig<5, CountingRng> =
            ClientConfig::new(MQTTv5, CountingRng(20000));
        mqtt_config.add_client_id(id.as_str());
        if let Some(credentials) = credentials {
            mqtt_config.add_username(credentials.username);
            if let Some(password) = credentials.password {
                mqtt_config.add_password(password);
            }
        }

        let mut client = MqttClient::new(
            socket,
            client_tx_buffer,
            BUFFER_SIZE_CLIENT,
            client_rx_buffer,
            BUFFER_SIZE_CLIENT,
            mqtt_config,
        );

        client.connect_to_broker().await?;
        self.client = Some(client);

        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Self::Error> {
        let client = self.client.as_mut().ok_or(Error::NotConnected)?;
        match client
            .send_message(topic, payload, QualityOfService::QoS0, retain)
            .await
        {
            // published, just nobody listening yet
            Ok(()) | Err(ReasonCode::NoMatchingSubscribers) => Ok(()),
            Err(e) => Err(Error::Mqtt(e)),
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                warn!("MQTT disconnect failed: {:?}", e);
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}

#[derive(Debug)]
pub enum Error {
    Dns(DnsError),
    NoAddress,
    Tcp(ConnectError),
    Mqtt(ReasonCode),
    NoBuffers,
    ClientIdTooLong,
    NotConnected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dns(e) => write!(f, "DNS error: {:?}", e),
            Error::NoAddress => write!(f, "Broker hostname did not resolve"),
            Error::Tcp(e) => write!(f, "TCP connect error: {:?}", e),
            Error::Mqtt(e) => write!(f, "MQTT error: {:?}", e),
            Error::NoBuffers => write!(f, "No MQTT buffers left for this cycle"),
            Error::ClientIdTooLong => write!(f, "Client id does not fit the MQTT buffer"),
            Error::NotConnected => write!(f, "MQTT client is not connected"),
        }
    }
}

impl From<DnsError> for Error {
    fn from(error: DnsError) -> Self {
        Self::Dns(error)
    }
}

impl From<ConnectError> for Error {
    fn from(error: ConnectError) -> Self {
        Self::Tcp(error)
    }
}

impl From<ReasonCode> for Error {
    fn from(error: ReasonCode) -> Self {
        Self::Mqtt(error)
    }
}
