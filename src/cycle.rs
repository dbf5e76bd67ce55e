//! One wake cycle of the node.
//!
//! ```text
//! Boot -> InitPeripherals -> AssociateNetwork -> RunDiscoveryOnce -> ReadSensors
//!      -> PublishTelemetry -> QuiesceNetwork -> DeepSleep
//! ```
//!
//! Nothing survives deep sleep: the chip resets on wake and the next cycle
//! starts again from `Boot` with a fresh identity and session. Every failure
//! along the way is logged and the cycle moves on, so the node always ends up
//! asleep.

use core::fmt::Debug;

use embassy_time::{with_timeout, Duration, Instant};
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use crate::{
    analog::{AnalogReader, AnalogSampler},
    climate::{ClimateReader, ClimateSensor},
    config::{BrokerConfig, DEEP_SLEEP_DURATION_SECONDS, FLUSH_HOLD, NETWORK_ASSOCIATE_TIMEOUT},
    discovery::publish_discovery,
    domain::{SensorReading, DESCRIPTORS},
    identity::Identity,
    session::{BrokerTransport, SessionManager},
    telemetry::publish_reading,
};

/// Link layer the broker session runs over.
#[allow(async_fn_in_trait)]
pub trait NetworkLink {
    type Error: Debug;

    /// Bring the link up and obtain an address.
    async fn associate(&mut self) -> Result<(), Self::Error>;

    /// Tear the link down before sleeping.
    async fn quiesce(&mut self);
}

/// Hardware deep sleep. The chip resets on wake, so this never returns.
pub trait SleepPrimitive {
    fn sleep_deep(self, duration: Duration) -> !;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Boot,
    InitPeripherals,
    AssociateNetwork,
    RunDiscoveryOnce,
    ReadSensors,
    PublishTelemetry,
    QuiesceNetwork,
    DeepSleep,
}

/// Terminal step of a cycle.
#[must_use = "the cycle is only over once the device is asleep"]
#[derive(Debug, PartialEq, Eq)]
pub struct DeepSleep {
    duration: Duration,
}

impl DeepSleep {
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn enter<P: SleepPrimitive>(self, primitive: P) -> ! {
        info!(
            "Going to sleep for {}s after {}ms",
            self.duration.as_secs(),
            Instant::now().as_millis()
        );
        primitive.sleep_deep(self.duration)
    }
}

/// What one cycle achieved, and the sleep that ends it.
#[derive(Debug)]
pub struct CycleOutcome {
    pub reading: SensorReading,
    pub discovery_published: usize,
    pub telemetry_published: bool,
    pub sleep: DeepSleep,
}

/// Everything one wake cycle needs, built once per boot.
pub struct Node<N, T, S, A, D> {
    identity: Identity,
    network: N,
    session: SessionManager<T>,
    climate: ClimateReader<S>,
    analog: AnalogReader<A>,
    delay: D,
    phase: Phase,
}

impl<N, T, S, A, D> Node<N, T, S, A, D>
where
    N: NetworkLink,
    T: BrokerTransport,
    S: ClimateSensor,
    A: AnalogSampler,
    D: DelayNs,
{
    pub fn new(
        identity: Identity,
        network: N,
        session: SessionManager<T>,
        climate: ClimateReader<S>,
        analog: AnalogReader<A>,
        delay: D,
    ) -> Self {
        Self {
            identity,
            network,
            session,
            climate,
            analog,
            delay,
            phase: Phase::Boot,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, phase: Phase) {
        info!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Run the cycle up to, but not into, deep sleep.
    pub async fn run(&mut self) -> CycleOutcome {
        self.advance(Phase::InitPeripherals);
        self.climate.begin();

        self.advance(Phase::AssociateNetwork);
        let online = match with_timeout(NETWORK_ASSOCIATE_TIMEOUT, self.network.associate()).await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Network association failed: {:?}", e);
                false
            }
            Err(_) => {
                error!(
                    "Network association timed out after {}s",
                    NETWORK_ASSOCIATE_TIMEOUT.as_secs()
                );
                false
            }
        };

        self.advance(Phase::RunDiscoveryOnce);
        let discovery_published = if online {
            publish_discovery(&mut self.session, &self.identity, &DESCRIPTORS).await
        } else {
            warn!("Offline, skipping Home Assistant discovery");
            0
        };

        self.advance(Phase::ReadSensors);
        let reading = self.read_sensors().await;
        info!("{}", reading);

        self.advance(Phase::PublishTelemetry);
        let telemetry_published = if online {
            let published = publish_reading(&mut self.session, &self.identity, &reading).await;
            self.delay.delay_ms(FLUSH_HOLD.as_millis() as u32).await;
            published
        } else {
            warn!("Offline, dropping reading");
            false
        };

        self.advance(Phase::QuiesceNetwork);
        self.network.quiesce().await;

        self.advance(Phase::DeepSleep);
        CycleOutcome {
            reading,
            discovery_published,
            telemetry_published,
            sleep: DeepSleep::new(Duration::from_secs(DEEP_SLEEP_DURATION_SECONDS)),
        }
    }

    async fn read_sensors(&mut self) -> SensorReading {
        let temperature_celsius = self.climate.read_temperature();
        let humidity_percent = self.climate.read_humidity();
        let water = self.analog.read_water(&mut self.delay).await;
        let light = self.analog.read_light();

        SensorReading {
            device_id: self.identity.device_id.clone(),
            temperature_celsius,
            humidity_percent,
            water,
            light,
        }
    }
}

/// Boot banner with everything needed to find this node on the broker.
pub fn log_boot_info(identity: &Identity, broker: &BrokerConfig) {
    info!("------------------------------------------------------------");
    info!("Device id:      {}", identity.device_id);
    info!("Mqtt broker:    {}:{}", broker.host, broker.port);
    if let Some(credentials) = &broker.credentials {
        info!("MQTT Username:  {}", credentials.username);
    }
    info!("Mqtt topic:     {}", identity.state_topic);
    info!("Mqtt client id: {}", identity.client_id);
    info!("------------------------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dht11::Measurement,
        testing::{journal, Journal, MemoryTransport, RecordingDelay, ScriptedSampler},
    };
    use alloc::{
        string::{String, ToString},
        vec::Vec,
    };
    use embassy_futures::block_on;

    struct FakeLink {
        fail: bool,
        journal: Journal,
    }

    impl NetworkLink for FakeLink {
        type Error = &'static str;

        async fn associate(&mut self) -> Result<(), Self::Error> {
            self.journal.borrow_mut().push("associate".to_string());
            if self.fail {
                Err("no access point")
            } else {
                Ok(())
            }
        }

        async fn quiesce(&mut self) {
            self.journal.borrow_mut().push("quiesce".to_string());
        }
    }

    struct FakeClimate;

    impl ClimateSensor for FakeClimate {
        type Error = ();

        fn measure(&mut self) -> Result<Measurement, Self::Error> {
            Ok(Measurement {
                temperature: 21.0,
                humidity: 55.0,
            })
        }
    }

    type TestNode = Node<FakeLink, MemoryTransport, FakeClimate, ScriptedSampler, RecordingDelay>;

    fn node(link_fails: bool, transport: MemoryTransport, journal: &Journal) -> TestNode {
        Node::new(
            Identity::new("ABC123"),
            FakeLink {
                fail: link_fails,
                journal: journal.clone(),
            },
            SessionManager::new(transport.with_journal(journal.clone()), None),
            ClimateReader::new(FakeClimate),
            AnalogReader::new(ScriptedSampler::new(&[2356; 10], &[4095])),
            RecordingDelay::with_journal(journal.clone()),
        )
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal
            .borrow()
            .iter()
            .filter(|entry| entry.as_str() != "delay 200ms")
            .cloned()
            .collect()
    }

    #[test]
    fn full_cycle_runs_in_order() {
        let journal = journal();
        let mut node = node(false, MemoryTransport::default(), &journal);

        let outcome = block_on(node.run());

        assert_eq!(
            entries(&journal),
            [
                "associate",
                "connect",
                "publish homeassistant/sensor/higrow_ABC123/temperature/config",
                "publish homeassistant/sensor/higrow_ABC123/humidity/config",
                "publish homeassistant/sensor/higrow_ABC123/water/config",
                "publish homeassistant/sensor/higrow_ABC123/light/config",
                "disconnect",
                "connect",
                "publish higrow_plant_monitor/ABC123/state",
                "disconnect",
                "delay 2000ms",
                "quiesce",
            ]
        );
        assert_eq!(outcome.discovery_published, 4);
        assert!(outcome.telemetry_published);
        assert_eq!(node.phase(), Phase::DeepSleep);
    }

    #[test]
    fn reading_combines_all_sensors() {
        let journal = journal();
        let mut node = node(false, MemoryTransport::default(), &journal);

        let outcome = block_on(node.run());

        assert_eq!(
            outcome.reading,
            SensorReading {
                device_id: "ABC123".to_string(),
                temperature_celsius: 21.0,
                humidity_percent: 55.0,
                water: 50.0,
                light: 100.0,
            }
        );
        let soil_waits = journal
            .borrow()
            .iter()
            .filter(|entry| entry.as_str() == "delay 200ms")
            .count();
        assert_eq!(soil_waits, 10);
    }

    #[test]
    fn sleeps_for_thirty_minutes() {
        let journal = journal();
        let mut node = node(false, MemoryTransport::default(), &journal);

        let outcome = block_on(node.run());

        assert_eq!(outcome.sleep.duration(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn broker_outage_still_reaches_sleep() {
        let journal = journal();
        let mut node = node(false, MemoryTransport::refusing(), &journal);

        let outcome = block_on(node.run());

        assert_eq!(outcome.discovery_published, 0);
        assert!(!outcome.telemetry_published);
        assert_eq!(
            entries(&journal),
            ["associate", "connect", "connect", "delay 2000ms", "quiesce"]
        );
        assert_eq!(node.phase(), Phase::DeepSleep);
    }

    #[test]
    fn offline_cycle_skips_the_broker() {
        let journal = journal();
        let mut node = node(true, MemoryTransport::default(), &journal);

        let outcome = block_on(node.run());

        assert_eq!(entries(&journal), ["associate", "quiesce"]);
        assert_eq!(outcome.discovery_published, 0);
        assert!(!outcome.telemetry_published);
        assert_eq!(outcome.reading.water, 50.0);
        assert_eq!(outcome.sleep.duration(), Duration::from_secs(1800));
    }
}
