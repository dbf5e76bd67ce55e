//! Test doubles for the hardware and broker seams.

use alloc::{
    collections::VecDeque,
    rc::Rc,
    string::{String, ToString},
    vec::Vec,
};
use core::cell::RefCell;

use crate::{
    analog::{AnalogInput, AnalogSampler},
    config::Credentials,
    session::BrokerTransport,
};

/// Ordered log shared between doubles, to check cross-component ordering.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

fn note(journal: &Option<Journal>, entry: String) {
    if let Some(journal) = journal {
        journal.borrow_mut().push(entry);
    }
}

/// Async delay that returns immediately and remembers what it was asked for.
#[derive(Default)]
pub struct RecordingDelay {
    waits_ms: Vec<u32>,
    journal: Option<Journal>,
}

impl RecordingDelay {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            waits_ms: Vec::new(),
            journal: Some(journal),
        }
    }

    pub fn waits_ms(&self) -> &[u32] {
        &self.waits_ms
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000).await
    }

    async fn delay_us(&mut self, us: u32) {
        self.delay_ms(us / 1_000).await
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
        note(&self.journal, alloc::format!("delay {}ms", ms));
    }
}

/// Blocking delay for the bit-banged driver.
pub struct NoopDelay;

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Replays fixed raw counts per input; an exhausted script reads 0.
pub struct ScriptedSampler {
    soil: VecDeque<u16>,
    light: VecDeque<u16>,
    soil_taken: usize,
}

impl ScriptedSampler {
    pub fn new(soil: &[u16], light: &[u16]) -> Self {
        Self {
            soil: soil.iter().copied().collect(),
            light: light.iter().copied().collect(),
            soil_taken: 0,
        }
    }

    pub fn soil_samples_taken(&self) -> usize {
        self.soil_taken
    }
}

impl AnalogSampler for ScriptedSampler {
    fn sample(&mut self, input: AnalogInput) -> u16 {
        match input {
            AnalogInput::Soil => {
                self.soil_taken += 1;
                self.soil.pop_front().unwrap_or_default()
            }
            AnalogInput::Light => self.light.pop_front().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connect {
        client_id: String,
        username: Option<String>,
    },
    Publish {
        topic: String,
        payload: String,
        retain: bool,
    },
    Disconnect,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MemoryError {
    Refused,
    Rejected,
}

/// In-memory broker connection.
#[derive(Default)]
pub struct MemoryTransport {
    refuse_connect: bool,
    reject_topics: Vec<String>,
    connected: bool,
    connect_attempts: usize,
    publish_attempts: usize,
    events: Vec<TransportEvent>,
    journal: Option<Journal>,
}

impl MemoryTransport {
    pub fn refusing() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    /// Publishing to a topic containing `fragment` fails.
    pub fn rejecting(mut self, fragment: &str) -> Self {
        self.reject_topics.push(fragment.to_string());
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    pub fn publish_attempts(&self) -> usize {
        self.publish_attempts
    }

    pub fn disconnects(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TransportEvent::Disconnect))
            .count()
    }

    pub fn events(&self) -> &[TransportEvent] {
        &self.events
    }

    /// Successful publishes as `(topic, payload, retain)`.
    pub fn published(&self) -> Vec<(String, String, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Publish {
                    topic,
                    payload,
                    retain,
                } => Some((topic.clone(), payload.clone(), *retain)),
                _ => None,
            })
            .collect()
    }
}

impl BrokerTransport for MemoryTransport {
    type Error = MemoryError;

    async fn connect(
        &mut self,
        client_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<(), Self::Error> {
        self.connect_attempts += 1;
        note(&self.journal, "connect".to_string());
        if self.refuse_connect {
            return Err(MemoryError::Refused);
        }
        self.connected = true;
        self.events.push(TransportEvent::Connect {
            client_id: client_id.to_string(),
            username: credentials.map(|c| c.username.to_string()),
        });
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Self::Error> {
        self.publish_attempts += 1;
        note(&self.journal, alloc::format!("publish {}", topic));
        if self.reject_topics.iter().any(|t| topic.contains(t.as_str())) {
            return Err(MemoryError::Rejected);
        }
        self.events.push(TransportEvent::Publish {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    async fn disconnect(&mut self) {
        note(&self.journal, "disconnect".to_string());
        self.connected = false;
        self.events.push(TransportEvent::Disconnect);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
