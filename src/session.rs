//! Broker session with a connect-per-burst policy.
//!
//! The node never keeps an idle connection: every publish burst calls
//! [`SessionManager::ensure_connected`], publishes, and hands the session
//! back with [`SessionManager::disconnect`]. A failed connect is reported
//! once and never retried within the same call.

use core::fmt::{self, Debug};

use log::{error, info, warn};

use crate::config::Credentials;

/// MQTT connection primitives the session is built on.
#[allow(async_fn_in_trait)]
pub trait BrokerTransport {
    type Error: Debug;

    /// Open the link and run the CONNECT handshake. Bounded by the
    /// transport's own connect timeout.
    async fn connect(
        &mut self,
        client_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<(), Self::Error>;

    /// Publish `payload` to `topic` at QoS 0.
    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool)
        -> Result<(), Self::Error>;

    async fn disconnect(&mut self);

    /// Whether the link is still up.
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

pub struct SessionManager<T> {
    transport: T,
    credentials: Option<Credentials>,
    state: SessionState,
}

impl<T: BrokerTransport> SessionManager<T> {
    pub fn new(transport: T, credentials: Option<Credentials>) -> Self {
        Self {
            transport,
            credentials,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connect unless already connected. Makes at most one handshake attempt.
    pub async fn ensure_connected(&mut self, client_id: &str) -> bool {
        if self.state == SessionState::Connected {
            if self.transport.is_connected() {
                return true;
            }
            warn!("MQTT link dropped since last use");
            self.state = SessionState::Disconnected;
        }

        info!("Connecting to MQTT broker as {}", client_id);
        match self
            .transport
            .connect(client_id, self.credentials.as_ref())
            .await
        {
            Ok(()) => {
                info!("Connected to MQTT broker");
                self.state = SessionState::Connected;
                true
            }
            Err(e) => {
                error!("Failed to connect to MQTT broker: {:?}", e);
                false
            }
        }
    }

    pub async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Error<T::Error>> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }

        self.transport
            .publish(topic, payload, retain)
            .await
            .map_err(Error::Publish)
    }

    /// Close the session. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) {
        if self.state == SessionState::Connected {
            self.transport.disconnect().await;
            self.state = SessionState::Disconnected;
            info!("Disconnected from MQTT broker");
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

#[derive(Debug, PartialEq)]
pub enum Error<E> {
    NotConnected,
    Publish(E),
}

impl<E: Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConnected => write!(f, "Session is not connected"),
            Error::Publish(e) => write!(f, "Publish error: {:?}", e),
        }
    }
}
