use alloc::vec::Vec;

use log::{error, info};

use crate::{
    domain::SensorReading,
    identity::Identity,
    session::{BrokerTransport, SessionManager},
};

/// Serialize a reading into the state topic payload.
pub fn reading_payload(reading: &SensorReading) -> Vec<u8> {
    // a struct of plain numbers and a string always serializes
    serde_json::to_vec(reading).unwrap_or_default()
}

/// Publish `reading` retained to the state topic in its own session.
///
/// Returns `true` only if the broker accepted the message. When the broker
/// cannot be reached the reading is dropped; nothing is buffered for later.
pub async fn publish_reading<T: BrokerTransport>(
    session: &mut SessionManager<T>,
    identity: &Identity,
    reading: &SensorReading,
) -> bool {
    let payload = reading_payload(reading);
    info!(
        "Sending payload: {}",
        core::str::from_utf8(&payload).unwrap_or_default()
    );

    if !session.ensure_connected(&identity.client_id).await {
        error!("Error sending message, dropping reading");
        return false;
    }

    let published = match session.publish(&identity.state_topic, &payload, true).await {
        Ok(()) => {
            info!("Published data topic '{}'", identity.state_topic);
            true
        }
        Err(e) => {
            error!(
                "Publishing data topic '{}' failed: {}",
                identity.state_topic, e
            );
            false
        }
    };

    session.disconnect().await;
    published
}
