//! Home Assistant MQTT discovery.
//!
//! One retained config document per channel under
//! `homeassistant/sensor/<client_id>/<channel>/config`. Every entity points
//! its `json_attributes_topic` at the shared state topic and picks its value
//! out of the combined reading with a `value_template`.
//!
//! See https://www.home-assistant.io/integrations/mqtt/#mqtt-discovery

use alloc::{
    format,
    string::{String, ToString},
};

use log::{error, info};
use serde_json::{json, Value};

use crate::{
    config::{
        DEVICE_MANUFACTURER, DEVICE_MODEL, HOMEASSISTANT_DISCOVERY_TOPIC_PREFIX,
        HOMEASSISTANT_SENSOR_TOPIC, SOFTWARE_VERSION,
    },
    domain::DiscoveryDescriptor,
    identity::Identity,
    session::{BrokerTransport, SessionManager},
};

/// Topic the config document for `descriptor` is published to.
pub fn discovery_topic(client_id: &str, descriptor: &DiscoveryDescriptor) -> String {
    format!(
        "{}/{}/{}/{}/config",
        HOMEASSISTANT_DISCOVERY_TOPIC_PREFIX,
        HOMEASSISTANT_SENSOR_TOPIC,
        client_id,
        descriptor.name_suffix.trim()
    )
}

/// Config document announcing one channel.
pub fn discovery_document(identity: &Identity, descriptor: &DiscoveryDescriptor) -> Value {
    let client_id = identity.client_id.as_str();
    let mut payload = json!({
        "device": get_common_device_info(client_id),
        "json_attributes_topic": identity.state_topic,
        "name": format!("{}{}", client_id, descriptor.name_suffix),
        "unique_id": format!("{}{}", client_id, descriptor.unique_id_suffix),
        "unit_of_measurement": descriptor.unit,
        "value_template": descriptor.value_template,
    });

    if let Some(device_class) = descriptor.device_class {
        payload["device_class"] = json!(device_class);
    }

    if let Some(icon) = descriptor.icon {
        payload["icon"] = json!(icon);
    }

    payload
}

fn get_common_device_info(client_id: &str) -> Value {
    json!({
        "identifiers": [client_id],
        "manufacturer": DEVICE_MANUFACTURER,
        "model": DEVICE_MODEL,
        "name": client_id,
        "sw_version": SOFTWARE_VERSION,
    })
}

/// Publish one config document per descriptor, in order, in a single burst.
///
/// A failed publish is logged and the remaining descriptors are still sent.
/// If the broker cannot be reached nothing is sent this boot. Returns the
/// number of documents the broker accepted.
pub async fn publish_discovery<T: BrokerTransport>(
    session: &mut SessionManager<T>,
    identity: &Identity,
    descriptors: &[DiscoveryDescriptor],
) -> usize {
    if !session.ensure_connected(&identity.client_id).await {
        error!("Failed to connect MQTT client, skipping Home Assistant discovery");
        return 0;
    }

    info!(
        "Publishing Home Assistant discovery for {} sensors",
        descriptors.len()
    );

    let mut published = 0;
    for descriptor in descriptors {
        let topic = discovery_topic(&identity.client_id, descriptor);
        let payload = discovery_document(identity, descriptor).to_string();

        match session.publish(&topic, payload.as_bytes(), true).await {
            Ok(()) => {
                info!("Published discovery topic '{}'", topic);
                published += 1;
            }
            Err(e) => error!("Publishing discovery topic '{}' failed: {}", topic, e),
        }
    }

    session.disconnect().await;
    published
}
