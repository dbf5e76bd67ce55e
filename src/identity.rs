use alloc::{
    format,
    string::{String, ToString},
};

use crate::config::{CLIENT_ID_PREFIX, STATE_TOPIC_PREFIX, STATE_TOPIC_SUFFIX};

/// Names derived from the hardware id, recomputed on every boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub device_id: String,
    pub client_id: String,
    pub state_topic: String,
}

impl Identity {
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            client_id: format!("{}{}", CLIENT_ID_PREFIX, device_id),
            state_topic: format!("{}{}{}", STATE_TOPIC_PREFIX, device_id, STATE_TOPIC_SUFFIX),
        }
    }

    pub fn from_mac(mac: &[u8; 6]) -> Self {
        Self::new(&device_id_from_mac(mac))
    }
}

/// Upper-case hex of the NIC specific half of the factory MAC.
pub fn device_id_from_mac(mac: &[u8; 6]) -> String {
    format!("{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5])
}
