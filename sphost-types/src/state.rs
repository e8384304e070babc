use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{topic::QoS, utils::timestamp};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CertificateError {
    #[error("Unable to decode state certificate: {0}")]
    MalformedPayload(String),
}

/// The birth/death certificate published on a host STATE topic.
///
/// Serialized as `{"online":<bool>,"timestamp":<integer>}` where timestamp is milliseconds since the unix epoch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCertificate {
    pub online: bool,
    #[serde(default)]
    pub timestamp: u64,
}

impl StateCertificate {
    /// Create a certificate stamped with the current time
    pub fn new(online: bool) -> Self {
        Self::new_with_timestamp(online, timestamp())
    }

    pub fn new_with_timestamp(online: bool, timestamp: u64) -> Self {
        Self { online, timestamp }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Get the [QoS] and retain settings that the certificate should be published with
    pub fn get_publish_quality_retain(&self) -> (QoS, bool) {
        (QoS::AtLeastOnce, true)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::json!({
            "online": self.online,
            "timestamp": self.timestamp,
        })
        .to_string()
        .into_bytes()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, CertificateError> {
        serde_json::from_slice::<StateCertificate>(payload)
            .map_err(|e| CertificateError::MalformedPayload(e.to_string()))
    }
}

/// Encode a freshly stamped certificate
pub fn encode(online: bool) -> Vec<u8> {
    StateCertificate::new(online).to_bytes()
}

pub fn decode(payload: &[u8]) -> Result<StateCertificate, CertificateError> {
    StateCertificate::decode(payload)
}

impl From<StateCertificate> for Vec<u8> {
    fn from(value: StateCertificate) -> Self {
        value.to_bytes()
    }
}

impl TryFrom<&[u8]> for StateCertificate {
    type Error = CertificateError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::decode(value)
    }
}
