use bytes::Bytes;
use sphost_types::{
    state::StateCertificate,
    topic::{state_host_topic, QoS},
};
use thiserror::Error;

/// Errors a [Client](crate::Client) can report for a transport operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("The client is not connected")]
    NotConnected,
    #[error("Unable to connect to the broker: {0}")]
    Connect(String),
    #[error("The request failed: {0}")]
    Request(String),
    #[error("The client has been closed")]
    Closed,
}

/// A message received on a subscribed topic, exactly as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: Bytes,
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new<T: Into<Bytes>, P: Into<Bytes>>(topic: T, payload: P) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// An enum that represents the different types of events an [EventLoop](crate::EventLoop) implementation can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The connection to the broker has been established
    Online,
    /// The connection to the broker has been lost or closed
    Offline,
    Publish(InboundMessage),
}

/// Structure representing the last will of a host application
#[derive(Debug, Clone, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub retain: bool,
    pub qos: QoS,
    pub payload: Vec<u8>,
}

impl LastWill {
    /// Create the will for a host: an offline [StateCertificate] on the host's STATE topic.
    pub fn new_app(host_id: &str, certificate: StateCertificate) -> Self {
        let (qos, retain) = certificate.get_publish_quality_retain();
        Self {
            topic: state_host_topic(host_id),
            retain,
            qos,
            payload: certificate.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_will_is_retained_offline_certificate() {
        let will = LastWill::new_app("foo", StateCertificate::new_with_timestamp(false, 7));
        assert_eq!(will.topic, "spBv1.0/STATE/foo");
        assert!(will.retain);
        assert_eq!(will.qos, QoS::AtLeastOnce);
        let cert = StateCertificate::decode(&will.payload).unwrap();
        assert!(!cert.online);
        assert_eq!(cert.timestamp, 7);
    }
}
