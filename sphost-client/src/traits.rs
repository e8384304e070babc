use async_trait::async_trait;
use sphost_types::{
    state::StateCertificate,
    topic::{QoS, StateTopic, TopicFilter},
};

use crate::{ClientError, Event, LastWill};

/// The outbound half of an MQTT transport.
#[async_trait]
pub trait Client {
    /// Sets the last will to register with the broker.
    ///
    /// The will is sent as part of the connect handshake, so it must be set before [Client::connect] is called.
    fn set_will(&mut self, will: LastWill);

    /// Connects to the broker.
    ///
    /// Resolves once the broker has acknowledged the connection.
    async fn connect(&self) -> Result<(), ClientError>;

    /// Disconnects the client.
    async fn disconnect(&self) -> Result<(), ClientError>;

    /// Subscribes to a single topic filter.
    ///
    /// This method will yield to the async runtime until the request is accepted by the client
    async fn subscribe(&self, topic: TopicFilter) -> Result<(), ClientError>;

    /// Publishes a message.
    ///
    /// This method will yield to the async runtime until the message is accepted by the client
    async fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ClientError>;

    /// Publishes a state certificate to the specified state topic with the QoS and retain flag the certificate requires.
    async fn publish_state_message(
        &self,
        topic: StateTopic,
        certificate: StateCertificate,
    ) -> Result<(), ClientError> {
        let (qos, retain) = certificate.get_publish_quality_retain();
        self.publish(topic.topic, certificate.into(), qos, retain)
            .await
    }
}

pub type DynClient = dyn Client + Send + Sync;

/// The inbound half of an MQTT transport.
#[async_trait]
pub trait EventLoop {
    /// Wait for the next event.
    ///
    /// Returns `None` once the transport has been closed and no more events will be produced.
    async fn poll(&mut self) -> Option<Event>;
}

pub type DynEventLoop = dyn EventLoop + Send;
