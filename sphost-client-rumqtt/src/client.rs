use async_trait::async_trait;
use log::{debug, error, trace};
use rumqttc::{
    v5::{
        mqttbytes::{
            v5::{LastWill as RuLastWill, Packet},
            QoS,
        },
        AsyncClient as RuClient, EventLoop as RuEventLoop, MqttOptions as RuMqttOptions,
    },
    Outgoing,
};
use sphost_client::{ClientError, Event, InboundMessage, LastWill};
use sphost_types::topic::TopicFilter;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::MqttOptions;

fn qos_to_mqtt_qos(qos: sphost_types::topic::QoS) -> QoS {
    match qos {
        sphost_types::topic::QoS::AtMostOnce => QoS::AtMostOnce,
        sphost_types::topic::QoS::AtLeastOnce => QoS::AtLeastOnce,
        sphost_types::topic::QoS::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn request_error<E: std::fmt::Display>(e: E) -> ClientError {
    ClientError::Request(e.to_string())
}

/// A [sphost_client::Client] implementation using [rumqttc]
///
/// The underlying rumqtt client is created on [connect](sphost_client::Client::connect) so that the will set
/// beforehand is part of the connect handshake.
pub struct Client {
    options: RuMqttOptions,
    cap: usize,
    client: RwLock<Option<RuClient>>,
    tx_event: mpsc::UnboundedSender<Event>,
}

impl Client {
    async fn handle(&self) -> Result<RuClient, ClientError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(ClientError::NotConnected)
    }
}

#[async_trait]
impl sphost_client::Client for Client {
    fn set_will(&mut self, will: LastWill) {
        let qos = qos_to_mqtt_qos(will.qos);
        let mqtt_will = RuLastWill::new(will.topic, will.payload, qos, will.retain, None);
        self.options.set_last_will(mqtt_will);
    }

    async fn connect(&self) -> Result<(), ClientError> {
        let mut client = self.client.write().await;
        if client.is_some() {
            return Ok(());
        }

        let (ru_client, eventloop) = RuClient::new(self.options.clone(), self.cap);
        let (tx_connack, rx_connack) = oneshot::channel();
        tokio::spawn(drive(eventloop, self.tx_event.clone(), tx_connack));

        match rx_connack.await {
            Ok(Ok(())) => {
                *client = Some(ru_client);
                Ok(())
            }
            Ok(Err(e)) => Err(ClientError::Connect(e)),
            Err(_) => Err(ClientError::Closed),
        }
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        let mut client = self.client.write().await;
        client
            .as_ref()
            .ok_or(ClientError::NotConnected)?
            .disconnect()
            .await
            .map_err(request_error)?;
        *client = None;
        Ok(())
    }

    async fn subscribe(&self, topic: TopicFilter) -> Result<(), ClientError> {
        let qos = qos_to_mqtt_qos(topic.qos);
        self.handle()
            .await?
            .subscribe(String::from(topic.topic), qos)
            .await
            .map_err(request_error)
    }

    async fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
        qos: sphost_types::topic::QoS,
        retain: bool,
    ) -> Result<(), ClientError> {
        self.handle()
            .await?
            .publish(topic, qos_to_mqtt_qos(qos), retain, payload)
            .await
            .map_err(request_error)
    }
}

enum ConnectionState {
    Disconnected,
    Connected,
}

/// Poll the rumqtt eventloop, forwarding connection changes and publishes.
///
/// The first outcome of the connection attempt is reported on `connack`. Once connected, rumqtt reconnects on its own
/// whenever the eventloop is polled after an error, so polling continues until the client disconnects.
async fn drive(
    mut eventloop: RuEventLoop,
    tx_event: mpsc::UnboundedSender<Event>,
    connack: oneshot::Sender<Result<(), String>>,
) {
    let mut connack = Some(connack);
    let mut state = ConnectionState::Disconnected;
    loop {
        let event = match eventloop.poll().await {
            Ok(event) => event,
            Err(e) => {
                if let Some(tx) = connack.take() {
                    _ = tx.send(Err(e.to_string()));
                    break;
                }
                match state {
                    ConnectionState::Connected => {
                        error!("Client error: {e}");
                        state = ConnectionState::Disconnected;
                        _ = tx_event.send(Event::Offline);
                    }
                    ConnectionState::Disconnected => {
                        error!("Client error on reconnect attempt: {e}");
                        tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    }
                }
                continue;
            }
        };

        trace!("{event:?}");
        let forward = match event {
            rumqttc::v5::Event::Incoming(Packet::ConnAck(_)) => {
                state = ConnectionState::Connected;
                if let Some(tx) = connack.take() {
                    _ = tx.send(Ok(()));
                }
                Some(Event::Online)
            }
            rumqttc::v5::Event::Incoming(Packet::Disconnect(_)) => {
                state = ConnectionState::Disconnected;
                Some(Event::Offline)
            }
            rumqttc::v5::Event::Incoming(Packet::Publish(publish)) => Some(Event::Publish(
                InboundMessage::new(publish.topic, publish.payload),
            )),
            rumqttc::v5::Event::Outgoing(Outgoing::Disconnect) => {
                _ = tx_event.send(Event::Offline);
                break;
            }
            _ => None,
        };

        if let Some(event) = forward {
            if tx_event.send(event).is_err() {
                break;
            }
        }
    }
    debug!("rumqtt eventloop stopped");
}

/// An [sphost_client::EventLoop] implementation using [rumqttc]
pub struct EventLoop {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventLoop {
    /// Create a new `EventLoop` and the [Client] that feeds it.
    ///
    /// `options` are the mqtt options to create the rumqtt client with. Clean start and a session expiry interval of 0
    /// are always applied to ensure Sparkplug compliance.
    ///
    /// `cap` specifies the capacity of the bounded async channel for the client handle.
    pub fn new(options: MqttOptions, cap: usize) -> (Self, Client) {
        let (tx_event, rx) = mpsc::unbounded_channel();
        let client = Client {
            options: options.into(),
            cap,
            client: RwLock::new(None),
            tx_event,
        };
        (EventLoop { rx }, client)
    }
}

#[async_trait]
impl sphost_client::EventLoop for EventLoop {
    async fn poll(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
