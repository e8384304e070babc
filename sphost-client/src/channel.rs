use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use crate::{ClientError, Event, LastWill};
use async_trait::async_trait;
use sphost_types::topic::{QoS, TopicFilter};
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The transport operations a [ChannelClient] can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Subscribe,
    Publish,
    Disconnect,
}

/// An Enum representing different messages and requests a [ChannelClient] can send to the [ChannelBroker]
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    SetWill(LastWill),
    Connect,
    Subscribe(TopicFilter),
    Publish {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    },
    Disconnect,
}

#[derive(Default)]
struct BrokerState {
    last_will: Option<LastWill>,
    retained: HashMap<String, Vec<u8>>,
    failures: HashSet<Operation>,
}

/// A [Client](crate::Client) implementation that uses channels for message passing.
///
/// # Examples
///
/// See [ChannelEventLoop]
pub struct ChannelClient {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    tx_event: mpsc::UnboundedSender<Event>,
    connected: Arc<AtomicBool>,
    state: Arc<Mutex<BrokerState>>,
}

impl ChannelClient {
    fn take_failure(&self, operation: Operation) -> bool {
        lock(&self.state).failures.remove(&operation)
    }

    fn send(&self, message: OutboundMessage) -> Result<(), ClientError> {
        self.tx.send(message).map_err(|_| ClientError::Closed)
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

#[async_trait]
impl crate::Client for ChannelClient {
    fn set_will(&mut self, will: LastWill) {
        lock(&self.state).last_will = Some(will.clone());
        _ = self.tx.send(OutboundMessage::SetWill(will));
    }

    async fn connect(&self) -> Result<(), ClientError> {
        if self.take_failure(Operation::Connect) {
            return Err(ClientError::Connect("connection refused".into()));
        }
        self.send(OutboundMessage::Connect)?;
        self.connected.store(true, Ordering::SeqCst);
        _ = self.tx_event.send(Event::Online);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        self.ensure_connected()?;
        if self.take_failure(Operation::Disconnect) {
            return Err(ClientError::Request("disconnect failed".into()));
        }
        self.send(OutboundMessage::Disconnect)?;
        self.connected.store(false, Ordering::SeqCst);
        _ = self.tx_event.send(Event::Offline);
        Ok(())
    }

    async fn subscribe(&self, topic: TopicFilter) -> Result<(), ClientError> {
        self.ensure_connected()?;
        if self.take_failure(Operation::Subscribe) {
            return Err(ClientError::Request("subscribe failed".into()));
        }
        self.send(OutboundMessage::Subscribe(topic))
    }

    async fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ClientError> {
        self.ensure_connected()?;
        if self.take_failure(Operation::Publish) {
            return Err(ClientError::Request("publish failed".into()));
        }
        if retain {
            let mut state = lock(&self.state);
            if payload.is_empty() {
                state.retained.remove(&topic);
            } else {
                state.retained.insert(topic.clone(), payload.clone());
            }
        }
        self.send(OutboundMessage::Publish {
            topic,
            payload,
            qos,
            retain,
        })
    }
}

/// A "broker" that manages the communication between a [ChannelClient] and an [ChannelEventLoop].
///
/// Used to send messages to the eventloop and inspect messages/requests produced by the client
///
/// # Examples
///
/// ```no_run
/// use sphost_client::{Event, InboundMessage, channel::ChannelEventLoop};
/// use tokio::runtime::Runtime;
///
/// let rt = Runtime::new().unwrap();
/// rt.block_on(async {
///     let (mut eventloop, client, mut broker) = ChannelEventLoop::new();
///
///     //create a host that uses the EventLoop and client
///
///     //Deliver a message to the EventLoop
///     broker.tx_event.send(Event::Publish(InboundMessage::new("spBv1.0/G/NBIRTH/N", "{}"))).unwrap();
///
///     //Receive a message or request from the Client
///     let message = broker.rx_outbound.recv().await.unwrap();
/// });
/// ```
pub struct ChannelBroker {
    pub rx_outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    pub tx_event: mpsc::UnboundedSender<Event>,
    state: Arc<Mutex<BrokerState>>,
}

impl ChannelBroker {
    /// Retrieves the current last will message set by the client, if set.
    pub fn last_will(&self) -> Option<LastWill> {
        lock(&self.state).last_will.clone()
    }

    /// Retrieves the payload currently retained on a topic, if any.
    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        lock(&self.state).retained.get(topic).cloned()
    }

    /// Make the next attempt at `operation` fail.
    pub fn fail_next(&self, operation: Operation) {
        lock(&self.state).failures.insert(operation);
    }

    /// Drain every request the client has produced so far.
    pub fn drain_outbound(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx_outbound.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// An [EventLoop](crate::EventLoop) implementation that uses channels
///
/// # Examples
///
/// See [ChannelBroker]
pub struct ChannelEventLoop {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl ChannelEventLoop {
    /// Creates a new event loop along with the corresponding client and broker.
    pub fn new() -> (Self, ChannelClient, ChannelBroker) {
        let (tx_event, rx_event) = mpsc::unbounded_channel();
        let (tx_outbound, rx_outbound) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(BrokerState::default()));
        let el = Self { rx: rx_event };
        (
            el,
            ChannelClient {
                tx: tx_outbound,
                tx_event: tx_event.clone(),
                connected: Arc::new(AtomicBool::new(false)),
                state: state.clone(),
            },
            ChannelBroker {
                rx_outbound,
                tx_event,
                state,
            },
        )
    }
}

#[async_trait]
impl crate::EventLoop for ChannelEventLoop {
    async fn poll(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Client, EventLoop};
    use sphost_types::topic::{StateTopic, Topic};

    #[tokio::test]
    async fn requests_require_a_connection() {
        let (_el, client, _broker) = ChannelEventLoop::new();
        let filter = TopicFilter::new(Topic::State(StateTopic::new_host("foo")));
        assert_eq!(client.subscribe(filter).await, Err(ClientError::NotConnected));
        assert_eq!(
            client
                .publish("a".into(), vec![1], QoS::AtMostOnce, false)
                .await,
            Err(ClientError::NotConnected)
        );
    }

    #[tokio::test]
    async fn retained_messages_are_last_write_wins() {
        let (_el, client, mut broker) = ChannelEventLoop::new();
        client.connect().await.unwrap();
        client
            .publish("t".into(), b"one".to_vec(), QoS::AtLeastOnce, true)
            .await
            .unwrap();
        client
            .publish("t".into(), b"two".to_vec(), QoS::AtLeastOnce, true)
            .await
            .unwrap();
        client
            .publish("t".into(), b"three".to_vec(), QoS::AtLeastOnce, false)
            .await
            .unwrap();
        assert_eq!(broker.retained("t"), Some(b"two".to_vec()));
        assert_eq!(broker.drain_outbound().len(), 4);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let (mut el, client, mut broker) = ChannelEventLoop::new();
        broker.fail_next(Operation::Connect);
        assert!(matches!(client.connect().await, Err(ClientError::Connect(_))));
        assert!(broker.drain_outbound().is_empty());
        client.connect().await.unwrap();
        assert_eq!(broker.drain_outbound(), vec![OutboundMessage::Connect]);
        assert_eq!(el.poll().await, Some(Event::Online));
    }
}
