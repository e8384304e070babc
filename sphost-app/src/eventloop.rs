use std::{collections::HashMap, sync::Arc};

use log::{debug, info, trace, warn};
use sphost_client::{DynEventLoop, Event, InboundMessage};
use sphost_types::state::StateCertificate;
use tokio::{
    select,
    sync::{mpsc, watch},
    task::{self, JoinHandle},
};

use crate::{
    config::DispatchMode,
    dispatch::{Dispatcher, Routed},
    host::{HostContext, HostLifecycleState},
    NodeIdentifier,
};

struct NodeWorker {
    tx: mpsc::UnboundedSender<Routed>,
    handle: JoinHandle<()>,
}

/// Ordered per node delivery for [DispatchMode::PerNode]
///
/// A node's worker is retired after an NDEATH. A worker started later for the same node waits for the retired one to
/// drain first.
struct NodeWorkers {
    dispatcher: Arc<Dispatcher>,
    workers: HashMap<NodeIdentifier, NodeWorker>,
    retired: HashMap<NodeIdentifier, JoinHandle<()>>,
}

impl NodeWorkers {
    fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            workers: HashMap::new(),
            retired: HashMap::new(),
        }
    }

    fn spawn_worker(&self, node: &NodeIdentifier, previous: Option<JoinHandle<()>>) -> NodeWorker {
        debug!("Starting worker for node {}/{}", node.group, node.node);
        let (tx, mut rx) = mpsc::unbounded_channel::<Routed>();
        let dispatcher = self.dispatcher.clone();
        let handle = task::spawn(async move {
            if let Some(previous) = previous {
                _ = previous.await;
            }
            while let Some(routed) = rx.recv().await {
                dispatcher.deliver(routed);
            }
        });
        NodeWorker { tx, handle }
    }

    fn submit(&mut self, routed: Routed) {
        let Some(node) = routed.node().cloned() else {
            self.dispatcher.deliver(routed);
            return;
        };
        let retire = matches!(routed, Routed::NodeDeath { .. });

        let unsent = match self.workers.get(&node) {
            Some(worker) => match worker.tx.send(routed) {
                Ok(()) => None,
                Err(mpsc::error::SendError(routed)) => {
                    warn!("Worker for node {}/{} stopped, restarting", node.group, node.node);
                    Some(routed)
                }
            },
            None => Some(routed),
        };
        if let Some(routed) = unsent {
            let previous = match self.workers.remove(&node) {
                Some(worker) => Some(worker.handle),
                None => self.retired.remove(&node),
            };
            let worker = self.spawn_worker(&node, previous);
            _ = worker.tx.send(routed);
            self.workers.insert(node.clone(), worker);
        }

        if retire {
            if let Some(worker) = self.workers.remove(&node) {
                debug!("Retiring worker for node {}/{}", node.group, node.node);
                self.retired.insert(node, worker.handle);
            }
            self.retired.retain(|_, handle| !handle.is_finished());
        }
    }
}

enum Delivery {
    Inline(Arc<Dispatcher>),
    PerNode(NodeWorkers),
}

/// Drives the inbound side of a [Host](crate::Host).
///
/// Routes node and device lifecycle messages to the host's
/// [NodeDeviceNotification](crate::NodeDeviceNotification) handler and keeps the host's STATE consistent:
///
/// * Subscriptions and the birth certificate are re-issued when the transport reconnects on its own
/// * A newer offline certificate for this host received while online is answered with a fresh birth
pub struct HostEventLoop {
    context: Arc<HostContext>,
    state: watch::Receiver<HostLifecycleState>,
    eventloop: Box<DynEventLoop>,
    delivery: Delivery,
    connection_lost: bool,
}

impl HostEventLoop {
    pub(crate) fn new(
        context: Arc<HostContext>,
        eventloop: Box<DynEventLoop>,
        dispatcher: Dispatcher,
        mode: DispatchMode,
    ) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let delivery = match mode {
            DispatchMode::Inline => Delivery::Inline(dispatcher),
            DispatchMode::PerNode => Delivery::PerNode(NodeWorkers::new(dispatcher)),
        };
        Self {
            state: context.subscribe_state(),
            context,
            eventloop,
            delivery,
            connection_lost: false,
        }
    }

    fn host_state(&self) -> HostLifecycleState {
        *self.state.borrow()
    }

    /// Poll the transport, handling every event it produces, until the host is `Offline` or the transport is closed.
    ///
    /// **NOTE** handlers run on this task in [DispatchMode::Inline], blocking in a handler stalls delivery.
    pub async fn run(&mut self) {
        while self.host_state() != HostLifecycleState::Offline {
            select! {
                event = self.eventloop.poll() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                changed = self.state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Host {} event loop closed", self.context.host_id);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Online => self.handle_online(),
            Event::Offline => self.handle_offline(),
            Event::Publish(message) => self.handle_publish(message),
        }
    }

    fn handle_online(&mut self) {
        info!("Transport Online");
        if !std::mem::take(&mut self.connection_lost) {
            return;
        }
        if self.host_state() != HostLifecycleState::Online {
            return;
        }
        info!("Host {} resuming after reconnect", self.context.host_id);
        let context = self.context.clone();
        task::spawn(async move {
            match context.republish_birth(true).await {
                Ok(true) => (),
                Ok(false) => debug!("Host {} no longer online, not resuming", context.host_id),
                Err(e) => warn!("Host {} failed to resume: {e}", context.host_id),
            }
        });
    }

    fn handle_offline(&mut self) {
        match self.host_state() {
            HostLifecycleState::Online => {
                warn!("Transport Offline, waiting for reconnect");
                self.connection_lost = true;
            }
            _ => info!("Transport Offline"),
        }
    }

    fn handle_publish(&mut self, message: InboundMessage) {
        let routed = match Dispatcher::route(&message.topic, &message.payload) {
            Ok(routed) => routed,
            Err(e) => {
                warn!("Dropping message: {e}");
                return;
            }
        };
        trace!("{routed:?}");

        if let Routed::HostState {
            host_id,
            certificate,
        } = &routed
        {
            self.check_own_state(host_id, certificate);
        }

        match &mut self.delivery {
            Delivery::Inline(dispatcher) => dispatcher.deliver(routed),
            Delivery::PerNode(workers) => workers.submit(routed),
        }
    }

    fn check_own_state(&self, host_id: &str, certificate: &StateCertificate) {
        if host_id != self.context.host_id
            || certificate.online
            || self.host_state() != HostLifecycleState::Online
        {
            return;
        }
        if certificate.timestamp < self.context.last_birth() {
            debug!(
                "Ignoring stale offline certificate with timestamp {}",
                certificate.timestamp
            );
            return;
        }
        info!("Host {} reported offline while online, republishing birth", host_id);
        let context = self.context.clone();
        task::spawn(async move {
            match context.republish_birth(false).await {
                Ok(true) => (),
                Ok(false) => debug!("Host {} no longer online, not republishing", context.host_id),
                Err(e) => warn!("Host {} failed to republish birth: {e}", context.host_id),
            }
        });
    }
}
