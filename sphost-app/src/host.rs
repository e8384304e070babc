use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use log::{debug, info, warn};
use sphost_client::{Client, DynClient, EventLoop, LastWill};
use sphost_types::{
    state::StateCertificate,
    topic::{QoS, StateTopic, Topic, TopicFilter},
    utils,
};
use tokio::sync::{watch, Mutex};

use crate::{
    config::{DispatchMode, HostConfig},
    dispatch::{Dispatcher, NodeDeviceNotification},
    error::{HostError, TransportOperation},
    eventloop::HostEventLoop,
};

/// The lifecycle of a [Host].
///
/// Moves forward only: `Uninitialized -> Connecting -> Online -> ShuttingDown -> Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLifecycleState {
    Uninitialized,
    Connecting,
    Online,
    ShuttingDown,
    Offline,
}

/// Host state shared with the [HostEventLoop].
pub(crate) struct HostContext {
    pub(crate) host_id: String,
    pub(crate) state_topic: StateTopic,
    subscriptions: Vec<TopicFilter>,
    pub(crate) client: Arc<DynClient>,
    state: watch::Sender<HostLifecycleState>,
    /// Held for the whole of a shutdown and around every birth published while online
    lifecycle: Mutex<()>,
    last_birth: AtomicU64,
}

impl HostContext {
    pub(crate) fn state(&self) -> HostLifecycleState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<HostLifecycleState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: HostLifecycleState) {
        debug!("Host {} state {:?}", self.host_id, state);
        self.state.send_replace(state);
    }

    /// Subscribe to the host's own STATE topic followed by the lifecycle topics.
    async fn subscribe_all(&self) -> Result<(), HostError> {
        for filter in self.subscriptions.iter() {
            debug!("Subscribing to {}", filter.topic);
            self.client
                .subscribe(filter.clone())
                .await
                .map_err(HostError::transport(TransportOperation::Subscribe))?;
        }
        Ok(())
    }

    /// Publish a fresh online certificate to the host's STATE topic.
    async fn publish_birth(&self) -> Result<(), HostError> {
        let certificate = StateCertificate::online();
        self.client
            .publish_state_message(self.state_topic.clone(), certificate)
            .await
            .map_err(HostError::transport(TransportOperation::Publish))?;
        self.last_birth
            .fetch_max(certificate.timestamp, Ordering::SeqCst);
        Ok(())
    }

    /// Publish a fresh birth, optionally re-issuing subscriptions first.
    ///
    /// Returns `Ok(false)` without touching the transport unless the host is `Online` once no shutdown is in
    /// progress.
    pub(crate) async fn republish_birth(&self, resubscribe: bool) -> Result<bool, HostError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.state() != HostLifecycleState::Online {
            return Ok(false);
        }
        if resubscribe {
            self.subscribe_all().await?;
        }
        self.publish_birth().await?;
        Ok(true)
    }

    /// Time of the most recent birth certificate this host published.
    pub(crate) fn last_birth(&self) -> u64 {
        self.last_birth.load(Ordering::SeqCst)
    }
}

/// A Sparkplug host application.
///
/// Announces its presence on `spBv1.0/STATE/<host_id>` and observes node and device lifecycle messages.
///
/// # Example
/// ```no_run
/// use sphost_app::{Host, HostConfig, NoNotification};
/// use sphost_client::channel::ChannelEventLoop;
///
/// # async fn run() -> Result<(), sphost_app::HostError> {
/// let (eventloop, client, _broker) = ChannelEventLoop::new();
/// let mut host = Host::new(HostConfig::new("scada"), client)?;
/// let mut events = host.event_loop(eventloop, NoNotification);
/// tokio::spawn(async move { events.run().await });
///
/// host.initialize().await?;
/// host.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct Host {
    context: Arc<HostContext>,
    will: LastWill,
    dispatch_mode: DispatchMode,
}

impl Host {
    /// Create a new host.
    ///
    /// Validates the host id and registers the host's last will with `client`, so it must be called before the client
    /// connects.
    pub fn new<C: Client + Send + Sync + 'static>(
        config: HostConfig,
        mut client: C,
    ) -> Result<Self, HostError> {
        let host_id = config.host_id;
        utils::validate_name(&host_id).map_err(HostError::InvalidHostId)?;

        let will = LastWill::new_app(&host_id, StateCertificate::offline());
        client.set_will(will.clone());

        let state_topic = StateTopic::new_host(&host_id);
        let mut subscriptions = vec![TopicFilter::new_with_qos(
            Topic::State(state_topic.clone()),
            QoS::AtLeastOnce,
        )];
        subscriptions.extend(Vec::<TopicFilter>::from(config.subscriptions));

        let (state, _) = watch::channel(HostLifecycleState::Uninitialized);
        Ok(Self {
            context: Arc::new(HostContext {
                host_id,
                state_topic,
                subscriptions,
                client: Arc::new(client),
                state,
                lifecycle: Mutex::new(()),
                last_birth: AtomicU64::new(0),
            }),
            will,
            dispatch_mode: config.dispatch_mode,
        })
    }

    /// Create the [HostEventLoop] that delivers inbound messages from `eventloop` to `handler`.
    ///
    /// The event loop finishes once the host has shut down.
    pub fn event_loop<E, H>(&self, eventloop: E, handler: H) -> HostEventLoop
    where
        E: EventLoop + Send + 'static,
        H: NodeDeviceNotification + Send + Sync + 'static,
    {
        HostEventLoop::new(
            self.context.clone(),
            Box::new(eventloop),
            Dispatcher::new(handler),
            self.dispatch_mode,
        )
    }

    pub fn host_id(&self) -> &str {
        &self.context.host_id
    }

    pub fn state(&self) -> HostLifecycleState {
        self.context.state()
    }

    /// Receive lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<HostLifecycleState> {
        self.context.subscribe_state()
    }

    /// The last will registered with the client at construction.
    pub fn will(&self) -> &LastWill {
        &self.will
    }

    pub fn state_topic(&self) -> &StateTopic {
        &self.context.state_topic
    }

    /// Bring the host online.
    ///
    /// Connects, subscribes to the host's STATE topic and the lifecycle topics, then publishes a retained online
    /// certificate. On failure the host is left `Connecting` and `initialize` can be called again.
    pub async fn initialize(&mut self) -> Result<(), HostError> {
        match self.state() {
            HostLifecycleState::Uninitialized | HostLifecycleState::Connecting => (),
            state => return Err(HostError::InvalidState(state)),
        }
        info!("Host {} Initializing", self.context.host_id);
        self.context.set_state(HostLifecycleState::Connecting);

        let result = self.bring_online().await;
        if let Err(e) = &result {
            warn!("Host {} failed to initialize: {e}", self.context.host_id);
            return result;
        }

        self.context.set_state(HostLifecycleState::Online);
        info!("Host {} Online", self.context.host_id);
        Ok(())
    }

    async fn bring_online(&self) -> Result<(), HostError> {
        self.context
            .client
            .connect()
            .await
            .map_err(HostError::transport(TransportOperation::Connect))?;
        self.context.subscribe_all().await?;
        self.context.publish_birth().await
    }

    /// Take the host offline.
    ///
    /// Publishes a retained offline certificate then disconnects. Does nothing unless the host is `Online`, or stuck
    /// `ShuttingDown` after a previous failed attempt.
    pub async fn shutdown(&mut self) -> Result<(), HostError> {
        let _lifecycle = self.context.lifecycle.lock().await;
        match self.state() {
            HostLifecycleState::Online | HostLifecycleState::ShuttingDown => (),
            state => {
                debug!("Host {} shutdown ignored while {state:?}", self.context.host_id);
                return Ok(());
            }
        }
        info!("Host {} Stopping", self.context.host_id);
        self.context.set_state(HostLifecycleState::ShuttingDown);

        self.context
            .client
            .publish_state_message(self.context.state_topic.clone(), StateCertificate::offline())
            .await
            .map_err(HostError::transport(TransportOperation::Publish))?;
        self.context
            .client
            .disconnect()
            .await
            .map_err(HostError::transport(TransportOperation::Disconnect))?;

        self.context.set_state(HostLifecycleState::Offline);
        info!("Host {} Offline", self.context.host_id);
        Ok(())
    }

    /// Publish a fresh online certificate.
    ///
    /// Only permitted while the host is `Online`.
    pub async fn publish_state(&self) -> Result<(), HostError> {
        match self.context.republish_birth(false).await? {
            true => Ok(()),
            false => Err(HostError::InvalidState(self.state())),
        }
    }
}
