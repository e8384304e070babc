use sphost_types::topic::{MessageType, QoS, Topic, TopicFilter};

/// The lifecycle message types a host subscribes to
const LIFECYCLE_MESSAGES: [MessageType; 3] =
    [MessageType::NBirth, MessageType::NDeath, MessageType::DBirth];

/// Selects the topics a host subscribes to in order to observe node and device lifecycles.
///
/// The host always subscribes to its own STATE topic in addition to these.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SubscriptionConfig {
    /// `spBv1.0/+/+/NBIRTH/#`, `spBv1.0/+/+/NDEATH/#` and `spBv1.0/+/+/DBIRTH/#`
    #[default]
    Wildcard,
    /// `spBv1.0/+/NBIRTH/+`, `spBv1.0/+/NDEATH/+` and `spBv1.0/+/DBIRTH/+/+`
    Namespace,
    Custom(Vec<TopicFilter>),
}

impl From<SubscriptionConfig> for Vec<TopicFilter> {
    fn from(value: SubscriptionConfig) -> Self {
        let lifecycle = |topic: fn(MessageType) -> Topic| -> Vec<TopicFilter> {
            LIFECYCLE_MESSAGES
                .into_iter()
                .map(|message_type| TopicFilter::new_with_qos(topic(message_type), QoS::AtLeastOnce))
                .collect()
        };
        match value {
            SubscriptionConfig::Wildcard => lifecycle(Topic::Wildcard),
            SubscriptionConfig::Namespace => lifecycle(Topic::Namespace),
            SubscriptionConfig::Custom(filters) => filters,
        }
    }
}

/// How inbound lifecycle messages are handed to the notification handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Handlers run on the delivery path, one message at a time.
    #[default]
    Inline,
    /// Each node gets its own ordered worker task. Handlers for different nodes may run concurrently, handlers for the
    /// same node (and its devices) run in delivery order.
    PerNode,
}

/// Host application configuration
#[derive(Clone, Debug)]
pub struct HostConfig {
    pub host_id: String,
    pub subscriptions: SubscriptionConfig,
    pub dispatch_mode: DispatchMode,
}

impl HostConfig {
    pub fn new<S: Into<String>>(host_id: S) -> Self {
        Self {
            host_id: host_id.into(),
            subscriptions: SubscriptionConfig::default(),
            dispatch_mode: DispatchMode::default(),
        }
    }

    pub fn with_subscriptions(mut self, subscriptions: SubscriptionConfig) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_dispatch_mode(mut self, dispatch_mode: DispatchMode) -> Self {
        self.dispatch_mode = dispatch_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(config: SubscriptionConfig) -> Vec<String> {
        Vec::<TopicFilter>::from(config)
            .into_iter()
            .map(|filter| {
                assert_eq!(filter.qos, QoS::AtLeastOnce);
                String::from(filter.topic)
            })
            .collect()
    }

    #[test]
    fn wildcard_subscriptions() {
        assert_eq!(
            topics(SubscriptionConfig::Wildcard),
            vec![
                "spBv1.0/+/+/NBIRTH/#",
                "spBv1.0/+/+/NDEATH/#",
                "spBv1.0/+/+/DBIRTH/#"
            ]
        );
    }

    #[test]
    fn namespace_subscriptions() {
        assert_eq!(
            topics(SubscriptionConfig::Namespace),
            vec!["spBv1.0/+/NBIRTH/+", "spBv1.0/+/NDEATH/+", "spBv1.0/+/DBIRTH/+/+"]
        );
    }

    #[test]
    fn defaults() {
        let config = HostConfig::new("foo");
        assert_eq!(config.subscriptions, SubscriptionConfig::Wildcard);
        assert_eq!(config.dispatch_mode, DispatchMode::Inline);
    }
}
