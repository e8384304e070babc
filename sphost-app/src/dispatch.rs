use std::sync::Arc;

use log::trace;
use serde_json::Value;
use sphost_types::{
    state::StateCertificate,
    topic::{MessageType, TopicAddress},
};

use crate::{error::DispatchError, NodeIdentifier};

/// Callbacks invoked for node and device lifecycle messages.
///
/// Every method defaults to doing nothing so implementations only override what they care about.
pub trait NodeDeviceNotification {
    fn on_node_birth(&self, _node: &NodeIdentifier, _payload: &Value) {}

    fn on_node_death(&self, _node: &NodeIdentifier, _payload: &Value) {}

    fn on_device_birth(&self, _node: &NodeIdentifier, _device_id: &str, _payload: &Value) {}

    /// Called for every STATE certificate received, including the host's own.
    fn on_host_state(&self, _host_id: &str, _certificate: &StateCertificate) {}
}

impl<T: NodeDeviceNotification + ?Sized> NodeDeviceNotification for Arc<T> {
    fn on_node_birth(&self, node: &NodeIdentifier, payload: &Value) {
        (**self).on_node_birth(node, payload)
    }

    fn on_node_death(&self, node: &NodeIdentifier, payload: &Value) {
        (**self).on_node_death(node, payload)
    }

    fn on_device_birth(&self, node: &NodeIdentifier, device_id: &str, payload: &Value) {
        (**self).on_device_birth(node, device_id, payload)
    }

    fn on_host_state(&self, host_id: &str, certificate: &StateCertificate) {
        (**self).on_host_state(host_id, certificate)
    }
}

/// A [NodeDeviceNotification] that ignores everything.
pub struct NoNotification;

impl NodeDeviceNotification for NoNotification {}

/// An inbound message classified by its topic with its payload decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    NodeBirth {
        node: NodeIdentifier,
        payload: Value,
    },
    NodeDeath {
        node: NodeIdentifier,
        payload: Value,
    },
    DeviceBirth {
        node: NodeIdentifier,
        device_id: String,
        payload: Value,
    },
    HostState {
        host_id: String,
        certificate: StateCertificate,
    },
    /// A valid Sparkplug message the host has no interest in
    Ignored(TopicAddress),
}

impl Routed {
    /// The node a message belongs to, if any.
    pub fn node(&self) -> Option<&NodeIdentifier> {
        match self {
            Routed::NodeBirth { node, .. }
            | Routed::NodeDeath { node, .. }
            | Routed::DeviceBirth { node, .. } => Some(node),
            Routed::HostState { .. } | Routed::Ignored(_) => None,
        }
    }
}

fn json_payload(address: &TopicAddress, payload: &[u8]) -> Result<Value, DispatchError> {
    serde_json::from_slice(payload).map_err(|e| {
        DispatchError::MalformedPayload(format!("{} payload: {e}", address.message_type))
    })
}

/// Routes inbound messages to a [NodeDeviceNotification] handler.
pub struct Dispatcher {
    handler: Box<dyn NodeDeviceNotification + Send + Sync>,
}

impl Dispatcher {
    pub fn new<H: NodeDeviceNotification + Send + Sync + 'static>(handler: H) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Classify a message by its topic and decode its payload.
    ///
    /// Payloads of message types the host does not handle are never inspected.
    pub fn route(topic: &[u8], payload: &[u8]) -> Result<Routed, DispatchError> {
        let address = TopicAddress::try_from(topic)?;
        let node = |address: &TopicAddress| NodeIdentifier {
            group: address.group_id.clone().unwrap_or_default(),
            node: address.node_id.clone(),
        };

        let routed = match &address.message_type {
            MessageType::NBirth => Routed::NodeBirth {
                node: node(&address),
                payload: json_payload(&address, payload)?,
            },
            MessageType::NDeath => Routed::NodeDeath {
                node: node(&address),
                payload: json_payload(&address, payload)?,
            },
            MessageType::DBirth => Routed::DeviceBirth {
                node: node(&address),
                device_id: address.device_id.clone().unwrap_or_default(),
                payload: json_payload(&address, payload)?,
            },
            MessageType::State => Routed::HostState {
                certificate: StateCertificate::decode(payload)?,
                host_id: address.node_id,
            },
            _ => Routed::Ignored(address),
        };
        Ok(routed)
    }

    /// Hand a routed message to the handler.
    pub fn deliver(&self, routed: Routed) {
        match routed {
            Routed::NodeBirth { node, payload } => self.handler.on_node_birth(&node, &payload),
            Routed::NodeDeath { node, payload } => self.handler.on_node_death(&node, &payload),
            Routed::DeviceBirth {
                node,
                device_id,
                payload,
            } => self.handler.on_device_birth(&node, &device_id, &payload),
            Routed::HostState {
                host_id,
                certificate,
            } => self.handler.on_host_state(&host_id, &certificate),
            Routed::Ignored(address) => trace!("Ignoring {} message", address.message_type),
        }
    }

    pub fn dispatch(&self, topic: &[u8], payload: &[u8]) -> Result<(), DispatchError> {
        let routed = Self::route(topic, payload)?;
        self.deliver(routed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NodeDeviceNotification for Recorder {
        fn on_node_birth(&self, node: &NodeIdentifier, _payload: &Value) {
            self.record(format!("nbirth {}/{}", node.group, node.node));
        }

        fn on_node_death(&self, node: &NodeIdentifier, _payload: &Value) {
            self.record(format!("ndeath {}/{}", node.group, node.node));
        }

        fn on_device_birth(&self, node: &NodeIdentifier, device_id: &str, _payload: &Value) {
            self.record(format!("dbirth {}/{}/{device_id}", node.group, node.node));
        }

        fn on_host_state(&self, host_id: &str, certificate: &StateCertificate) {
            self.record(format!("state {host_id} {}", certificate.online));
        }
    }

    fn node(group: &str, node: &str) -> NodeIdentifier {
        NodeIdentifier {
            group: group.into(),
            node: node.into(),
        }
    }

    #[test]
    fn routes_node_birth() {
        let routed =
            Dispatcher::route(b"spBv1.0/G1/NBIRTH/Node1", br#"{"seq":0,"metrics":[]}"#).unwrap();
        assert_eq!(
            routed,
            Routed::NodeBirth {
                node: node("G1", "Node1"),
                payload: json!({"seq": 0, "metrics": []})
            }
        );
    }

    #[test]
    fn routes_device_birth() {
        let routed = Dispatcher::route(b"spBv1.0/G1/DBIRTH/Node1/Dev1", b"{}").unwrap();
        assert_eq!(
            routed,
            Routed::DeviceBirth {
                node: node("G1", "Node1"),
                device_id: "Dev1".into(),
                payload: json!({})
            }
        );
    }

    #[test]
    fn routes_host_state() {
        let routed = Dispatcher::route(
            b"spBv1.0/STATE/scada",
            br#"{"online":false,"timestamp":42}"#,
        )
        .unwrap();
        assert_eq!(
            routed,
            Routed::HostState {
                host_id: "scada".into(),
                certificate: StateCertificate::new_with_timestamp(false, 42)
            }
        );
        assert_eq!(routed.node(), None);
    }

    #[test]
    fn unhandled_types_are_ignored_without_reading_payload() {
        for topic in [
            "spBv1.0/G1/NDATA/Node1",
            "spBv1.0/G1/DDATA/Node1/Dev1",
            "spBv1.0/G1/DDEATH/Node1/Dev1",
            "spBv1.0/G1/NCMD/Node1",
        ] {
            let routed = Dispatcher::route(topic.as_bytes(), b"\x00not json").unwrap();
            assert!(matches!(routed, Routed::Ignored(_)), "{topic}");
        }
    }

    #[test]
    fn malformed_topics_are_errors() {
        assert!(matches!(
            Dispatcher::route(b"spBv1.0/G1", b"{}"),
            Err(DispatchError::MalformedTopic(_))
        ));
        assert!(matches!(
            Dispatcher::route(b"spBv1.0/G1/\xff/N", b"{}"),
            Err(DispatchError::MalformedTopic(_))
        ));
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(
            Dispatcher::route(b"spBv1.0/G1/NBIRTH/Node1", b"{"),
            Err(DispatchError::MalformedPayload(_))
        ));
        assert!(matches!(
            Dispatcher::route(b"spBv1.0/STATE/scada", br#"{"timestamp":1}"#),
            Err(DispatchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn node_death_invokes_only_node_death() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone());
        dispatcher
            .dispatch(b"spBv1.0/G1/NDEATH/Node1", br#"{"bdSeq":3}"#)
            .unwrap();
        assert_eq!(recorder.calls(), vec!["ndeath G1/Node1"]);
    }

    #[test]
    fn ids_matching_message_types_route_by_position() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone());
        dispatcher
            .dispatch(b"spBv1.0/G1/NDEATH/NBIRTH", b"{}")
            .unwrap();
        dispatcher
            .dispatch(b"spBv1.0/NDEATH/DBIRTH/NBIRTH/NDEATH", b"{}")
            .unwrap();
        assert_eq!(
            recorder.calls(),
            vec!["ndeath G1/NBIRTH", "dbirth NDEATH/NBIRTH/NDEATH"]
        );
    }

    #[test]
    fn failed_dispatch_invokes_nothing() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone());
        assert!(dispatcher
            .dispatch(b"spBv1.0/G1/NBIRTH/Node1", b"garbage")
            .is_err());
        assert!(recorder.calls().is_empty());
    }
}
