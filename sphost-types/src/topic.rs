use std::fmt;

use thiserror::Error;

use crate::constants::{
    DBIRTH, DDATA, DDEATH, MULTI_LEVEL_WILDCARD, NBIRTH, NDATA, NDEATH, SINGLE_LEVEL_WILDCARD,
    SPBV01, STATE,
};

/// Error produced when a topic string is not a valid Sparkplug topic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopicError {
    #[error("Malformed sparkplug topic: {0}")]
    MalformedTopic(String),
}

fn malformed<S: Into<String>>(reason: S) -> TopicError {
    TopicError::MalformedTopic(reason.into())
}

/// MQTT Quality of Service levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl From<QoS> for u8 {
    fn from(value: QoS) -> Self {
        value as u8
    }
}

/// The message type level of a Sparkplug topic.
///
/// Message types the host does not know about are kept as [MessageType::Other] so they can be ignored
/// rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    NBirth,
    NDeath,
    NData,
    DBirth,
    DDeath,
    DData,
    State,
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::NBirth => NBIRTH,
            MessageType::NDeath => NDEATH,
            MessageType::NData => NDATA,
            MessageType::DBirth => DBIRTH,
            MessageType::DDeath => DDEATH,
            MessageType::DData => DDATA,
            MessageType::State => STATE,
            MessageType::Other(name) => name,
        }
    }

    /// Device scoped message types carry a device id as the fifth topic level
    pub fn is_device_scoped(&self) -> bool {
        matches!(
            self,
            MessageType::DBirth | MessageType::DDeath | MessageType::DData
        )
    }

    fn is_node_scoped(&self) -> bool {
        matches!(
            self,
            MessageType::NBirth | MessageType::NDeath | MessageType::NData
        )
    }
}

impl From<&str> for MessageType {
    fn from(value: &str) -> Self {
        match value {
            NBIRTH => MessageType::NBirth,
            NDEATH => MessageType::NDeath,
            NDATA => MessageType::NData,
            DBIRTH => MessageType::DBirth,
            DDEATH => MessageType::DDeath,
            DDATA => MessageType::DData,
            STATE => MessageType::State,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed Sparkplug topic.
///
/// Topics take one of the following forms:
///
/// * `spBv1.0/STATE/<host_id>`
/// * `spBv1.0/<group_id>/<message_type>/<node_id>`
/// * `spBv1.0/<group_id>/<message_type>/<node_id>/<device_id>`
///
/// For STATE topics there is no group and `node_id` holds the host id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicAddress {
    pub group_id: Option<String>,
    pub message_type: MessageType,
    pub node_id: String,
    pub device_id: Option<String>,
}

impl TopicAddress {
    pub fn namespace(&self) -> &'static str {
        SPBV01
    }

    /// Parse a topic string.
    ///
    /// The message type is taken strictly from its position in the topic, so an id that happens to contain
    /// a message type keyword is never misclassified.
    pub fn parse(topic: &str) -> Result<Self, TopicError> {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() < 3 {
            return Err(malformed(format!(
                "{topic}: expected at least 3 levels, got {}",
                parts.len()
            )));
        }
        if parts[0] != SPBV01 {
            return Err(malformed(format!("{topic}: unknown namespace {}", parts[0])));
        }

        if parts[1] == STATE {
            if parts.len() != 3 {
                return Err(malformed(format!("{topic}: STATE topics have 3 levels")));
            }
            return Ok(Self {
                group_id: None,
                message_type: MessageType::State,
                node_id: non_empty(topic, "host id", parts[2])?,
                device_id: None,
            });
        }

        let message_type = MessageType::from(parts[2]);
        let device_scoped = match parts.len() {
            4 if !message_type.is_device_scoped() => false,
            5 if !message_type.is_node_scoped() => true,
            n => {
                return Err(malformed(format!(
                    "{topic}: {n} levels is invalid for message type {message_type}"
                )))
            }
        };
        if message_type == MessageType::State {
            return Err(malformed(format!("{topic}: STATE in message type position")));
        }

        let group_id = non_empty(topic, "group id", parts[1])?;
        let node_id = non_empty(topic, "node id", parts[3])?;
        let device_id = if device_scoped {
            let device_id = non_empty(topic, "device id", parts[4])?;
            message_type.is_device_scoped().then_some(device_id)
        } else {
            None
        };

        Ok(Self {
            group_id: Some(group_id),
            message_type,
            node_id,
            device_id,
        })
    }
}

fn non_empty(topic: &str, what: &str, part: &str) -> Result<String, TopicError> {
    if part.is_empty() {
        return Err(malformed(format!("{topic}: empty {what}")));
    }
    Ok(part.to_string())
}

impl TryFrom<&str> for TopicAddress {
    type Error = TopicError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&[u8]> for TopicAddress {
    type Error = TopicError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match std::str::from_utf8(value) {
            Ok(topic) => Self::parse(topic),
            Err(e) => Err(malformed(format!("topic is not valid utf8: {e}"))),
        }
    }
}

/// The STATE topic of a host application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTopic {
    pub topic: String,
}

impl StateTopic {
    pub fn new_host(host_id: &str) -> Self {
        Self {
            topic: state_host_topic(host_id),
        }
    }
}

/// A topic that can be subscribed to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topic {
    /// The STATE topic of a single host
    State(StateTopic),
    /// `spBv1.0/+/+/<message_type>/#`
    Wildcard(MessageType),
    /// `spBv1.0/+/<message_type>/+` or `spBv1.0/+/<message_type>/+/+` for device scoped types
    Namespace(MessageType),
    /// A caller provided topic filter, used verbatim
    Raw(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::State(state_topic) => f.write_str(&state_topic.topic),
            Topic::Wildcard(message_type) => write!(
                f,
                "{SPBV01}/{SINGLE_LEVEL_WILDCARD}/{SINGLE_LEVEL_WILDCARD}/{message_type}/{MULTI_LEVEL_WILDCARD}"
            ),
            Topic::Namespace(message_type) => {
                write!(
                    f,
                    "{SPBV01}/{SINGLE_LEVEL_WILDCARD}/{message_type}/{SINGLE_LEVEL_WILDCARD}"
                )?;
                if message_type.is_device_scoped() {
                    write!(f, "/{SINGLE_LEVEL_WILDCARD}")?;
                }
                Ok(())
            }
            Topic::Raw(topic) => f.write_str(topic),
        }
    }
}

impl From<Topic> for String {
    fn from(value: Topic) -> Self {
        match value {
            Topic::State(state_topic) => state_topic.topic,
            Topic::Raw(topic) => topic,
            other => other.to_string(),
        }
    }
}

/// A topic subscription request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicFilter {
    pub topic: Topic,
    pub qos: QoS,
}

impl TopicFilter {
    pub fn new(topic: Topic) -> Self {
        Self::new_with_qos(topic, QoS::AtMostOnce)
    }

    pub fn new_with_qos(topic: Topic, qos: QoS) -> Self {
        Self { topic, qos }
    }
}

pub fn state_host_topic(host_id: &str) -> String {
    format!("{SPBV01}/{STATE}/{host_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_node_topic() {
        let address = TopicAddress::parse("spBv1.0/G1/NBIRTH/Node1").unwrap();
        assert_eq!(address.group_id.as_deref(), Some("G1"));
        assert_eq!(address.message_type, MessageType::NBirth);
        assert_eq!(address.node_id, "Node1");
        assert_eq!(address.device_id, None);
        assert_eq!(address.namespace(), "spBv1.0");
    }

    #[test]
    fn parse_device_topic() {
        let address = TopicAddress::parse("spBv1.0/G1/DBIRTH/Node1/Dev1").unwrap();
        assert_eq!(address.group_id.as_deref(), Some("G1"));
        assert_eq!(address.message_type, MessageType::DBirth);
        assert_eq!(address.node_id, "Node1");
        assert_eq!(address.device_id.as_deref(), Some("Dev1"));
    }

    #[test]
    fn parse_state_topic() {
        let address = TopicAddress::parse("spBv1.0/STATE/hostA").unwrap();
        assert_eq!(address.group_id, None);
        assert_eq!(address.message_type, MessageType::State);
        assert_eq!(address.node_id, "hostA");
        assert_eq!(address.device_id, None);
    }

    #[test]
    fn parse_ids_with_spaces_verbatim() {
        let address =
            TopicAddress::parse("spBv1.0/Sparkplug B Devices/NBIRTH/Raspberry Pi").unwrap();
        assert_eq!(address.group_id.as_deref(), Some("Sparkplug B Devices"));
        assert_eq!(address.node_id, "Raspberry Pi");
    }

    #[test]
    fn message_type_is_anchored_by_position() {
        let address = TopicAddress::parse("spBv1.0/G1/NDEATH/NBIRTH").unwrap();
        assert_eq!(address.message_type, MessageType::NDeath);
        assert_eq!(address.node_id, "NBIRTH");

        let address = TopicAddress::parse("spBv1.0/DBIRTH/NDATA/node").unwrap();
        assert_eq!(address.group_id.as_deref(), Some("DBIRTH"));
        assert_eq!(address.message_type, MessageType::NData);
    }

    #[test]
    fn unknown_message_types_are_classified_as_other() {
        let address = TopicAddress::parse("spBv1.0/G1/NCMD/Node1").unwrap();
        assert_eq!(address.message_type, MessageType::Other("NCMD".into()));
        assert_eq!(address.device_id, None);

        let address = TopicAddress::parse("spBv1.0/G1/DCMD/Node1/Dev1").unwrap();
        assert_eq!(address.message_type, MessageType::Other("DCMD".into()));
        assert_eq!(address.device_id, None);
    }

    #[test]
    fn parse_rejects_malformed_topics() {
        let invalid = [
            "spBv1.0/G1",
            "spBv1.0",
            "",
            "spAv1.0/G1/NBIRTH/Node1",
            "spBv1.0/STATE/hostA/extra",
            "spBv1.0/G1/NBIRTH",
            "spBv1.0/G1/NBIRTH/Node1/Dev1",
            "spBv1.0/G1/DBIRTH/Node1",
            "spBv1.0/G1/DDATA/Node1/Dev1/extra",
            "spBv1.0/G1/NBIRTH/",
            "spBv1.0//NBIRTH/Node1",
            "spBv1.0/G1/DBIRTH/Node1/",
            "spBv1.0/STATE/",
            "spBv1.0/G1/STATE/Node1",
        ];
        for topic in invalid {
            assert!(
                matches!(TopicAddress::parse(topic), Err(TopicError::MalformedTopic(_))),
                "{topic} should be malformed"
            );
        }
    }

    #[test]
    fn parse_rejects_non_utf8_topics() {
        let bytes: &[u8] = &[b's', b'p', 0xff, b'/'];
        assert!(TopicAddress::try_from(bytes).is_err());
    }

    #[test]
    fn topic_filter_strings() {
        assert_eq!(
            String::from(Topic::State(StateTopic::new_host("host"))),
            "spBv1.0/STATE/host"
        );
        assert_eq!(
            String::from(Topic::Wildcard(MessageType::NBirth)),
            "spBv1.0/+/+/NBIRTH/#"
        );
        assert_eq!(
            String::from(Topic::Namespace(MessageType::NDeath)),
            "spBv1.0/+/NDEATH/+"
        );
        assert_eq!(
            String::from(Topic::Namespace(MessageType::DBirth)),
            "spBv1.0/+/DBIRTH/+/+"
        );
        assert_eq!(String::from(Topic::Raw("spBv1.0/#".into())), "spBv1.0/#");
    }

    #[test]
    fn qos_levels() {
        assert_eq!(u8::from(QoS::AtMostOnce), 0);
        assert_eq!(u8::from(QoS::AtLeastOnce), 1);
        assert_eq!(u8::from(QoS::ExactlyOnce), 2);
    }
}
