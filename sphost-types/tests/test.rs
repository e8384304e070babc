use sphost_types::{
    state::{self, StateCertificate},
    topic::{state_host_topic, MessageType, TopicAddress},
};

#[test]
pub fn state_topic_parses_back_to_host() {
    for host_id in ["foo", "host-1", "My Host"] {
        let topic = state_host_topic(host_id);
        let address = TopicAddress::parse(&topic).unwrap();
        assert_eq!(address.message_type, MessageType::State);
        assert_eq!(address.node_id, host_id);
    }
}

#[test]
pub fn certificate_bytes_decode() {
    let cert = StateCertificate::offline();
    let bytes: Vec<u8> = cert.into();
    let decoded = StateCertificate::try_from(bytes.as_slice()).unwrap();
    assert_eq!(cert, decoded);
    assert!(state::decode(b"{}").is_err());
}
