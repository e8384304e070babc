use sphost_client::ClientError;
use sphost_types::{state::CertificateError, topic::TopicError};
use thiserror::Error;

use crate::HostLifecycleState;

/// The transport operation a [HostError::Transport] failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOperation {
    Connect,
    Subscribe,
    Publish,
    Disconnect,
}

#[derive(Error, Debug, PartialEq)]
pub enum HostError {
    #[error("Invalid host id: {0}")]
    InvalidHostId(String),
    #[error("Operation not permitted while the host is {0:?}")]
    InvalidState(HostLifecycleState),
    #[error("{operation:?} failed: {source}")]
    Transport {
        operation: TransportOperation,
        source: ClientError,
    },
}

impl HostError {
    pub(crate) fn transport(operation: TransportOperation) -> impl FnOnce(ClientError) -> Self {
        move |source| HostError::Transport { operation, source }
    }
}

/// Errors produced while routing an inbound message.
#[derive(Error, Debug, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    MalformedTopic(#[from] TopicError),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<CertificateError> for DispatchError {
    fn from(value: CertificateError) -> Self {
        match value {
            CertificateError::MalformedPayload(reason) => DispatchError::MalformedPayload(reason),
        }
    }
}
