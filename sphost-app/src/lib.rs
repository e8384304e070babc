//! Part of [sphost](https://crates.io/crates/sphost), a [Sparkplug](https://sparkplug.eclipse.org/) host application library.
//!
//! This library implements the lifecycle of a Sparkplug Host Application: announcing the host's presence on its STATE
//! topic and observing node and device birth and death messages.

mod config;
mod dispatch;
mod error;
mod eventloop;
mod host;

pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use eventloop::HostEventLoop;
pub use host::{Host, HostLifecycleState};
pub use serde_json::Value;

/// Used to uniquely identify a node
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct NodeIdentifier {
    pub group: String,
    pub node: String,
}
