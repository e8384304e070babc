//! Part of [sphost](https://crates.io/crates/sphost), a [Sparkplug](https://sparkplug.eclipse.org/) host application library.
//!
//! This library defines the transport capability a Sparkplug host is built on: the traits and types an MQTT client
//! implementation provides to the host.
//!
//! # Feature Flags
//!
//! - `channel-client`: Enables the channel based [EventLoop] and [Client] implementation. Disabled by default.
//!

mod traits;
mod types;

pub use traits::{Client, DynClient, DynEventLoop, EventLoop};
pub use types::*;

/// A basic [EventLoop] and [Client] implementation based on channels
///
/// Useful for writing tests where it is not appropriate to be running a real MQTT client and broker setup
#[cfg(any(feature = "channel-client", doc))]
pub mod channel;
