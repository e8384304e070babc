//! Part of [sphost](https://crates.io/crates/sphost), a [Sparkplug](https://sparkplug.eclipse.org/) host application library.
//!
//! A [sphost_client::Client] and [sphost_client::EventLoop] implementation using [rumqttc] MQTT v5.

mod client;
mod options;

pub use client::{Client, EventLoop};
pub use options::{ConnectionProperties, MqttOptions};
