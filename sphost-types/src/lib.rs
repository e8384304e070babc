//! Part of [sphost](https://crates.io/crates/sphost), a [Sparkplug](https://sparkplug.eclipse.org/) host application library.
//!
//! This library defines the Sparkplug topic namespace, topic parsing and the host STATE certificate codec.

pub mod constants;

pub mod topic;

pub mod state;

pub mod utils;
