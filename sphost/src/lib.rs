//! [Sparkplug](https://sparkplug.eclipse.org/) host application framework.
//!
//! * [app] the host lifecycle, event loop and node/device notifications
//! * [client] the transport traits, with a [rumqttc](https://crates.io/crates/rumqttc) implementation
//! * [types] topics and state certificates

pub use sphost_app as app;
pub use sphost_types as types;
pub mod client {
    pub use sphost_client::*;

    pub mod mqtt_client {
        pub use sphost_client_rumqtt as rumqtt;
    }
}
