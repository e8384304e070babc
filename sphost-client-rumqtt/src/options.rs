use std::time::Duration;

use rumqttc::v5::{mqttbytes::v5::ConnectProperties, MqttOptions as RuMqttOptions};

pub struct ConnectionProperties {
    pub receive_maximum: Option<u16>,
    pub max_packet_size: Option<u32>,
}

/// Broker connection options.
pub struct MqttOptions {
    pub broker_addr: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub credentials: Option<(String, String)>,
    pub connect_properties: Option<ConnectionProperties>,
}

impl MqttOptions {
    pub fn new<S: Into<String>, S1: Into<String>>(client_id: S, addr: S1, port: u16) -> Self {
        Self {
            broker_addr: addr.into(),
            port,
            client_id: client_id.into(),
            keep_alive: Duration::from_secs(30),
            credentials: None,
            connect_properties: None,
        }
    }

    pub fn with_credentials<S: Into<String>, S1: Into<String>>(
        mut self,
        username: S,
        password: S1,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_connection_properties(mut self, properties: ConnectionProperties) -> Self {
        self.connect_properties = Some(properties);
        self
    }
}

impl From<MqttOptions> for RuMqttOptions {
    fn from(value: MqttOptions) -> Self {
        let mut options = RuMqttOptions::new(value.client_id, value.broker_addr, value.port);
        options.set_keep_alive(value.keep_alive);
        if let Some((username, password)) = value.credentials {
            options.set_credentials(username, password);
        }

        let mut connection_properties = ConnectProperties::new();
        if let Some(props) = value.connect_properties {
            connection_properties.receive_maximum = props.receive_maximum;
            connection_properties.max_packet_size = props.max_packet_size;
        }
        /* Sparkplug requires session expiry interval to be 0 */
        connection_properties.session_expiry_interval = Some(0);

        options
            .set_clean_start(true)
            .set_connect_properties(connection_properties);
        options
    }
}
