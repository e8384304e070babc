use log::{error, info, LevelFilter};
use sphost::app::{Host, HostConfig, NodeDeviceNotification, NodeIdentifier, Value};
use sphost::client::mqtt_client::rumqtt;
use sphost::types::state::StateCertificate;

struct LogNotifications;

impl NodeDeviceNotification for LogNotifications {
    fn on_node_birth(&self, node: &NodeIdentifier, payload: &Value) {
        info!("Node {node:?} born: {payload}");
    }

    fn on_node_death(&self, node: &NodeIdentifier, payload: &Value) {
        info!("Node {node:?} death: {payload}");
    }

    fn on_device_birth(&self, node: &NodeIdentifier, device_id: &str, payload: &Value) {
        info!("Device {device_id} Node {node:?} born: {payload}");
    }

    fn on_host_state(&self, host_id: &str, certificate: &StateCertificate) {
        info!("Host {host_id} online={} at {}", certificate.online, certificate.timestamp);
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    let opts = rumqtt::MqttOptions::new("sample-host", "localhost", 1883);
    let (eventloop, client) = rumqtt::EventLoop::new(opts, 10);
    let mut host = match Host::new(HostConfig::new("foo"), client) {
        Ok(host) => host,
        Err(e) => {
            error!("Unable to create host: {e}");
            return;
        }
    };

    let mut events = host.event_loop(eventloop, LogNotifications);
    let driver = tokio::spawn(async move { events.run().await });

    if let Err(e) = host.initialize().await {
        error!("Host failed to come online: {e}");
        return;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        info!("Failed to register CTRL-C handler: {e}");
    }

    if let Err(e) = host.shutdown().await {
        error!("Host did not shut down cleanly: {e}");
    }
    drop(host);
    _ = driver.await;
}
