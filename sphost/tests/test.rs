use sphost::{
    app::{Host, HostConfig, HostLifecycleState},
    client::mqtt_client::rumqtt,
    types::topic::state_host_topic,
};

#[tokio::test]
async fn host_over_rumqtt_client() {
    let opts = rumqtt::MqttOptions::new("scada-client", "localhost", 1883);
    let (_eventloop, client) = rumqtt::EventLoop::new(opts, 10);
    let mut host = Host::new(HostConfig::new("scada"), client).unwrap();

    assert_eq!(host.will().topic, state_host_topic("scada"));
    assert_eq!(host.state(), HostLifecycleState::Uninitialized);

    //nothing to do before the host has been initialized
    host.shutdown().await.unwrap();
    assert_eq!(host.state(), HostLifecycleState::Uninitialized);
}
