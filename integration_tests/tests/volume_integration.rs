//! `SET_PARAMETER` volume handling over a live session.

mod common;

use airtunes_receiver::{AirPlayReceiver, ReceiverEvent};
use airtunes_receiver::testing::{MockSender, MockSenderConfig};
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn set_parameter_volume_is_accepted_mid_session() {
    common::init_logging();

    let mut receiver = AirPlayReceiver::new(common::test_config());
    let mut events = receiver.subscribe();
    receiver.start().await.expect("receiver should start");

    let port = timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ReceiverEvent::Started { port, .. }) = events.recv().await {
                return port;
            }
        }
    })
    .await
    .expect("receiver should emit Started");

    let mut sender = MockSender::new(MockSenderConfig {
        receiver_addr: format!("127.0.0.1:{port}").parse().unwrap(),
        ..Default::default()
    });
    sender.connect().await.expect("tcp connect");
    sender.announce().await.expect("ANNOUNCE");
    sender.setup().await.expect("SETUP");
    sender.record().await.expect("RECORD");

    let response = sender.set_volume(-20.0).await.expect("SET_PARAMETER");
    assert_eq!(response.status.0, 200);

    let muted = sender.set_volume(-144.0).await.expect("SET_PARAMETER mute");
    assert_eq!(muted.status.0, 200);

    sender.teardown().await.expect("TEARDOWN");
    receiver.stop().await.expect("receiver should stop");
}
