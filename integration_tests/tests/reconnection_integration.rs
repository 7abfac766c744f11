//! The receiver must accept a fresh session after a prior one tears down,
//! and must be restartable after `stop()`.

mod common;

use airtunes_receiver::{AirPlayReceiver, ReceiverEvent};
use airtunes_receiver::testing::{MockSender, MockSenderConfig};
use std::time::Duration;
use tokio::time::timeout;

async fn wait_for_start(events: &mut tokio::sync::broadcast::Receiver<ReceiverEvent>) -> u16 {
    timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ReceiverEvent::Started { port, .. }) = events.recv().await {
                return port;
            }
        }
    })
    .await
    .expect("receiver should emit Started")
}

async fn wait_for_stop(events: &mut tokio::sync::broadcast::Receiver<ReceiverEvent>) {
    timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ReceiverEvent::Stopped) = events.recv().await {
                return;
            }
        }
    })
    .await
    .expect("receiver should emit Stopped")
}

#[tokio::test]
async fn back_to_back_sessions_on_same_receiver() {
    common::init_logging();

    let mut receiver = AirPlayReceiver::new(common::test_config());
    let mut events = receiver.subscribe();
    receiver.start().await.expect("receiver should start");
    let port = wait_for_start(&mut events).await;

    for _ in 0..2 {
        let mut sender = MockSender::new(MockSenderConfig {
            receiver_addr: format!("127.0.0.1:{port}").parse().unwrap(),
            ..Default::default()
        });
        sender.connect().await.expect("tcp connect");
        sender.announce().await.expect("ANNOUNCE");
        sender.setup().await.expect("SETUP");
        sender.record().await.expect("RECORD");
        sender.send_audio(&vec![0u8; 704]).await.expect("send audio");
        let teardown = sender.teardown().await.expect("TEARDOWN");
        assert_eq!(teardown.status.0, 200);
    }

    receiver.stop().await.expect("receiver should stop");
}

#[tokio::test]
async fn receiver_restarts_after_stop() {
    common::init_logging();

    let mut receiver = AirPlayReceiver::new(common::test_config());
    let mut events = receiver.subscribe();
    receiver.start().await.expect("first start");
    let _ = wait_for_start(&mut events).await;
    receiver.stop().await.expect("stop");
    wait_for_stop(&mut events).await;

    let mut events = receiver.subscribe();
    receiver.start().await.expect("second start");
    let port = wait_for_start(&mut events).await;
    assert!(port > 0);

    receiver.stop().await.expect("final stop");
}
