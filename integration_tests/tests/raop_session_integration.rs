//! Full RTSP/RTP session lifecycle against a real receiver, driven by
//! `MockSender`.

mod common;

use airtunes_receiver::{AirPlayReceiver, ReceiverEvent};
use airtunes_receiver::testing::{MockCodec, MockSender, MockSenderConfig};
use std::time::Duration;
use tokio::time::timeout;

async fn start_test_receiver() -> (AirPlayReceiver, u16) {
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

    (receiver, port)
}

#[tokio::test]
async fn full_session_lifecycle_pcm() {
    common::init_logging();
    let (mut receiver, port) = start_test_receiver().await;

    let mut sender = MockSender::new(MockSenderConfig {
        receiver_addr: format!("127.0.0.1:{port}").parse().unwrap(),
        codec: MockCodec::Pcm,
        encrypted: false,
        sample_rate: 44100,
        frames_per_packet: 352,
    });

    sender.connect().await.expect("tcp connect");

    let options = sender.options().await.expect("OPTIONS");
    assert_eq!(options.status.0, 200);

    let announce = sender.announce().await.expect("ANNOUNCE");
    assert_eq!(announce.status.0, 200);

    let setup = sender.setup().await.expect("SETUP");
    assert_eq!(setup.status.0, 200);
    assert!(setup.headers.get("Transport").is_some());

    let record = sender.record().await.expect("RECORD");
    assert_eq!(record.status.0, 200);

    for _ in 0..10 {
        let frame = vec![0u8; 352 * 2];
        sender.send_audio(&frame).await.expect("send audio");
    }
    sender.send_sync().await.expect("send sync");

    let teardown = sender.teardown().await.expect("TEARDOWN");
    assert_eq!(teardown.status.0, 200);

    receiver.stop().await.expect("receiver should stop");
}

#[tokio::test]
async fn options_before_announce_is_allowed() {
    common::init_logging();
    let (mut receiver, port) = start_test_receiver().await;

    let mut sender = MockSender::new(MockSenderConfig {
        receiver_addr: format!("127.0.0.1:{port}").parse().unwrap(),
        ..Default::default()
    });
    sender.connect().await.expect("tcp connect");

    let response = sender.options().await.expect("OPTIONS");
    assert_eq!(response.status.0, 200);
    assert!(response.headers.get("Public").is_some());

    receiver.stop().await.expect("receiver should stop");
}
