use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use super::rtp_receiver::{RetransmitTimer, RtpAudioReceiver};
use crate::protocol::rtp::{PayloadType, RtpBuffer, RtpHeader};
use crate::receiver::session::StreamParameters;

fn test_buffer() -> Arc<Mutex<RtpBuffer>> {
    Arc::new(Mutex::new(RtpBuffer::new(64, 4, Duration::from_millis(8))))
}

#[tokio::test]
async fn test_packet_reception_unencrypted() {
    let receiver_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let params = StreamParameters {
        aes_key: None,
        aes_iv: None,
        ..Default::default()
    };
    let buffer = test_buffer();

    let receiver = RtpAudioReceiver::new(Arc::new(receiver_socket), &params, buffer.clone());
    let handle = tokio::spawn(receiver.run());

    let header = RtpHeader::new_audio(123, 456, 789);
    let payload = vec![1, 2, 3, 4];

    let mut data = Vec::new();
    data.extend_from_slice(&header.encode());
    data.extend_from_slice(&payload);

    sender_socket.send_to(&data, receiver_addr).await.unwrap();

    let committed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            {
                let mut buf = buffer.lock().await;
                buf.obtain_packet(123);
                if buf.missing_sequences().is_empty() {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(committed.is_ok());

    handle.abort();
}

#[tokio::test]
async fn test_packet_reception_decrypts_with_session_cipher() {
    use aes::Aes128;
    use aes::cipher::generic_array::GenericArray;
    use aes::cipher::{BlockEncrypt, KeyInit};

    let key = [0x42u8; 16];
    let iv = [0u8; 16];

    let receiver_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let params = StreamParameters {
        aes_key: Some(key),
        aes_iv: Some(iv),
        ..Default::default()
    };
    let buffer = test_buffer();

    let receiver = RtpAudioReceiver::new(Arc::new(receiver_socket), &params, buffer.clone());
    let handle = tokio::spawn(receiver.run());

    let plaintext = [0xABu8; 16];
    let cipher = Aes128::new(GenericArray::from_slice(&key));
    let mut block = plaintext;
    for i in 0..16 {
        block[i] ^= iv[i];
    }
    let mut buf = GenericArray::clone_from_slice(&block);
    cipher.encrypt_block(&mut buf);
    let ciphertext: Vec<u8> = buf.to_vec();

    let header = RtpHeader::new_audio(1, 2, 3);
    let mut data = Vec::new();
    data.extend_from_slice(&header.encode());
    data.extend_from_slice(&ciphertext);

    sender_socket.send_to(&data, receiver_addr).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();

    let mut buf = buffer.lock().await;
    buf.obtain_packet(1);
    let next = buf.take_packet();
    assert_eq!(next, Some(plaintext.to_vec()));
}

#[tokio::test]
async fn test_retransmit_response_commits_embedded_sequence() {
    // A RetransmitResponse datagram reuses the outer 12-byte RTP header,
    // but the sequence number the sender actually resent lives at absolute
    // datagram offset 6 (inside what would otherwise be the timestamp
    // field), and the audio payload starts 4 bytes further out than it
    // would for a plain AudioData packet.
    let receiver_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let params = StreamParameters {
        aes_key: None,
        aes_iv: None,
        ..Default::default()
    };
    // priming_depth 1 so a single committed packet is playable immediately.
    let buffer = Arc::new(Mutex::new(RtpBuffer::new(64, 1, Duration::from_millis(8))));

    let receiver = RtpAudioReceiver::new(Arc::new(receiver_socket), &params, buffer.clone());
    let handle = tokio::spawn(receiver.run());

    let embedded_sequence = 1200u16;
    let mut outer = RtpHeader::new_audio(1, u32::from(embedded_sequence), 0x1234_5678);
    outer.payload_type = PayloadType::RetransmitResponse;

    let payload = vec![9u8, 9, 9, 9];
    let mut data = Vec::new();
    data.extend_from_slice(&outer.encode());
    data.extend_from_slice(&[0u8; 4]); // resent seq/timestamp prefix, ignored
    data.extend_from_slice(&payload);

    sender_socket.send_to(&data, receiver_addr).await.unwrap();

    let committed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if buffer.lock().await.stats().ready >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(committed.is_ok());

    let next = buffer.lock().await.take_packet();
    handle.abort();
    assert_eq!(next, Some(payload));
}

#[tokio::test]
async fn test_retransmit_timer_sends_nack_for_missing_sequence() {
    let control_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let control_addr = control_socket.local_addr().unwrap();
    let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let sender_addr = sender_socket.local_addr().unwrap();

    let buffer = test_buffer();
    {
        let mut buf = buffer.lock().await;
        buf.obtain_packet(5);
        buf.obtain_packet(6);
    }

    let timer = RetransmitTimer::new(Arc::new(sender_socket), buffer, control_addr)
        .with_interval(Duration::from_millis(5));
    let handle = tokio::spawn(timer.run());

    let mut datagram = [0u8; 8];
    let (len, _) = tokio::time::timeout(
        Duration::from_secs(1),
        control_socket.recv_from(&mut datagram),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(len, 8);
    assert_eq!(datagram[0], 0x80);
    assert_eq!(datagram[1], 0x80 | 0x55);

    handle.abort();
}

#[tokio::test]
async fn test_retransmit_timer_reserves_filling_slots_for_unclaimed_gaps() {
    // A gap the production pipeline discovers on its own (nothing ever
    // called `obtain_packet` for it) must still start aging toward its
    // loss deadline, or it can never be conceded as silence.
    let control_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let control_addr = control_socket.local_addr().unwrap();
    let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let buffer = test_buffer();
    {
        let mut buf = buffer.lock().await;
        buf.commit_packet(10, vec![10]).unwrap();
        buf.commit_packet(16, vec![16]).unwrap();
    }

    let timer = RetransmitTimer::new(Arc::new(sender_socket), buffer.clone(), control_addr)
        .with_interval(Duration::from_millis(5));
    let handle = tokio::spawn(timer.run());

    let mut datagram = [0u8; 8];
    tokio::time::timeout(Duration::from_secs(1), control_socket.recv_from(&mut datagram))
        .await
        .unwrap()
        .unwrap();
    handle.abort();

    let stats = buffer.lock().await.stats();
    assert!(stats.filling >= 1, "gap sequences should have been reserved as Filling slots");
}
