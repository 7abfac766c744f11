use super::*;
use crate::audio::output::NullSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn pcm_format() -> AudioFormat {
    AudioFormat::CD_QUALITY
}

#[test]
fn pcm_decoder_swaps_byte_order() {
    let mut decoder = PcmDecoder;
    // Big-endian 0x0102 -> little-endian bytes [0x02, 0x01]
    let decoded = decoder.decode(&[0x01, 0x02, 0xFF, 0x00]).unwrap();
    assert_eq!(decoded, vec![0x02, 0x01, 0x00, 0xFF]);
}

#[test]
fn pcm_decoder_rejects_odd_length() {
    let mut decoder = PcmDecoder;
    assert!(matches!(
        decoder.decode(&[0x01, 0x02, 0x03]),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn default_decoder_for_pcm_is_some_and_alac_is_none() {
    assert!(default_decoder_for(AudioCodec::Pcm).is_some());
    assert!(default_decoder_for(AudioCodec::Alac).is_none());
    assert!(default_decoder_for(AudioCodec::AacLc).is_none());
}

#[test]
fn audio_format_from_stream_params() {
    let params = StreamParameters {
        channels: 1,
        bits_per_sample: 24,
        sample_rate: 48000,
        ..Default::default()
    };
    let format = audio_format_from(&params);
    assert_eq!(format.channels, ChannelConfig::Mono);
    assert_eq!(format.sample_format, SampleFormat::I24);
    assert_eq!(format.sample_rate, SampleRate::Hz48000);
}

#[tokio::test]
async fn play_packet_writes_decoded_pcm_to_sink() {
    let buffer = Arc::new(Mutex::new(RtpBuffer::new(8, 1, Duration::from_millis(8))));
    let mut player = Player::new(
        buffer,
        Box::new(PcmDecoder),
        Box::new(NullSink::new()),
        pcm_format(),
    );
    player.open(None).unwrap();

    player.play_packet(&[0x00, 0x01, 0x00, 0x02]).unwrap();
}

#[tokio::test]
async fn play_packet_conceals_empty_slot_as_silence() {
    let buffer = Arc::new(Mutex::new(RtpBuffer::new(8, 1, Duration::from_millis(8))));
    let mut player = Player::new(
        buffer,
        Box::new(PcmDecoder),
        Box::new(NullSink::new()),
        pcm_format(),
    );
    player.open(None).unwrap();

    // Empty payload: concealment path, never reaches the decoder.
    player.play_packet(&[]).unwrap();
}

#[tokio::test]
async fn run_drains_buffer_until_aborted() {
    let buffer = Arc::new(Mutex::new(RtpBuffer::new(8, 1, Duration::from_millis(8))));
    {
        let mut b = buffer.lock().await;
        b.commit_packet(0, vec![0x00, 0x01, 0x00, 0x02]).unwrap();
    }

    let player = Player::new(
        buffer.clone(),
        Box::new(PcmDecoder),
        Box::new(NullSink::new()),
        pcm_format(),
    )
    .with_poll_interval(Duration::from_millis(1));

    let handle = tokio::spawn(player.run());
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.abort();
}
