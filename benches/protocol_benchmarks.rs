//! Wire-format throughput benchmarks: RTSP framing, RTP headers, and the
//! per-packet AES-128-CBC session cipher.

use airtunes_receiver::protocol::raop::AesSession;
use airtunes_receiver::protocol::rtp::{RetransmitRequest, RtpHeader};
use airtunes_receiver::protocol::rtsp::server_codec::{RtspServerCodec, encode_response};
use airtunes_receiver::protocol::rtsp::ResponseBuilder;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn rtsp_request_decode_benchmark(c: &mut Criterion) {
    let request = b"ANNOUNCE rtsp://127.0.0.1/1234 RTSP/1.0\r\n\
CSeq: 2\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 120\r\n\
\r\n\
v=0\r\no=iTunes 0 0 IN IP4 127.0.0.1\r\ns=iTunes\r\nc=IN IP4 127.0.0.1\r\nt=0 0\r\n\
m=audio 0 RTP/AVP 96\r\na=rtpmap:96 L16/44100/2\r\n";

    c.bench_function("rtsp_decode_announce", |b| {
        b.iter(|| {
            let mut codec = RtspServerCodec::new();
            codec.feed(black_box(request));
            let _ = black_box(codec.decode());
        });
    });
}

fn rtsp_response_encode_benchmark(c: &mut Criterion) {
    let response = ResponseBuilder::ok()
        .cseq(2)
        .header("Audio-Jack-Status", "connected; type=analog")
        .build();

    c.bench_function("rtsp_encode_response", |b| {
        b.iter(|| {
            let _ = black_box(encode_response(black_box(&response)));
        });
    });
}

fn rtp_header_codec_benchmark(c: &mut Criterion) {
    let header = RtpHeader::new_audio(1, 352, 0x1234_5678);
    let encoded = header.encode();

    let mut group = c.benchmark_group("rtp_header");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode", |b| {
        b.iter(|| black_box(header.encode()));
    });

    group.bench_function("decode", |b| {
        b.iter(|| black_box(RtpHeader::decode(black_box(&encoded))).unwrap());
    });

    group.finish();
}

fn retransmit_request_codec_benchmark(c: &mut Criterion) {
    let request = RetransmitRequest { first_missing: 10, count: 5 };
    let encoded = request.encode();

    c.bench_function("retransmit_request_roundtrip", |b| {
        b.iter(|| {
            let encoded = black_box(request).encode();
            let _ = black_box(RetransmitRequest::decode(black_box(&encoded)));
        });
    });

    c.bench_function("retransmit_request_decode", |b| {
        b.iter(|| black_box(RetransmitRequest::decode(black_box(&encoded))).unwrap());
    });
}

fn aes_session_decrypt_benchmark(c: &mut Criterion) {
    let key = [0u8; 16];
    let iv = [0u8; 16];
    let session = AesSession::new(key, iv);

    let size = 4096;
    let mut group = c.benchmark_group("aes_session");
    group.throughput(Throughput::Bytes(size as u64));

    group.bench_function("decrypt_4k", |b| {
        let mut payload = vec![0u8; size];
        b.iter(|| {
            session.decrypt(black_box(&mut payload));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    rtsp_request_decode_benchmark,
    rtsp_response_encode_benchmark,
    rtp_header_codec_benchmark,
    retransmit_request_codec_benchmark,
    aes_session_decrypt_benchmark,
);
criterion_main!(benches);
