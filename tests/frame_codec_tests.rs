use rand::Rng;
use skein::constants::{FRAME_FIXED_HEADER_SIZE, PROTOCOL_VERSION};
use skein::frame::{
    FrameCodec, FrameDecodeError, FrameEncodeError, FrameMeta, RequestFrame, ResponseFrame,
};

fn sample_request(payload: Vec<u8>) -> RequestFrame {
    let mut request = RequestFrame::new(42, "echo", "Get", payload);
    request.compressor_code = 1;
    request.serializer_code = 2;
    request.meta.insert("deadline", "1700000000000");
    request.meta.insert("trace", "abc");
    request
}

#[test]
fn test_request_round_trip() {
    let mut request = sample_request(b"{\"id\":1}".to_vec());
    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");

    assert_eq!(bytes.len(), request.frame_len());
    assert_eq!(
        request.header_length as usize,
        FRAME_FIXED_HEADER_SIZE
            + "echo".len()
            + 1
            + "Get".len()
            + 1
            + ("deadline".len() + "1700000000000".len() + 2)
            + ("trace".len() + "abc".len() + 2)
    );

    let decoded = FrameCodec::decode_request(&bytes).expect("decode failed");
    assert_eq!(decoded, request);
    assert_eq!(decoded.version, PROTOCOL_VERSION);
}

#[test]
fn test_fixed_header_is_big_endian() {
    let mut request = RequestFrame::new(0x0102_0304, "s", "m", vec![9, 9, 9]);
    request.compressor_code = 7;
    request.serializer_code = 8;
    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");

    let header_length = (FRAME_FIXED_HEADER_SIZE + 4) as u32;
    assert_eq!(&bytes[0..4], &header_length.to_be_bytes());
    assert_eq!(&bytes[4..8], &3u32.to_be_bytes());
    assert_eq!(&bytes[8..12], &[1, 2, 3, 4]);
    assert_eq!(bytes[12], PROTOCOL_VERSION);
    assert_eq!(bytes[13], 7);
    assert_eq!(bytes[14], 8);
    assert_eq!(&bytes[15..19], b"s\nm\n");
    assert_eq!(&bytes[19..], &[9, 9, 9]);
}

#[test]
fn test_empty_payload_and_absent_meta() {
    let mut request = RequestFrame::new(1, "svc", "Ping", Vec::new());
    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");
    let decoded = FrameCodec::decode_request(&bytes).expect("decode failed");

    assert_eq!(decoded.body_length, 0);
    assert!(decoded.payload.is_empty());
    assert!(decoded.meta.is_empty());
    assert_eq!(decoded.meta, FrameMeta::new());
}

#[test]
fn test_separator_bytes_in_payload_are_not_meta() {
    let payload = b"\n\rkey\rvalue\n\n\r".to_vec();
    let mut request = sample_request(payload.clone());
    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");
    let decoded = FrameCodec::decode_request(&bytes).expect("decode failed");

    assert_eq!(decoded.payload, payload);
    assert_eq!(decoded.meta.len(), 2);
    assert_eq!(decoded.meta.get("trace"), Some("abc"));
}

#[test]
fn test_random_payloads_survive() {
    let mut rng = rand::rng();
    for _ in 0..64 {
        let len = rng.random_range(0..4096);
        let payload: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        let mut request = sample_request(payload.clone());
        let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");
        let decoded = FrameCodec::decode_request(&bytes).expect("decode failed");
        assert_eq!(decoded.payload, payload);
    }
}

#[test]
fn test_lengths_recomputed_before_encode() {
    let mut request = RequestFrame::new(5, "a", "b", vec![1]);
    request.header_length = 9999;
    request.body_length = 9999;
    request.payload = vec![1, 2, 3, 4, 5];
    request.meta.insert("k", "v");

    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");
    assert_eq!(request.body_length, 5);
    assert_eq!(request.header_length as usize, FRAME_FIXED_HEADER_SIZE + 4 + 4);
    assert_eq!(bytes.len(), request.frame_len());
}

#[test]
fn test_encode_rejects_separators_in_names_and_meta() {
    let mut request = RequestFrame::new(1, "bad\nname", "m", Vec::new());
    assert_eq!(
        FrameCodec::encode_request(&mut request),
        Err(FrameEncodeError::SeparatorInField {
            field: "service name"
        })
    );

    let mut request = RequestFrame::new(1, "s", "m", Vec::new());
    request.meta.insert("key", "a\rb");
    assert_eq!(
        FrameCodec::encode_request(&mut request),
        Err(FrameEncodeError::SeparatorInField {
            field: "metadata value"
        })
    );
}

#[test]
fn test_decode_rejects_truncated_buffers() {
    let mut request = sample_request(vec![1, 2, 3]);
    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");

    assert!(matches!(
        FrameCodec::decode_request(&bytes[..10]),
        Err(FrameDecodeError::IncompleteHeader { .. })
    ));
    assert!(matches!(
        FrameCodec::decode_request(&bytes[..bytes.len() - 1]),
        Err(FrameDecodeError::LengthMismatch { .. })
    ));
}

#[test]
fn test_decode_rejects_corrupt_meta() {
    // Hand-built header whose only meta record lacks a field separator.
    let header = b"s\nm\nnovalue\n";
    let header_length = (FRAME_FIXED_HEADER_SIZE + header.len()) as u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&header_length.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(&[PROTOCOL_VERSION, 0, 1]);
    bytes.extend_from_slice(header);

    assert_eq!(
        FrameCodec::decode_request(&bytes),
        Err(FrameDecodeError::CorruptMeta)
    );
}

#[test]
fn test_decode_rejects_missing_method_separator() {
    let header = b"svc\nmethod";
    let header_length = (FRAME_FIXED_HEADER_SIZE + header.len()) as u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&header_length.to_be_bytes());
    bytes.extend_from_slice(&2u32.to_be_bytes());
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(&[PROTOCOL_VERSION, 0, 1]);
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(b"\n\n");

    assert_eq!(
        FrameCodec::decode_request(&bytes),
        Err(FrameDecodeError::MissingSeparator("method name"))
    );
    assert_eq!(FrameCodec::peek_message_id(&bytes), Some(1));
}

#[test]
fn test_response_round_trip_success_and_error() {
    let request = sample_request(Vec::new());

    let mut ok = ResponseFrame::for_request(&request).with_payload(vec![0, 1, 2]);
    let bytes = FrameCodec::encode_response(&mut ok).expect("encode failed");
    let decoded = FrameCodec::decode_response(&bytes).expect("decode failed");
    assert_eq!(decoded, ok);
    assert_eq!(decoded.message_id, 42);
    assert_eq!(decoded.serializer_code, 2);
    assert!(!decoded.is_error());

    let mut failed = ResponseFrame::for_request(&request)
        .with_payload(vec![7])
        .with_error("service not found");
    let bytes = FrameCodec::encode_response(&mut failed).expect("encode failed");
    let decoded = FrameCodec::decode_response(&bytes).expect("decode failed");
    assert_eq!(decoded.error_text().as_deref(), Some("service not found"));
    assert!(decoded.payload.is_empty());
    assert_eq!(
        decoded.header_length as usize,
        FRAME_FIXED_HEADER_SIZE + "service not found".len()
    );
}

#[test]
fn test_frame_length_from_prefix() {
    let mut request = sample_request(vec![0; 100]);
    let bytes = FrameCodec::encode_request(&mut request).expect("encode failed");

    assert_eq!(FrameCodec::frame_length(&bytes[..8]), Ok(bytes.len()));
    assert!(matches!(
        FrameCodec::frame_length(&bytes[..4]),
        Err(FrameDecodeError::IncompleteHeader { .. })
    ));
}
