// tests/property/roundtrip_test.rs

//! Property-based tests for the wire format
//! Decoding an encoded payload and encoding it again must be byte-identical.

use gnss_share::core::protocol::{LocationUpdate, ServerResponse, ServerResponseCodec};
use proptest::prelude::*;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

fn location_update() -> impl Strategy<Value = LocationUpdate> {
    (
        any::<i64>(),
        -90.0f64..90.0,
        -180.0f64..180.0,
        "[a-z]{0,8}",
        -1.0e6f32..1.0e6,
        proptest::option::of(-500.0f64..9000.0),
        proptest::option::of(0.0f32..500.0),
        proptest::option::of(0.0f32..360.0),
        proptest::option::of(0.0f32..100.0),
    )
        .prop_map(
            |(timestamp, latitude, longitude, provider, location_age, altitude, accuracy, bearing, speed)| {
                LocationUpdate {
                    timestamp,
                    latitude,
                    longitude,
                    provider,
                    location_age,
                    altitude,
                    accuracy,
                    bearing,
                    speed,
                }
            },
        )
}

fn server_response() -> impl Strategy<Value = ServerResponse> {
    (
        "[A-Z_]{0,24}",
        proptest::option::of(location_update()),
        any::<u32>(),
    )
        .prop_map(|(status, location_update, satellites)| ServerResponse {
            status,
            location_update,
            satellites,
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_decode_then_encode_is_byte_identical(response in server_response()) {
        let encoded = response.encode_to_bytes();
        let decoded = ServerResponse::decode(&encoded).unwrap();
        prop_assert_eq!(&decoded.encode_to_bytes(), &encoded);
    }

    #[test]
    fn test_codec_roundtrip_preserves_message(response in server_response()) {
        let mut codec = ServerResponseCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(response.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap();
        prop_assert_eq!(decoded, Some(response));
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = ServerResponse::decode(&bytes);
    }
}
