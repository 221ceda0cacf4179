// Tests for the 16-bit PCM wire encoder
//
// These tests verify the outbound frame format: length, clamping, asymmetric
// scaling, truncation and byte order.

use loqa_call::audio::pcm::{decode_frame, encode_frame, encode_sample};

#[test]
fn test_known_samples_encode_to_expected_bytes() {
    let bytes = encode_frame(&[0.0, 1.0, -1.0, 0.5]);

    assert_eq!(
        bytes,
        vec![0x00, 0x00, 0xFF, 0x7F, 0x00, 0x80, 0xFF, 0x3F]
    );
}

#[test]
fn test_output_length_is_twice_input() {
    for len in [0usize, 1, 2, 7, 4096] {
        let samples = vec![0.25f32; len];
        assert_eq!(encode_frame(&samples).len(), 2 * len, "length {}", len);
    }
}

#[test]
fn test_out_of_range_samples_clamp() {
    assert_eq!(encode_sample(-1.0), -32768);
    assert_eq!(encode_sample(-1.5), -32768);
    assert_eq!(encode_sample(-100.0), -32768);
    assert_eq!(encode_sample(f32::NEG_INFINITY), -32768);

    assert_eq!(encode_sample(1.0), 32767);
    assert_eq!(encode_sample(1.0001), 32767);
    assert_eq!(encode_sample(42.0), 32767);
    assert_eq!(encode_sample(f32::INFINITY), 32767);
}

#[test]
fn test_encoding_is_monotonic() {
    let mut previous = i16::MIN;
    for step in 0..=20_000 {
        let x = -1.0 + step as f32 * (2.0 / 20_000.0);
        let encoded = encode_sample(x);
        assert!(
            encoded >= previous,
            "encode({}) = {} < {}",
            x,
            encoded,
            previous
        );
        previous = encoded;
    }
}

#[test]
fn test_encoding_is_deterministic() {
    let samples: Vec<f32> = (0..4096).map(|i| ((i as f32) * 0.013).sin() * 0.8).collect();

    let first = encode_frame(&samples);
    let second = encode_frame(&samples);

    assert_eq!(first, second);
}

#[test]
fn test_round_trip_within_one_quantization_step() {
    let mut samples: Vec<f32> = (-64..=64).map(|k| k as f32 / 64.0).collect();
    samples.extend_from_slice(&[0.3, -0.3, 0.123, -0.987, 0.999, -0.0001]);

    let decoded = decode_frame(&encode_frame(&samples));

    assert_eq!(decoded.len(), samples.len());
    for (original, restored) in samples.iter().zip(&decoded) {
        let error = (original - restored).abs();
        assert!(
            error <= 1.0 / 32768.0 + f32::EPSILON,
            "{} restored as {} (error {})",
            original,
            restored,
            error
        );
    }
}

#[test]
fn test_little_endian_byte_order() {
    let bytes = encode_frame(&[-0.5]);
    // -0.5 * 32768 = -16384 = 0xC000
    assert_eq!(bytes, vec![0x00, 0xC0]);
}
