//! 16-bit little-endian PCM wire encoding
//!
//! Samples are clamped to `[-1.0, 1.0]`, scaled by `0x8000` when negative and `0x7FFF`
//! otherwise, then truncated toward zero. Truncation matches the saturating `as` cast,
//! so the output is bit-exact for a given input. NaN encodes as 0.

/// Scale applied to negative samples
pub const NEGATIVE_SCALE: f32 = 32768.0;

/// Scale applied to zero and positive samples
pub const POSITIVE_SCALE: f32 = 32767.0;

/// Bytes per encoded sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Encode one floating-point sample
pub fn encode_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * NEGATIVE_SCALE) as i16
    } else {
        (s * POSITIVE_SCALE) as i16
    }
}

/// Encode a frame of samples into `2 * samples.len()` bytes
pub fn encode_frame(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        bytes.extend_from_slice(&encode_sample(sample).to_le_bytes());
    }
    bytes
}

/// Inverse of [`encode_sample`]
pub fn decode_sample(value: i16) -> f32 {
    if value < 0 {
        value as f32 / NEGATIVE_SCALE
    } else {
        value as f32 / POSITIVE_SCALE
    }
}

/// Decode little-endian 16-bit PCM back to amplitudes. A trailing odd byte is ignored.
pub fn decode_frame(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| decode_sample(i16::from_le_bytes([chunk[0], chunk[1]])))
        .collect()
}

/// Reinterpret encoded bytes as integer samples (used for WAV recording)
pub fn to_i16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_encodes_to_zero() {
        assert_eq!(encode_sample(0.0), 0);
        assert_eq!(encode_sample(-0.0), 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 0.5 * 32767 = 16383.5
        assert_eq!(encode_sample(0.5), 16383);
        // -0.00001 * 32768 = -0.327...
        assert_eq!(encode_sample(-0.00001), 0);
    }

    #[test]
    fn test_nan_encodes_to_zero() {
        assert_eq!(encode_sample(f32::NAN), 0);
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        assert_eq!(decode_frame(&[0x00, 0x00, 0x7F]).len(), 1);
    }
}
