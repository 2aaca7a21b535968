//! Mixdown, linear resampling, and PCM16LE conversion.
//!
//! The resampler is a plain linear interpolation, not a sinc filter: the
//! pipeline needs an exact, deterministic mapping from input to output sample
//! count (`floor(src_len * to/from)`) so tests can assert on precise lengths
//! and values, which a windowed-sinc resampler's ringing and latency would
//! make impractical.

use crate::types::{AudioFrame, RawAudioFrame};
use vrelay_foundation::error::AudioError;

/// Split an interleaved-by-channel buffer into one planar `Vec<f32>` per
/// channel. `channels == 1` returns the input unchanged in a single-element
/// vec; `samples.len()` must be a multiple of `channels`.
fn deinterleave(samples: &[f32], channels: u32) -> Result<Vec<Vec<f32>>, AudioError> {
    if channels == 0 {
        return Err(AudioError::UnsupportedChannelLayout {
            shape: "0 channels".to_string(),
        });
    }
    if channels == 1 {
        return Ok(vec![samples.to_vec()]);
    }
    let channels = channels as usize;
    if samples.len() % channels != 0 {
        return Err(AudioError::UnsupportedChannelLayout {
            shape: format!(
                "{} interleaved samples not divisible by {channels} channels",
                samples.len()
            ),
        });
    }
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for (i, &sample) in samples.iter().enumerate() {
        planar[i % channels].push(sample);
    }
    Ok(planar)
}

/// De-interleave then mix down and resample to `target_sample_rate_hz`. The
/// single entry point the audio capture contract's inbound frames go through
/// on their way into the VAD gate.
pub fn normalize_raw_frame(
    frame: &RawAudioFrame,
    target_sample_rate_hz: u32,
) -> Result<AudioFrame, AudioError> {
    let planar = deinterleave(&frame.samples, frame.channels)?;
    normalize_audio(&planar, frame.sample_rate_hz, target_sample_rate_hz)
}

/// Average multiple interleaved-by-channel planar buffers down to mono.
/// A single channel is returned unchanged.
pub fn mixdown_to_mono(channels: &[Vec<f32>]) -> Result<Vec<f32>, AudioError> {
    match channels.len() {
        0 => Ok(Vec::new()),
        1 => Ok(channels[0].clone()),
        n => {
            let len = channels[0].len();
            if channels.iter().any(|c| c.len() != len) {
                return Err(AudioError::UnsupportedChannelLayout {
                    shape: format!("{n} channels of mismatched length"),
                });
            }
            let mut out = vec![0.0f32; len];
            for channel in channels {
                for (acc, sample) in out.iter_mut().zip(channel) {
                    *acc += sample;
                }
            }
            let n = n as f32;
            out.iter_mut().for_each(|s| *s /= n);
            Ok(out)
        }
    }
}

/// Resample mono f32 audio via linear interpolation. Identity at equal rates.
/// Output length is `floor(src_len * to/from)`, minimum 1 when input is non-empty.
pub fn resample_linear(samples: &[f32], from_rate_hz: u32, to_rate_hz: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate_hz == to_rate_hz {
        return samples.to_vec();
    }

    let src_len = samples.len();
    let dst_len = ((src_len as f64 * to_rate_hz as f64) / from_rate_hz as f64)
        .floor()
        .max(1.0) as usize;

    if src_len == 1 {
        return vec![samples[0]; dst_len];
    }

    let mut out = Vec::with_capacity(dst_len);
    let step = (src_len - 1) as f64 / (dst_len - 1).max(1) as f64;
    for i in 0..dst_len {
        let pos = if dst_len == 1 { 0.0 } else { i as f64 * step };
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(src_len - 1);
        let frac = (pos - lo as f64) as f32;
        out.push(samples[lo] + (samples[hi] - samples[lo]) * frac);
    }
    out
}

/// Mix down then resample, producing a frame at `target_sample_rate_hz`.
pub fn normalize_audio(
    channels: &[Vec<f32>],
    input_sample_rate_hz: u32,
    target_sample_rate_hz: u32,
) -> Result<AudioFrame, AudioError> {
    if input_sample_rate_hz == 0 {
        return Err(AudioError::UnsupportedSampleRate { hz: input_sample_rate_hz });
    }
    if target_sample_rate_hz == 0 {
        return Err(AudioError::UnsupportedSampleRate { hz: target_sample_rate_hz });
    }
    let mono = mixdown_to_mono(channels)?;
    let resampled = if input_sample_rate_hz == target_sample_rate_hz {
        mono
    } else {
        resample_linear(&mono, input_sample_rate_hz, target_sample_rate_hz)
    };
    Ok(AudioFrame::new(resampled, target_sample_rate_hz))
}

/// Clip to [-1, 1], scale by 32767, round, encode little-endian i16 bytes.
pub fn float32_to_pcm16le_bytes(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let clipped = s.clamp(-1.0, 1.0);
        let quantized = (clipped * 32767.0).round() as i16;
        out.extend_from_slice(&quantized.to_le_bytes());
    }
    out
}

/// Inverse of [`float32_to_pcm16le_bytes`]. Uses divisor 32768 (not 32767),
/// matching the asymmetric encode/decode scale used throughout the pipeline.
pub fn pcm16le_bytes_to_float32(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|chunk| {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            sample as f32 / 32768.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passthrough_is_unchanged() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(mixdown_to_mono(&[mono.clone()]).unwrap(), mono);
    }

    #[test]
    fn stereo_averages_channels() {
        let left = vec![1.0, 0.0];
        let right = vec![-1.0, 1.0];
        let mixed = mixdown_to_mono(&[left, right]).unwrap();
        assert_eq!(mixed, vec![0.0, 0.5]);
    }

    #[test]
    fn resample_identity_at_equal_rates() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn resample_downsample_halves_length() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = resample_linear(&samples, 16_000, 8_000);
        assert_eq!(out.len(), 50);
    }

    #[test]
    fn resample_upsample_doubles_length() {
        let samples: Vec<f32> = (0..50).map(|i| i as f32).collect();
        let out = resample_linear(&samples, 8_000, 16_000);
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn resample_empty_input_is_empty_output() {
        let out: Vec<f32> = resample_linear(&[], 16_000, 8_000);
        assert!(out.is_empty());
    }

    #[test]
    fn pcm_roundtrip_is_near_lossless() {
        let samples = vec![-1.0, -0.5, 0.0, 0.5, 1.0];
        let bytes = float32_to_pcm16le_bytes(&samples);
        let back = pcm16le_bytes_to_float32(&bytes);
        for (a, b) in samples.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn normalize_raw_frame_deinterleaves_stereo_before_mixdown() {
        let frame = RawAudioFrame::new(vec![1.0, -1.0, 0.0, 1.0], 2, 16_000);
        let out = normalize_raw_frame(&frame, 16_000).unwrap();
        assert_eq!(out.samples, vec![0.0, 0.5]);
    }

    #[test]
    fn normalize_raw_frame_rejects_non_divisible_channel_count() {
        let frame = RawAudioFrame::new(vec![1.0, -1.0, 0.0], 2, 16_000);
        assert!(normalize_raw_frame(&frame, 16_000).is_err());
    }

    #[test]
    fn normalize_rejects_zero_input_rate() {
        let err = normalize_audio(&[vec![0.1, 0.2]], 0, 16_000).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedSampleRate { hz: 0 }));
    }

    #[test]
    fn normalize_rejects_zero_target_rate() {
        let err = normalize_audio(&[vec![0.1, 0.2]], 16_000, 0).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedSampleRate { hz: 0 }));
    }

    #[test]
    fn pcm_encoding_clips_out_of_range_samples() {
        let bytes = float32_to_pcm16le_bytes(&[2.0, -2.0]);
        let back = pcm16le_bytes_to_float32(&bytes);
        assert!(back[0] > 0.9);
        assert!(back[1] < -0.9);
    }
}
