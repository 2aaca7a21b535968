use serde::{Deserialize, Serialize};
use vrelay_foundation::error::VadError;

/// Configuration for [`crate::gating::VadGating`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadGatingConfig {
    pub sample_rate_hz: u32,
    /// How much pre-roll history to keep, attached to `SpeechStart`.
    pub ring_buffer_ms: u32,
    pub speech_threshold: f32,
    /// Grace period of below-threshold audio tolerated before declaring end-of-speech.
    pub hangover_ms: u32,
    /// Falls back to [`crate::constants`]'s default chunk size for `sample_rate_hz` when `None`.
    pub chunk_samples: Option<usize>,
}

impl Default for VadGatingConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: crate::constants::SAMPLE_RATE_HZ,
            ring_buffer_ms: 500,
            speech_threshold: 0.5,
            hangover_ms: 1200,
            chunk_samples: None,
        }
    }
}

impl VadGatingConfig {
    pub fn validate(&self) -> Result<(), VadError> {
        if self.sample_rate_hz == 0 {
            return Err(VadError::InvalidConfig {
                reason: "sample_rate_hz must be positive".into(),
            });
        }
        if self.ring_buffer_ms == 0 {
            return Err(VadError::InvalidConfig {
                reason: "ring_buffer_ms must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.speech_threshold) {
            return Err(VadError::InvalidConfig {
                reason: "speech_threshold must be within [0, 1]".into(),
            });
        }
        Ok(())
    }
}
