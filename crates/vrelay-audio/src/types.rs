/// A block of mono f32 PCM audio at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}

/// One inbound frame from the microphone capture driver, as delivered over
/// the audio capture contract. `samples` are interleaved by channel when
/// `channels > 1`; f32 in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudioFrame {
    pub samples: Vec<f32>,
    pub channels: u32,
    pub sample_rate_hz: u32,
}

impl RawAudioFrame {
    pub fn new(samples: Vec<f32>, channels: u32, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate_hz,
        }
    }
}
