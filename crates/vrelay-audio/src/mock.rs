//! Test double for [`crate::source::AudioSource`], standing in for a real
//! microphone capture driver.

use async_trait::async_trait;

use vrelay_foundation::error::AudioError;

use crate::source::AudioSource;
use crate::types::RawAudioFrame;

/// Yields a fixed, pre-recorded sequence of frames, then `None` forever.
pub struct MockAudioSource {
    frames: std::vec::IntoIter<RawAudioFrame>,
    closed: bool,
}

impl MockAudioSource {
    pub fn new(frames: Vec<RawAudioFrame>) -> Self {
        Self {
            frames: frames.into_iter(),
            closed: false,
        }
    }
}

#[async_trait]
impl AudioSource for MockAudioSource {
    async fn next_frame(&mut self) -> Result<Option<RawAudioFrame>, AudioError> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.frames.next())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
