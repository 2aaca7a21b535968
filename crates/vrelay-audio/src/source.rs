//! The microphone capture contract (inbound half of §6's audio capture
//! contract). No concrete driver ships here — mirrors how `SttBackend`
//! is an interface with its real implementation left to a vendor adapter.

use async_trait::async_trait;

use vrelay_foundation::error::AudioError;

use crate::types::RawAudioFrame;

/// A lazy sequence of `RawAudioFrame`s from a capture driver.
#[async_trait]
pub trait AudioSource: Send {
    /// Returns the next frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Result<Option<RawAudioFrame>, AudioError>;

    /// Release any underlying resources. Idempotent.
    async fn close(&mut self);
}
