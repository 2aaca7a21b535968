//! Drives an [`AudioSource`] through normalization and VAD gating into the
//! orchestrator, realizing §2's `mic frames → Audio Normalizer → VAD Gating
//! → Managed STT` data flow.

use vrelay_audio::normalize::normalize_raw_frame;
use vrelay_audio::AudioSource;
use vrelay_foundation::error::RelayError;
use vrelay_vad::VadGating;

use crate::orchestrator::Orchestrator;

/// Owns the capture source and VAD gate; feeds every resulting `VadEvent`
/// into the orchestrator until the source is exhausted or an error occurs.
pub struct AudioPipeline {
    source: Box<dyn AudioSource>,
    gating: VadGating,
    internal_sample_rate_hz: u32,
    pending: Vec<f32>,
}

impl AudioPipeline {
    pub fn new(
        source: Box<dyn AudioSource>,
        gating: VadGating,
        internal_sample_rate_hz: u32,
    ) -> Self {
        Self {
            source,
            gating,
            internal_sample_rate_hz,
            pending: Vec::new(),
        }
    }

    /// Runs until the source yields `None` (end of stream). Returns on the
    /// first unrecoverable error; a caller that wants to keep running past a
    /// capture glitch should reconstruct a fresh source and pipeline.
    pub async fn run(&mut self, orchestrator: &Orchestrator) -> Result<(), RelayError> {
        while let Some(raw) = self.source.next_frame().await? {
            let normalized = normalize_raw_frame(&raw, self.internal_sample_rate_hz)?;
            self.pending.extend(normalized.samples);

            let chunk_samples = self.gating.chunk_samples();
            while self.pending.len() >= chunk_samples {
                let chunk: Vec<f32> = self.pending.drain(..chunk_samples).collect();
                for event in self.gating.process_chunk(&chunk)? {
                    orchestrator.handle_vad_event(event).await?;
                }
            }
        }
        self.source.close().await;
        Ok(())
    }
}
