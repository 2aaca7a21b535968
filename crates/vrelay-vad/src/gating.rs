use uuid::Uuid;
use vrelay_audio::RingBuffer;
use vrelay_foundation::error::VadError;

use crate::config::VadGatingConfig;
use crate::constants::default_chunk_samples_for_rate;
use crate::engine::VadEngine;
use crate::types::VadEvent;

/// Segments a continuous stream of fixed-size audio chunks into utterances,
/// attaching pre-roll history to each `SpeechStart`.
pub struct VadGating {
    engine: Box<dyn VadEngine>,
    sample_rate_hz: u32,
    speech_threshold: f32,
    chunk_samples: usize,
    hangover_chunks: u32,
    ring: RingBuffer,

    in_speech: bool,
    utterance_id: Option<Uuid>,
    silence_run: u32,
}

impl VadGating {
    pub fn new(engine: Box<dyn VadEngine>, config: VadGatingConfig) -> Result<Self, VadError> {
        config.validate()?;

        let chunk_samples = match config.chunk_samples {
            Some(n) => n,
            None => default_chunk_samples_for_rate(config.sample_rate_hz).ok_or_else(|| {
                VadError::InvalidConfig {
                    reason: format!(
                        "no default chunk size for sample rate {} Hz",
                        config.sample_rate_hz
                    ),
                }
            })?,
        };

        let chunk_ms = chunk_samples as f64 * 1000.0 / config.sample_rate_hz as f64;
        let hangover_chunks = if config.hangover_ms == 0 {
            0
        } else {
            (config.hangover_ms as f64 / chunk_ms).ceil() as u32
        };

        let ring_capacity =
            (config.sample_rate_hz as u64 * config.ring_buffer_ms as u64 / 1000) as usize;

        Ok(Self {
            engine,
            sample_rate_hz: config.sample_rate_hz,
            speech_threshold: config.speech_threshold,
            chunk_samples,
            hangover_chunks,
            ring: RingBuffer::new(ring_capacity.max(1)),
            in_speech: false,
            utterance_id: None,
            silence_run: 0,
        })
    }

    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.ring.clear();
        self.in_speech = false;
        self.utterance_id = None;
        self.silence_run = 0;
    }

    /// Process one chunk, returning any events it produced (0, 1 or 2).
    pub fn process_chunk(&mut self, chunk: &[f32]) -> Result<Vec<VadEvent>, VadError> {
        if chunk.len() != self.chunk_samples {
            return Err(VadError::InvalidChunkSize {
                expected: self.chunk_samples,
                actual: chunk.len(),
            });
        }

        let probability = self.engine.speech_probability(chunk, self.sample_rate_hz);
        let mut events = Vec::new();

        if !self.in_speech {
            if probability >= self.speech_threshold {
                let id = Uuid::new_v4();
                let pre_roll = self.ring.get_last_samples(self.ring.capacity_samples());
                self.in_speech = true;
                self.utterance_id = Some(id);
                self.silence_run = 0;
                events.push(VadEvent::SpeechStart {
                    id,
                    pre_roll,
                    chunk: chunk.to_vec(),
                });
            }
            self.ring.append(chunk);
            return Ok(events);
        }

        let id = self.utterance_id.expect("in_speech implies an utterance id");
        events.push(VadEvent::SpeechChunk {
            id,
            chunk: chunk.to_vec(),
        });

        if probability >= self.speech_threshold {
            self.silence_run = 0;
        } else {
            self.silence_run += 1;
            if self.silence_run >= self.hangover_chunks {
                events.push(VadEvent::SpeechEnd { id });
                self.in_speech = false;
                self.utterance_id = None;
                self.silence_run = 0;
                self.engine.reset();
            }
        }

        self.ring.append(chunk);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EnergyVadEngine;

    fn silent_chunk() -> Vec<f32> {
        vec![0.0; 512]
    }

    fn loud_chunk() -> Vec<f32> {
        vec![0.8; 512]
    }

    struct ScriptedEngine {
        probabilities: std::vec::IntoIter<f32>,
    }

    impl ScriptedEngine {
        fn new(probabilities: Vec<f32>) -> Self {
            Self {
                probabilities: probabilities.into_iter(),
            }
        }
    }

    impl VadEngine for ScriptedEngine {
        fn speech_probability(&mut self, _samples: &[f32], _sample_rate_hz: u32) -> f32 {
            self.probabilities.next().unwrap_or(0.0)
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn start_and_end_with_pre_roll_matches_seeded_scenario() {
        let probs = vec![0.0, 0.0, 0.9, 0.9, 0.0, 0.0, 0.0];
        let engine = ScriptedEngine::new(probs);
        let config = VadGatingConfig {
            sample_rate_hz: 16_000,
            ring_buffer_ms: 64, // 1024 samples @ 16kHz = 2 chunks of 512
            speech_threshold: 0.5,
            hangover_ms: 64, // 2 chunks @ 32ms
            chunk_samples: Some(512),
        };
        let mut gating = VadGating::new(Box::new(engine), config).unwrap();

        let chunks: Vec<Vec<f32>> = (0..7)
            .map(|i| vec![i as f32 / 1000.0; 512])
            .collect();

        let mut all_events = Vec::new();
        for chunk in &chunks {
            all_events.extend(gating.process_chunk(chunk).unwrap());
        }

        let starts: Vec<_> = all_events
            .iter()
            .filter(|e| matches!(e, VadEvent::SpeechStart { .. }))
            .collect();
        let ends: Vec<_> = all_events
            .iter()
            .filter(|e| matches!(e, VadEvent::SpeechEnd { .. }))
            .collect();
        let mids: Vec<_> = all_events
            .iter()
            .filter(|e| matches!(e, VadEvent::SpeechChunk { .. }))
            .collect();

        assert_eq!(starts.len(), 1);
        assert_eq!(ends.len(), 1);
        assert_eq!(mids.len(), 2);

        if let VadEvent::SpeechStart { pre_roll, id, .. } = starts[0] {
            assert_eq!(pre_roll.len(), 1024);
            assert_eq!(pre_roll, &[chunks[0].clone(), chunks[1].clone()].concat());
            for e in &all_events {
                assert_eq!(e.utterance_id(), *id);
            }
        } else {
            unreachable!();
        }
    }

    #[test]
    fn no_start_emitted_when_probability_never_crosses_threshold() {
        let engine = EnergyVadEngine::default();
        let config = VadGatingConfig::default();
        let mut gating = VadGating::new(Box::new(engine), config).unwrap();
        for _ in 0..10 {
            let events = gating.process_chunk(&silent_chunk()).unwrap();
            assert!(events.is_empty());
        }
    }

    #[test]
    fn wrong_chunk_size_is_rejected() {
        let engine = EnergyVadEngine::default();
        let config = VadGatingConfig::default();
        let mut gating = VadGating::new(Box::new(engine), config).unwrap();
        let bad_chunk = vec![0.0; 100];
        assert!(gating.process_chunk(&bad_chunk).is_err());
    }

    #[test]
    fn engine_is_reset_on_speech_end() {
        let probs = vec![0.9, 0.0, 0.0];
        let engine = ScriptedEngine::new(probs);
        let config = VadGatingConfig {
            sample_rate_hz: 16_000,
            ring_buffer_ms: 500,
            speech_threshold: 0.5,
            hangover_ms: 32,
            chunk_samples: Some(512),
        };
        let mut gating = VadGating::new(Box::new(engine), config).unwrap();
        for _ in 0..3 {
            gating.process_chunk(&loud_chunk()).unwrap();
        }
        assert!(!gating.in_speech);
    }
}
