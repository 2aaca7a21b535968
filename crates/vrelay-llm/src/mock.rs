//! Deterministic in-memory LLM provider for tests.

use async_trait::async_trait;

use vrelay_foundation::error::LlmError;

use crate::provider::{LlmProvider, Translation, TranslationRequest};

/// Always succeeds, echoing back a fixed marker string. Matches the "fake
/// LLM" used by the end-to-end scenario in the orchestrator's own tests.
pub struct EchoLlmProvider {
    marker: String,
}

impl EchoLlmProvider {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }
}

impl Default for EchoLlmProvider {
    fn default() -> Self {
        Self::new("TRANSLATED")
    }
}

#[async_trait]
impl LlmProvider for EchoLlmProvider {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, LlmError> {
        Ok(Translation {
            utterance_id: request.utterance_id,
            text: self.marker.clone(),
        })
    }

    async fn close(&self) {}
}

/// Always fails, for exercising the hub's `fallback_transcript_only` path.
pub struct FailingLlmProvider;

#[async_trait]
impl LlmProvider for FailingLlmProvider {
    async fn translate(&self, _request: TranslationRequest) -> Result<Translation, LlmError> {
        Err(LlmError::RequestFailed("mock configured to fail".into()))
    }

    async fn close(&self) {}
}
