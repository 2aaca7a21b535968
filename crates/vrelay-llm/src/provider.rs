//! Translation provider interface and the concurrency-limiting wrapper that
//! every concrete provider is composed behind.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use uuid::Uuid;

use vrelay_foundation::error::LlmError;

/// One prior `(source_text, translated_text)` pair offered as few-shot
/// context, in addition to the flattened `context` string.
pub type ContextPair = (String, String);

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub utterance_id: Uuid,
    pub text: String,
}

/// A single translation request. Grouping the call's arguments avoids an
/// eight-parameter `translate` signature while keeping the wire-level
/// contract (§4.6) identical.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub utterance_id: Uuid,
    pub text: String,
    pub system_prompt: String,
    pub source_lang: String,
    pub target_lang: String,
    pub context: String,
    pub context_pairs: Option<Vec<ContextPair>>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, LlmError>;

    /// Release any held resources (HTTP client pools, etc). Idempotent.
    async fn close(&self);
}

/// Wraps an [`LlmProvider`] with a counting semaphore sized
/// `concurrency_limit`, so at most that many translations run at once
/// regardless of how many utterances finish concurrently.
pub struct SemaphoreLlmProvider {
    inner: Arc<dyn LlmProvider>,
    permits: Arc<Semaphore>,
}

impl SemaphoreLlmProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, concurrency_limit: usize) -> Self {
        assert!(concurrency_limit >= 1, "concurrency_limit must be at least 1");
        Self {
            inner,
            permits: Arc::new(Semaphore::new(concurrency_limit)),
        }
    }
}

#[async_trait]
impl LlmProvider for SemaphoreLlmProvider {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, LlmError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("semaphore is never closed while the wrapper is alive");
        self.inner.translate(request).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
