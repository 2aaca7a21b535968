//! Deterministic in-memory STT backend for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use vrelay_foundation::error::SttError;

use crate::backend::{BackendTranscriptEvent, SttBackend, SttBackendSession, SttSessionHandle};

/// Emits a partial for every non-silent chunk it is sent, and a final
/// (summarizing the chunk count seen so far) when `on_speech_end` is called.
#[derive(Default)]
pub struct MockSttBackend {
    fail_open: AtomicBool,
    sessions_opened: AtomicU64,
}

impl MockSttBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `open_session` call fail, to exercise
    /// controller error paths.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Relaxed);
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SttBackend for MockSttBackend {
    async fn open_session(&self) -> Result<SttSessionHandle, SttError> {
        if self.fail_open.load(Ordering::Relaxed) {
            return Err(SttError::SessionOpenFailed("mock configured to fail".into()));
        }
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(SttSessionHandle {
            session: Box::new(MockSttSession {
                tx,
                chunks_seen: AtomicU64::new(0),
            }),
            events: rx,
        })
    }
}

struct MockSttSession {
    tx: mpsc::UnboundedSender<Result<BackendTranscriptEvent, SttError>>,
    chunks_seen: AtomicU64,
}

#[async_trait]
impl SttBackendSession for MockSttSession {
    async fn send_audio(&self, pcm16le: &[u8]) -> Result<(), SttError> {
        let n = self.chunks_seen.fetch_add(1, Ordering::Relaxed) + 1;
        let is_silent = pcm16le.iter().all(|&b| b == 0);
        if !is_silent {
            let _ = self.tx.send(Ok(BackendTranscriptEvent {
                text: format!("partial {n}"),
                is_final: false,
            }));
        }
        Ok(())
    }

    async fn on_speech_end(&self) -> Result<(), SttError> {
        let n = self.chunks_seen.load(Ordering::Relaxed);
        let _ = self.tx.send(Ok(BackendTranscriptEvent {
            text: format!("final after {n} chunks"),
            is_final: true,
        }));
        Ok(())
    }

    async fn stop(&self) -> Result<(), SttError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), SttError> {
        Ok(())
    }
}

/// A backend whose `open_session` always fails, for exercising controller
/// retry/error-propagation paths independent of `MockSttBackend`'s toggle.
pub struct AlwaysFailingSttBackend;

#[async_trait]
impl SttBackend for AlwaysFailingSttBackend {
    async fn open_session(&self) -> Result<SttSessionHandle, SttError> {
        Err(SttError::Transport("connection refused".into()))
    }
}

pub fn arc_mock_backend() -> Arc<MockSttBackend> {
    Arc::new(MockSttBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_partial_on_non_silent_audio() {
        let backend = MockSttBackend::new();
        let handle = backend.open_session().await.unwrap();
        handle.session.send_audio(&[1, 2, 3, 4]).await.unwrap();
        drop(handle.session);

        let mut events = handle.events;
        let event = events.recv().await.unwrap().unwrap();
        assert_eq!(event.text, "partial 1");
        assert!(!event.is_final);
    }

    #[tokio::test]
    async fn silent_audio_produces_no_partial() {
        let backend = MockSttBackend::new();
        let handle = backend.open_session().await.unwrap();
        handle.session.send_audio(&[0, 0, 0, 0]).await.unwrap();
        handle.session.on_speech_end().await.unwrap();
        drop(handle.session);

        let mut events = handle.events;
        let event = events.recv().await.unwrap().unwrap();
        assert!(event.is_final);
        assert_eq!(event.text, "final after 1 chunks");
    }

    #[tokio::test]
    async fn fail_open_toggle_makes_open_session_error() {
        let backend = MockSttBackend::new();
        backend.set_fail_open(true);
        assert!(backend.open_session().await.is_err());
    }
}
