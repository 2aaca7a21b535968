use async_trait::async_trait;
use tokio::sync::mpsc;
use vrelay_foundation::error::SttError;

/// One `{text, is_final}` record from a streaming backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendTranscriptEvent {
    pub text: String,
    pub is_final: bool,
}

/// A live streaming transcription session.
#[async_trait]
pub trait SttBackendSession: Send + Sync {
    /// Streams PCM16LE mono audio. Must be callable immediately after
    /// `open_session` returns even if the transport is still connecting;
    /// implementations buffer.
    async fn send_audio(&self, pcm16le: &[u8]) -> Result<(), SttError>;

    /// Signals utterance finalization for backends that require an explicit
    /// end-of-speech marker to emit a final.
    async fn on_speech_end(&self) -> Result<(), SttError>;

    /// Politely finish the stream, flushing any pending finals.
    async fn stop(&self) -> Result<(), SttError>;

    /// Release all resources. Idempotent.
    async fn close(&self) -> Result<(), SttError>;
}

/// A newly opened session paired with its event channel. The channel is
/// finite: it closes when the session is stopped or closed.
pub struct SttSessionHandle {
    pub session: Box<dyn SttBackendSession>,
    pub events: mpsc::UnboundedReceiver<Result<BackendTranscriptEvent, SttError>>,
}

#[async_trait]
pub trait SttBackend: Send + Sync {
    async fn open_session(&self) -> Result<SttSessionHandle, SttError>;
}
