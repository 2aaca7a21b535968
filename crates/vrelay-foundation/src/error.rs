use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Vad(#[from] VadError),

    #[error(transparent)]
    Stt(#[from] SttError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Osc(#[from] OscError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("transient error, will retry: {0}")]
    Transient(String),
}

impl From<tokio::task::JoinError> for RelayError {
    fn from(err: tokio::task::JoinError) -> Self {
        RelayError::Transient(format!("task join failed: {err}"))
    }
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("unsupported sample rate: {hz} Hz (expected 8000 or 16000)")]
    UnsupportedSampleRate { hz: u32 },

    #[error("chunk size mismatch: expected {expected} samples, got {actual}")]
    ChunkSizeMismatch { expected: usize, actual: usize },

    #[error("cannot mix down audio with shape {shape}")]
    UnsupportedChannelLayout { shape: String },

    #[error("ring buffer capacity must be positive")]
    InvalidRingCapacity,
}

#[derive(Error, Debug)]
pub enum VadError {
    #[error("vad engine processing failed: {0}")]
    ProcessingFailed(String),

    #[error("invalid chunk size: expected {expected}, got {actual}")]
    InvalidChunkSize { expected: usize, actual: usize },

    #[error("invalid gating configuration: {reason}")]
    InvalidConfig { reason: String },
}

#[derive(Error, Debug)]
pub enum SttError {
    #[error("failed to open stt session: {0}")]
    SessionOpenFailed(String),

    #[error("stt backend transport error: {0}")]
    Transport(String),

    #[error("no active session to send audio to")]
    NoActiveSession,

    #[error("session drain timed out after {0:?}")]
    DrainTimeout(Duration),

    #[error("invalid controller configuration: {reason}")]
    InvalidConfig { reason: String },
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("translation request failed: {0}")]
    RequestFailed(String),

    #[error("translation provider returned malformed response: {0}")]
    MalformedResponse(String),

    #[error("translation request timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum OscError {
    #[error("invalid osc address {address:?}: must start with '/'")]
    InvalidAddress { address: String },

    #[error("unsupported osc argument type")]
    UnsupportedArgType,

    #[error("transport send failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid sender configuration: {reason}")]
    InvalidConfig { reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("model/resource path not found: {path}")]
    PathNotFound { path: PathBuf },
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Restart,
    Ignore,
    Fatal,
}

impl RelayError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            RelayError::Stt(SttError::SessionOpenFailed(_)) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            RelayError::Stt(SttError::DrainTimeout(_)) => RecoveryStrategy::Ignore,
            RelayError::Llm(LlmError::Timeout) => RecoveryStrategy::Retry {
                max_attempts: 1,
                delay: Duration::from_millis(500),
            },
            RelayError::Fatal(_) | RelayError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_recover_as_fatal() {
        let err = RelayError::Fatal("boom".into());
        assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
    }

    #[test]
    fn session_open_failure_is_retryable() {
        let err = RelayError::Stt(SttError::SessionOpenFailed("connection refused".into()));
        assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Retry { .. }));
    }
}
