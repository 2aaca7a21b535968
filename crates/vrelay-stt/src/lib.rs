//! Streaming STT backend interface and managed session controller.

pub mod backend;
pub mod controller;
pub mod events;
pub mod mock;

pub use backend::{BackendTranscriptEvent, SttBackend, SttBackendSession, SttSessionHandle};
pub use controller::{ManagedSttController, ManagedSttControllerConfig};
pub use events::{SttEvent, SttSessionState};
