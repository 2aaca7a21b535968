use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttSessionState {
    Disconnected,
    Streaming,
    Draining,
}

/// Events produced by [`crate::controller::ManagedSttController::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SttEvent {
    Partial { utterance_id: Uuid, text: String },
    Final { utterance_id: Uuid, text: String },
    Error { utterance_id: Option<Uuid>, message: String },
    SessionState { state: SttSessionState, utterance_id: Option<Uuid> },
}
