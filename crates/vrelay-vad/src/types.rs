use uuid::Uuid;

/// Events emitted by [`crate::gating::VadGating`] as it segments a chunk
/// stream into utterances.
///
/// For any utterance id: exactly one `SpeechStart`, zero or more
/// `SpeechChunk`, exactly one `SpeechEnd`, in that order.
#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    SpeechStart {
        id: Uuid,
        pre_roll: Vec<f32>,
        chunk: Vec<f32>,
    },
    SpeechChunk {
        id: Uuid,
        chunk: Vec<f32>,
    },
    SpeechEnd {
        id: Uuid,
    },
}

impl VadEvent {
    pub fn utterance_id(&self) -> Uuid {
        match self {
            VadEvent::SpeechStart { id, .. } => *id,
            VadEvent::SpeechChunk { id, .. } => *id,
            VadEvent::SpeechEnd { id } => *id,
        }
    }
}
