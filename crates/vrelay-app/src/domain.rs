//! Record types shared across the orchestrator and its UI-facing event
//! stream. These are plain, frozen data — no behavior beyond small mutators
//! on [`UtteranceBundle`].

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub utterance_id: Uuid,
    pub text: String,
    pub is_final: bool,
    pub created_at: f64,
}

/// Per-utterance state the orchestrator accumulates as STT and translation
/// events arrive. Once `final_text` is set, `partial` stays cleared: a
/// partial arriving after the final is dropped by the caller, never stored.
#[derive(Debug, Clone, Default)]
pub struct UtteranceBundle {
    pub partial: Option<String>,
    pub final_text: Option<String>,
    pub translation: Option<String>,
    pub source: Option<String>,
}

impl UtteranceBundle {
    pub fn set_partial(&mut self, text: String) {
        if self.final_text.is_none() {
            self.partial = Some(text);
        }
    }

    pub fn set_final(&mut self, text: String) {
        self.final_text = Some(text);
        self.partial = None;
    }

    pub fn set_translation(&mut self, text: String) {
        self.translation = Some(text);
    }
}

/// One prior utterance retained for LLM few-shot context.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub timestamp: f64,
}

/// Events pushed to the UI bridge. `source` is a free-form origin tag (e.g.
/// `"Mic"` for STT-sourced errors).
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    SessionStateChanged {
        utterance_id: Option<Uuid>,
        state: String,
    },
    TranscriptPartial {
        utterance_id: Uuid,
        text: String,
    },
    TranscriptFinal {
        utterance_id: Uuid,
        text: String,
    },
    TranslationDone {
        utterance_id: Uuid,
        text: String,
    },
    OscSent {
        utterance_id: Option<Uuid>,
    },
    Error {
        utterance_id: Option<Uuid>,
        message: String,
        source: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_final_clears_partial() {
        let mut bundle = UtteranceBundle::default();
        bundle.set_partial("hel".into());
        bundle.set_final("hello".into());
        assert_eq!(bundle.final_text.as_deref(), Some("hello"));
        assert_eq!(bundle.partial, None);
    }

    #[test]
    fn partial_after_final_is_ignored() {
        let mut bundle = UtteranceBundle::default();
        bundle.set_final("hello".into());
        bundle.set_partial("hel".into());
        assert_eq!(bundle.partial, None);
    }
}
