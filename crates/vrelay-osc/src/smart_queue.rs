//! Cooldown-gated, TTL-expiring, character-paginated merge queue for
//! outgoing chatbox messages.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use vrelay_foundation::clock::SharedClock;
use vrelay_foundation::error::OscError;
use vrelay_telemetry::PipelineMetrics;

use crate::encoding::{encode_chatbox_message, encode_typing_message};
use crate::sender::OscSender;

/// A pending chatbox send, merged with others in the same cooldown window.
#[derive(Debug, Clone, PartialEq)]
pub struct OSCMessage {
    pub utterance_id: Option<Uuid>,
    pub text: String,
    pub created_at: f64,
}

#[derive(Debug, Clone)]
pub struct SmartOscQueueConfig {
    pub max_chars: usize,
    pub cooldown_s: f64,
    pub ttl_s: f64,
}

/// Encodes and sends chatbox/typing messages over a fixed OSC destination.
pub struct ChatboxOscClient {
    sender: Arc<dyn OscSender>,
    chatbox_address: String,
    typing_address: String,
}

impl ChatboxOscClient {
    pub fn new(
        sender: Arc<dyn OscSender>,
        chatbox_address: impl Into<String>,
        typing_address: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            chatbox_address: chatbox_address.into(),
            typing_address: typing_address.into(),
        }
    }

    pub async fn send_chatbox_text(&self, text: &str) -> Result<(), OscError> {
        let message = encode_chatbox_message(&self.chatbox_address, text, true, false)?;
        self.sender.send(&message).await
    }

    pub async fn send_typing(&self, is_typing: bool) -> Result<(), OscError> {
        let message = encode_typing_message(&self.typing_address, is_typing)?;
        self.sender.send(&message).await
    }
}

struct QueueState {
    pending: Vec<OSCMessage>,
    next_send_at: f64,
}

/// See §4.8: cooldown gates how often a batch goes out, TTL drops stale
/// entries before they're combined, pagination caps the size of any single
/// datagram's text payload.
pub struct SmartOscQueue {
    client: Arc<ChatboxOscClient>,
    clock: SharedClock,
    config: SmartOscQueueConfig,
    metrics: Option<PipelineMetrics>,
    state: Mutex<QueueState>,
}

impl SmartOscQueue {
    pub fn new(
        client: Arc<ChatboxOscClient>,
        clock: SharedClock,
        config: SmartOscQueueConfig,
        metrics: Option<PipelineMetrics>,
    ) -> Self {
        Self {
            client,
            clock,
            config,
            metrics,
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                next_send_at: 0.0,
            }),
        }
    }

    pub async fn enqueue(&self, message: OSCMessage) {
        {
            let mut state = self.state.lock().await;
            state.pending.push(message);
        }
        self.process_due().await;
    }

    pub async fn process_due(&self) {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        if now < state.next_send_at {
            return;
        }

        let ttl_s = self.config.ttl_s;
        let before = state.pending.len();
        state.pending.retain(|m| now - m.created_at <= ttl_s);
        let expired = (before - state.pending.len()) as u64;
        if expired > 0 {
            if let Some(metrics) = &self.metrics {
                metrics.record_osc_expired(expired);
            }
        }

        if state.pending.is_empty() {
            return;
        }

        let combined = state
            .pending
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let combined = combined.trim().to_string();
        let parts = paginate(&combined, self.config.max_chars);
        let Some(first) = parts.first() else {
            state.pending.clear();
            return;
        };

        match self.client.send_chatbox_text(first).await {
            Ok(()) => {
                let utterance_id = state.pending.first().and_then(|m| m.utterance_id);
                let earliest_created_at = state
                    .pending
                    .iter()
                    .map(|m| m.created_at)
                    .fold(f64::INFINITY, f64::min);

                state.next_send_at = now + self.config.cooldown_s;
                state.pending.clear();

                if parts.len() > 1 {
                    let remainder = parts[1..].join("");
                    state.pending.push(OSCMessage {
                        utterance_id,
                        text: remainder,
                        created_at: earliest_created_at,
                    });
                }

                if let Some(metrics) = &self.metrics {
                    metrics.record_osc_sent();
                }
            }
            Err(err) => {
                warn!("osc send failed, retrying next tick: {err}");
                if let Some(metrics) = &self.metrics {
                    metrics.osc_send_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub async fn send_typing(&self, is_typing: bool) {
        if let Err(err) = self.client.send_typing(is_typing).await {
            warn!("osc typing send failed: {err}");
        }
    }
}

/// Split `text` into chunks of at most `max_chars` characters. Breaks may
/// fall mid-word; this is not hyphen-aware.
fn paginate(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
