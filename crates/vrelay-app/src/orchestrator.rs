//! Utterance orchestrator: fans out STT transcript events, dispatches
//! translations under a concurrency bound, enforces context-memory policy,
//! and tracks end-to-end latency from speech-end to OSC enqueue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use vrelay_foundation::clock::SharedClock;
use vrelay_foundation::error::RelayError;
use vrelay_llm::{LlmProvider, TranslationRequest};
use vrelay_osc::{OSCMessage, SmartOscQueue};
use vrelay_stt::{ManagedSttController, SttEvent};
use vrelay_telemetry::PipelineMetrics;
use vrelay_vad::VadEvent;

use crate::domain::{ContextEntry, RelayEvent, UtteranceBundle};
use crate::languages::language_name;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub source_lang: String,
    pub target_lang: String,
    pub system_prompt: String,
    pub fallback_transcript_only: bool,
    pub translation_enabled: bool,
    pub context_time_window_s: f64,
    pub context_max_entries: usize,
    pub hangover_s: f64,
}

struct State {
    bundles: HashMap<Uuid, UtteranceBundle>,
    translation_tasks: HashMap<Uuid, JoinHandle<()>>,
    utterance_sources: HashMap<Uuid, String>,
    utterance_start_times: HashMap<Uuid, f64>,
    context: VecDeque<ContextEntry>,
    stt_consumer: Option<JoinHandle<()>>,
    flush_ticker: Option<JoinHandle<()>>,
}

struct Shared {
    stt: Arc<ManagedSttController>,
    llm: Option<Arc<dyn LlmProvider>>,
    osc_queue: Arc<SmartOscQueue>,
    clock: SharedClock,
    config: OrchestratorConfig,
    metrics: Option<PipelineMetrics>,
    events_tx: mpsc::UnboundedSender<RelayEvent>,
    state: Mutex<State>,
}

impl Shared {
    async fn run_stt_consumer(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<SttEvent>,
    ) {
        while let Some(event) = events.recv().await {
            self.handle_stt_event(event).await;
        }
    }

    async fn handle_stt_event(self: &Arc<Self>, event: SttEvent) {
        match event {
            SttEvent::SessionState { state, utterance_id } => {
                let _ = self.events_tx.send(RelayEvent::SessionStateChanged {
                    utterance_id,
                    state: format!("{state:?}"),
                });
            }
            SttEvent::Error { utterance_id, message } => {
                let _ = self.events_tx.send(RelayEvent::Error {
                    utterance_id,
                    message,
                    source: Some("Mic".to_string()),
                });
            }
            SttEvent::Partial { utterance_id, text } => {
                {
                    let mut state = self.state.lock().await;
                    state.bundles.entry(utterance_id).or_default().set_partial(text.clone());
                }
                let _ = self
                    .events_tx
                    .send(RelayEvent::TranscriptPartial { utterance_id, text });
            }
            SttEvent::Final { utterance_id, text } => {
                self.handle_final_transcript(utterance_id, text, None).await;
            }
        }
    }

    async fn handle_final_transcript(
        self: &Arc<Self>,
        id: Uuid,
        text: String,
        source: Option<String>,
    ) {
        {
            let mut state = self.state.lock().await;
            state.bundles.entry(id).or_default().set_final(text.clone());
            if let Some(src) = source {
                state.utterance_sources.insert(id, src);
            }
        }
        let _ = self
            .events_tx
            .send(RelayEvent::TranscriptFinal { utterance_id: id, text: text.clone() });

        if !self.config.translation_enabled || self.llm.is_none() {
            self.dispatch_osc(id, text).await;
            return;
        }

        self.spawn_translation_task(id, text).await;
    }

    async fn spawn_translation_task(self: &Arc<Self>, id: Uuid, text: String) {
        let mut state = self.state.lock().await;
        if state.translation_tasks.contains_key(&id) {
            return;
        }
        let shared = self.clone();
        let handle = tokio::spawn(async move {
            shared.run_translation_task(id, text).await;
            shared.state.lock().await.translation_tasks.remove(&id);
        });
        state.translation_tasks.insert(id, handle);
    }

    /// Snapshot context, call the LLM, record the result, and enqueue the
    /// merged OSC message. Runs as an independent task, one per utterance id.
    async fn run_translation_task(self: &Arc<Self>, id: Uuid, text: String) {
        let (context_str, context_pairs) = self.snapshot_and_extend_context(&text).await;

        let prompt = self
            .config
            .system_prompt
            .replace("${sourceName}", &language_name(&self.config.source_lang))
            .replace("${targetName}", &language_name(&self.config.target_lang));

        let llm = self.llm.clone().expect("checked before spawning");
        let request = TranslationRequest {
            utterance_id: id,
            text: text.clone(),
            system_prompt: prompt,
            source_lang: self.config.source_lang.clone(),
            target_lang: self.config.target_lang.clone(),
            context: context_str,
            context_pairs,
        };

        let started_at = self.clock.now();
        match llm.translate(request).await {
            Ok(translation) => {
                {
                    let mut state = self.state.lock().await;
                    if let Some(bundle) = state.bundles.get_mut(&id) {
                        bundle.set_translation(translation.text.clone());
                    }
                }
                let _ = self.events_tx.send(RelayEvent::TranslationDone {
                    utterance_id: id,
                    text: translation.text.clone(),
                });
                if let Some(metrics) = &self.metrics {
                    let elapsed_ms = ((self.clock.now() - started_at) * 1000.0).round() as u64;
                    metrics.record_llm_request(elapsed_ms, true);
                }
                self.dispatch_osc(id, format!("{text} ({})", translation.text)).await;
            }
            Err(err) => {
                let _ = self.events_tx.send(RelayEvent::Error {
                    utterance_id: Some(id),
                    message: err.to_string(),
                    source: Some("Llm".to_string()),
                });
                if let Some(metrics) = &self.metrics {
                    let elapsed_ms = ((self.clock.now() - started_at) * 1000.0).round() as u64;
                    metrics.record_llm_request(elapsed_ms, false);
                }
                if self.config.fallback_transcript_only {
                    self.dispatch_osc(id, text).await;
                }
            }
        }
    }

    async fn snapshot_and_extend_context(
        self: &Arc<Self>,
        text: &str,
    ) -> (String, Option<Vec<(String, String)>>) {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let mut valid: Vec<&ContextEntry> = state
            .context
            .iter()
            .rev()
            .filter(|entry| {
                now - entry.timestamp <= self.config.context_time_window_s
                    && entry.source_lang == self.config.source_lang
                    && entry.target_lang == self.config.target_lang
                    && entry.text.len() >= 2
            })
            .take(self.config.context_max_entries)
            .collect();
        valid.reverse();

        let formatted = valid
            .iter()
            .map(|entry| format!("\"{}\"", entry.text))
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(back) = state.context.back() {
            if back.source_lang != self.config.source_lang || back.target_lang != self.config.target_lang {
                state.context.clear();
            }
        }
        state.context.push_back(ContextEntry {
            text: text.to_string(),
            source_lang: self.config.source_lang.clone(),
            target_lang: self.config.target_lang.clone(),
            timestamp: now,
        });
        while state.context.len() > self.config.context_max_entries {
            state.context.pop_front();
        }

        (formatted, None)
    }

    async fn dispatch_osc(self: &Arc<Self>, id: Uuid, text: String) {
        let now = self.clock.now();
        let start = {
            let mut state = self.state.lock().await;
            state.utterance_start_times.remove(&id)
        };
        if let Some(start) = start {
            if let Some(metrics) = &self.metrics {
                let latency_ms = ((now - start + self.config.hangover_s) * 1000.0).round() as u64;
                metrics.record_e2e_latency_ms(latency_ms);
            }
        }

        self.osc_queue
            .enqueue(OSCMessage { utterance_id: Some(id), text, created_at: now })
            .await;
        let _ = self.events_tx.send(RelayEvent::OscSent { utterance_id: Some(id) });
        self.osc_queue.send_typing(false).await;
    }
}

/// Owns the STT controller handle, the LLM provider handle, and the Smart
/// OSC queue; fans transcript events out to translation and onward to OSC.
pub struct Orchestrator {
    shared: Arc<Shared>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<RelayEvent>>>,
}

impl Orchestrator {
    pub fn new(
        stt: Arc<ManagedSttController>,
        llm: Option<Arc<dyn LlmProvider>>,
        osc_queue: Arc<SmartOscQueue>,
        clock: SharedClock,
        config: OrchestratorConfig,
        metrics: Option<PipelineMetrics>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            stt,
            llm,
            osc_queue,
            clock,
            config,
            metrics,
            events_tx,
            state: Mutex::new(State {
                bundles: HashMap::new(),
                translation_tasks: HashMap::new(),
                utterance_sources: HashMap::new(),
                utterance_start_times: HashMap::new(),
                context: VecDeque::new(),
                stt_consumer: None,
                flush_ticker: None,
            }),
        });
        Self { shared, events_rx: Mutex::new(Some(events_rx)) }
    }

    pub async fn take_events(&self) -> mpsc::UnboundedReceiver<RelayEvent> {
        self.events_rx
            .lock()
            .await
            .take()
            .expect("take_events called more than once")
    }

    /// Spawn the STT-event consumer and, if `auto_flush_osc`, an OSC flush
    /// ticker at a ~50ms cadence.
    pub async fn start(&self, auto_flush_osc: bool) {
        let events = self.shared.stt.take_events().await;
        let consumer_shared = self.shared.clone();
        let consumer = tokio::spawn(consumer_shared.run_stt_consumer(events));

        let ticker = if auto_flush_osc {
            let ticker_shared = self.shared.clone();
            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(std::time::Duration::from_millis(50));
                loop {
                    interval.tick().await;
                    ticker_shared.osc_queue.process_due().await;
                }
            }))
        } else {
            None
        };

        let mut state = self.shared.state.lock().await;
        state.stt_consumer = Some(consumer);
        state.flush_ticker = ticker;
    }

    pub async fn stop(&self) {
        let (consumer, ticker, tasks) = {
            let mut state = self.shared.state.lock().await;
            (
                state.stt_consumer.take(),
                state.flush_ticker.take(),
                std::mem::take(&mut state.translation_tasks),
            )
        };

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        for (_, task) in tasks {
            task.abort();
        }
        if let Some(consumer) = consumer {
            consumer.abort();
        }

        self.shared.stt.close().await;
        if let Some(llm) = &self.shared.llm {
            llm.close().await;
        }
    }

    pub async fn handle_vad_event(&self, event: VadEvent) -> Result<(), RelayError> {
        match &event {
            VadEvent::SpeechStart { .. } => {
                self.shared.osc_queue.send_typing(true).await;
            }
            VadEvent::SpeechEnd { id } => {
                let now = self.shared.clock.now();
                self.shared.state.lock().await.utterance_start_times.insert(*id, now);
            }
            VadEvent::SpeechChunk { .. } => {}
        }
        self.shared.stt.handle_vad_event(event).await?;
        Ok(())
    }

    /// Synthesize a final transcript with a fresh id and dispatch it as if
    /// it had arrived from STT.
    pub async fn submit_text(&self, text: String, source: Option<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.shared.handle_final_transcript(id, text, source).await;
        id
    }

    pub async fn clear_context(&self) {
        let mut state = self.shared.state.lock().await;
        state.context.clear();
    }
}
