//! Managed STT session controller.
//!
//! Keeps a long-lived streaming transcription connection alive within a
//! provider's per-session time limit by opening a fresh session ahead of the
//! deadline and bridging buffered audio into it ("bridging reset"), or by
//! dropping back to `Disconnected` when no utterance is in progress
//! ("silence reset"). See [`ManagedSttController::handle_vad_event`].

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vrelay_audio::normalize::float32_to_pcm16le_bytes;
use vrelay_audio::RingBuffer;
use vrelay_foundation::error::SttError;
use vrelay_telemetry::PipelineMetrics;
use vrelay_vad::VadEvent;

use crate::backend::{BackendTranscriptEvent, SttBackend, SttBackendSession, SttSessionHandle};
use crate::events::{SttEvent, SttSessionState};

#[derive(Debug, Clone)]
pub struct ManagedSttControllerConfig {
    pub sample_rate_hz: u32,
    pub reset_deadline_s: f64,
    pub drain_timeout_s: f64,
    pub bridging_ms: u32,
}

impl Default for ManagedSttControllerConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            reset_deadline_s: 180.0,
            drain_timeout_s: 1.5,
            bridging_ms: 500,
        }
    }
}

impl ManagedSttControllerConfig {
    fn validate(&self) -> Result<(), SttError> {
        if !matches!(self.sample_rate_hz, 8_000 | 16_000) {
            return Err(SttError::InvalidConfig {
                reason: format!("unsupported sample rate {} Hz", self.sample_rate_hz),
            });
        }
        if self.reset_deadline_s <= 0.0 || self.drain_timeout_s <= 0.0 || self.bridging_ms == 0 {
            return Err(SttError::InvalidConfig {
                reason: "reset_deadline_s, drain_timeout_s and bridging_ms must be positive"
                    .into(),
            });
        }
        Ok(())
    }
}

struct ActiveSession {
    session: Arc<dyn SttBackendSession>,
    consumer: JoinHandle<()>,
}

struct Inner {
    state: SttSessionState,
    active: Option<ActiveSession>,
    active_utterance_id: Option<Uuid>,
    pending_final_utterance_id: Option<Uuid>,
    audio_ring: RingBuffer,
    draining: Vec<JoinHandle<()>>,
    reset_timer: Option<JoinHandle<()>>,
}

/// State and behavior shared between the controller handle and its
/// background tasks (deadline timer, session event consumers).
struct Shared {
    backend: Arc<dyn SttBackend>,
    metrics: Option<PipelineMetrics>,
    events_tx: mpsc::UnboundedSender<SttEvent>,
    reset_deadline_s: f64,
    drain_timeout_s: f64,
    inner: Mutex<Inner>,
}

impl Shared {
    fn set_state(&self, inner: &mut Inner, state: SttSessionState) {
        if inner.state == state {
            return;
        }
        info!("stt session state {:?} -> {:?}", inner.state, state);
        inner.state = state;
        let _ = self.events_tx.send(SttEvent::SessionState {
            state,
            utterance_id: inner.active_utterance_id.or(inner.pending_final_utterance_id),
        });
    }

    async fn ensure_session(self: &Arc<Self>, inner: &mut Inner) -> Result<(), SttError> {
        if inner.active.is_some() {
            return Ok(());
        }

        let SttSessionHandle { session, events } = match self.backend.open_session().await {
            Ok(handle) => handle,
            Err(err) => {
                let _ = self.events_tx.send(SttEvent::Error {
                    utterance_id: inner.active_utterance_id,
                    message: err.to_string(),
                });
                return Err(err);
            }
        };
        let session: Arc<dyn SttBackendSession> = Arc::from(session);
        let consumer = self.spawn_consumer(events);
        inner.active = Some(ActiveSession { session, consumer });
        self.set_state(inner, SttSessionState::Streaming);
        if let Some(metrics) = &self.metrics {
            metrics.stt_sessions_opened.fetch_add(1, Ordering::Relaxed);
        }
        self.schedule_reset_timer(inner);
        Ok(())
    }

    fn spawn_consumer(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<Result<BackendTranscriptEvent, SttError>>,
    ) -> JoinHandle<()> {
        let shared = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let correlated_id = {
                    let guard = shared.inner.lock().await;
                    guard.active_utterance_id.or(guard.pending_final_utterance_id)
                };
                let Some(id) = correlated_id else {
                    debug!("dropping stt event with no correlated utterance id");
                    continue;
                };

                match event {
                    Ok(transcript) if transcript.is_final => {
                        let mut guard = shared.inner.lock().await;
                        if guard.pending_final_utterance_id == Some(id)
                            && guard.active_utterance_id.is_none()
                        {
                            guard.pending_final_utterance_id = None;
                        }
                        drop(guard);
                        let _ = shared.events_tx.send(SttEvent::Final {
                            utterance_id: id,
                            text: transcript.text,
                        });
                    }
                    Ok(transcript) => {
                        let _ = shared.events_tx.send(SttEvent::Partial {
                            utterance_id: id,
                            text: transcript.text,
                        });
                    }
                    Err(err) => {
                        let _ = shared.events_tx.send(SttEvent::Error {
                            utterance_id: Some(id),
                            message: err.to_string(),
                        });
                    }
                }
            }
        })
    }

    /// Appends to the bridging ring and forwards to the active session.
    async fn send_live_audio(
        self: &Arc<Self>,
        inner: &mut Inner,
        samples: &[f32],
    ) -> Result<(), SttError> {
        inner.audio_ring.append(samples);
        let session = inner
            .active
            .as_ref()
            .map(|a| a.session.clone())
            .ok_or(SttError::NoActiveSession)?;
        let pcm = float32_to_pcm16le_bytes(samples);
        session.send_audio(&pcm).await
    }

    fn schedule_reset_timer(self: &Arc<Self>, inner: &mut Inner) {
        if let Some(old) = inner.reset_timer.take() {
            old.abort();
        }
        let shared = self.clone();
        let deadline = Duration::from_secs_f64(self.reset_deadline_s);
        inner.reset_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            shared.fire_deadline().await;
        }));
    }

    async fn fire_deadline(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        if inner.active.is_none() {
            return;
        }
        if inner.active_utterance_id.is_some() {
            self.reset_with_bridging(&mut inner).await;
        } else {
            self.reset_on_silence(&mut inner).await;
        }
    }

    async fn reset_with_bridging(self: &Arc<Self>, inner: &mut Inner) {
        let Some(old) = inner.active.take() else {
            return;
        };

        let replay = inner
            .audio_ring
            .get_last_samples(inner.audio_ring.capacity_samples());

        match self.backend.open_session().await {
            Ok(SttSessionHandle { session, events }) => {
                let session: Arc<dyn SttBackendSession> = Arc::from(session);
                let pcm = float32_to_pcm16le_bytes(&replay);
                if let Err(err) = session.send_audio(&pcm).await {
                    warn!("failed to replay bridging audio into new session: {err}");
                }

                let consumer = self.spawn_consumer(events);
                inner.active = Some(ActiveSession { session, consumer });
                self.schedule_reset_timer(inner);

                if let Some(metrics) = &self.metrics {
                    metrics.stt_bridging_resets.fetch_add(1, Ordering::Relaxed);
                }

                inner
                    .draining
                    .push(self.spawn_drain_task(old.session, old.consumer));
            }
            Err(err) => {
                warn!("bridging reset failed to open new session, keeping old one: {err}");
                let _ = self.events_tx.send(SttEvent::Error {
                    utterance_id: inner.active_utterance_id,
                    message: err.to_string(),
                });
                inner.active = Some(old);
                self.schedule_reset_timer(inner);
            }
        }
    }

    async fn reset_on_silence(self: &Arc<Self>, inner: &mut Inner) {
        let Some(old) = inner.active.take() else {
            return;
        };
        self.set_state(inner, SttSessionState::Draining);
        self.drain_and_close(old.session, old.consumer).await;
        if let Some(metrics) = &self.metrics {
            metrics.stt_silence_resets.fetch_add(1, Ordering::Relaxed);
        }
        self.set_state(inner, SttSessionState::Disconnected);
    }

    fn spawn_drain_task(
        self: &Arc<Self>,
        session: Arc<dyn SttBackendSession>,
        consumer: JoinHandle<()>,
    ) -> JoinHandle<()> {
        let shared = self.clone();
        tokio::spawn(async move {
            shared.drain_and_close(session, consumer).await;
        })
    }

    async fn drain_and_close(
        self: &Arc<Self>,
        session: Arc<dyn SttBackendSession>,
        consumer: JoinHandle<()>,
    ) {
        if let Err(err) = session.stop().await {
            warn!("session stop failed during drain: {err}");
        }

        let drain_timeout = Duration::from_secs_f64(self.drain_timeout_s);
        if tokio::time::timeout(drain_timeout, consumer).await.is_err() {
            if let Some(metrics) = &self.metrics {
                metrics.stt_drain_timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Err(err) = session.close().await {
            warn!("session close failed during drain: {err}");
        }
    }
}

/// Keeps a streaming STT session alive across provider-imposed time limits,
/// correlating partial and final transcripts back to VAD utterance ids.
pub struct ManagedSttController {
    shared: Arc<Shared>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<SttEvent>>>,
}

impl ManagedSttController {
    pub fn new(
        backend: Arc<dyn SttBackend>,
        config: ManagedSttControllerConfig,
        metrics: Option<PipelineMetrics>,
    ) -> Result<Self, SttError> {
        config.validate()?;
        let ring_capacity =
            (config.sample_rate_hz as u64 * config.bridging_ms as u64 / 1000) as usize;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            backend,
            metrics,
            events_tx,
            reset_deadline_s: config.reset_deadline_s,
            drain_timeout_s: config.drain_timeout_s,
            inner: Mutex::new(Inner {
                state: SttSessionState::Disconnected,
                active: None,
                active_utterance_id: None,
                pending_final_utterance_id: None,
                audio_ring: RingBuffer::new(ring_capacity.max(1)),
                draining: Vec::new(),
                reset_timer: None,
            }),
        });

        Ok(Self {
            shared,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    /// Takes ownership of the event receiver. Call exactly once.
    pub async fn take_events(&self) -> mpsc::UnboundedReceiver<SttEvent> {
        self.events_rx
            .lock()
            .await
            .take()
            .expect("take_events called more than once")
    }

    /// Eagerly opens a session ahead of the first utterance, for first-response latency.
    pub async fn warmup(&self) -> Result<(), SttError> {
        let mut inner = self.shared.inner.lock().await;
        self.shared.ensure_session(&mut inner).await
    }

    pub async fn handle_vad_event(&self, event: VadEvent) -> Result<(), SttError> {
        let mut inner = self.shared.inner.lock().await;
        match event {
            VadEvent::SpeechStart { id, pre_roll, chunk } => {
                inner.active_utterance_id = Some(id);
                inner.pending_final_utterance_id = None;
                self.shared.ensure_session(&mut inner).await?;
                self.shared.send_live_audio(&mut inner, &pre_roll).await?;
                self.shared.send_live_audio(&mut inner, &chunk).await?;
            }
            VadEvent::SpeechChunk { chunk, .. } => {
                self.shared.ensure_session(&mut inner).await?;
                self.shared.send_live_audio(&mut inner, &chunk).await?;
            }
            VadEvent::SpeechEnd { id } => {
                inner.active_utterance_id = None;
                inner.pending_final_utterance_id = Some(id);
                if let Some(active) = inner.active.as_ref() {
                    let session = active.session.clone();
                    if let Err(err) = session.on_speech_end().await {
                        warn!("on_speech_end failed: {err}");
                        let _ = self.shared.events_tx.send(SttEvent::Error {
                            utterance_id: Some(id),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Transition to Draining, drain the active session, cancel any
    /// in-flight draining sessions, and return to Disconnected.
    pub async fn close(&self) {
        let mut inner = self.shared.inner.lock().await;
        if let Some(timer) = inner.reset_timer.take() {
            timer.abort();
        }

        if let Some(active) = inner.active.take() {
            self.shared.set_state(&mut inner, SttSessionState::Draining);
            self.shared
                .drain_and_close(active.session, active.consumer)
                .await;
        }

        let draining = std::mem::take(&mut inner.draining);
        for handle in draining {
            handle.abort();
            let _ = handle.await;
        }

        self.shared.set_state(&mut inner, SttSessionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSttBackend;
    use std::time::Duration as StdDuration;

    fn speech_start(id: Uuid) -> VadEvent {
        VadEvent::SpeechStart {
            id,
            pre_roll: vec![0.1, 0.2],
            chunk: vec![0.3, 0.4],
        }
    }

    #[tokio::test]
    async fn speech_start_opens_session_and_streams_a_partial() {
        let backend = Arc::new(MockSttBackend::new());
        let controller = ManagedSttController::new(
            backend.clone(),
            ManagedSttControllerConfig::default(),
            None,
        )
        .unwrap();
        let mut events = controller.take_events().await;

        let id = Uuid::new_v4();
        controller.handle_vad_event(speech_start(id)).await.unwrap();

        let state_event = events.recv().await.unwrap();
        assert_eq!(
            state_event,
            SttEvent::SessionState {
                state: SttSessionState::Streaming,
                utterance_id: Some(id),
            }
        );

        let partial_event = events.recv().await.unwrap();
        assert!(matches!(partial_event, SttEvent::Partial { utterance_id, .. } if utterance_id == id));
        assert_eq!(backend.sessions_opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bridging_reset_reopens_session_while_utterance_is_active() {
        let backend = Arc::new(MockSttBackend::new());
        let config = ManagedSttControllerConfig {
            reset_deadline_s: 1.0,
            ..ManagedSttControllerConfig::default()
        };
        let controller = ManagedSttController::new(backend.clone(), config, None).unwrap();
        let mut events = controller.take_events().await;

        let id = Uuid::new_v4();
        controller.handle_vad_event(speech_start(id)).await.unwrap();
        events.recv().await.unwrap(); // Streaming
        events.recv().await.unwrap(); // partial

        tokio::time::advance(StdDuration::from_millis(1100)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(StdDuration::from_millis(10)).await;

        assert_eq!(backend.sessions_opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_reset_returns_to_disconnected_after_deadline() {
        let backend = Arc::new(MockSttBackend::new());
        let config = ManagedSttControllerConfig {
            reset_deadline_s: 1.0,
            ..ManagedSttControllerConfig::default()
        };
        let controller = ManagedSttController::new(backend.clone(), config, None).unwrap();
        let mut events = controller.take_events().await;

        let id = Uuid::new_v4();
        controller.handle_vad_event(speech_start(id)).await.unwrap();
        events.recv().await.unwrap(); // Streaming
        events.recv().await.unwrap(); // partial
        controller
            .handle_vad_event(VadEvent::SpeechEnd { id })
            .await
            .unwrap();
        events.recv().await.unwrap(); // final, from on_speech_end

        tokio::time::advance(StdDuration::from_millis(1100)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(StdDuration::from_millis(10)).await;

        let mut saw_draining = false;
        let mut saw_disconnected = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(StdDuration::from_millis(50), events.recv()).await
        {
            match event {
                SttEvent::SessionState { state: SttSessionState::Draining, .. } => {
                    saw_draining = true
                }
                SttEvent::SessionState { state: SttSessionState::Disconnected, .. } => {
                    saw_disconnected = true
                }
                _ => {}
            }
        }
        assert!(saw_draining);
        assert!(saw_disconnected);
    }

    #[tokio::test]
    async fn warmup_opens_a_session_before_any_utterance() {
        let backend = Arc::new(MockSttBackend::new());
        let controller = ManagedSttController::new(
            backend.clone(),
            ManagedSttControllerConfig::default(),
            None,
        )
        .unwrap();
        controller.warmup().await.unwrap();
        assert_eq!(backend.sessions_opened(), 1);
    }

    #[tokio::test]
    async fn close_drains_active_session_and_returns_to_disconnected() {
        let backend = Arc::new(MockSttBackend::new());
        let controller = ManagedSttController::new(
            backend.clone(),
            ManagedSttControllerConfig::default(),
            None,
        )
        .unwrap();
        let mut events = controller.take_events().await;

        let id = Uuid::new_v4();
        controller.handle_vad_event(speech_start(id)).await.unwrap();
        events.recv().await.unwrap(); // Streaming
        events.recv().await.unwrap(); // partial

        controller.close().await;

        let mut saw_disconnected = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(StdDuration::from_millis(50), events.recv()).await
        {
            if let SttEvent::SessionState { state: SttSessionState::Disconnected, .. } = event {
                saw_disconnected = true;
            }
        }
        assert!(saw_disconnected);
    }

    #[tokio::test]
    async fn backend_open_failure_propagates_as_error() {
        let backend = Arc::new(crate::mock::AlwaysFailingSttBackend);
        let controller = ManagedSttController::new(
            backend,
            ManagedSttControllerConfig::default(),
            None,
        )
        .unwrap();

        let id = Uuid::new_v4();
        let result = controller.handle_vad_event(speech_start(id)).await;
        assert!(result.is_err());
    }
}
