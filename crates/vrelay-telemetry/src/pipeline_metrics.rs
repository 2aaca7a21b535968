use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared, cross-thread counters for the voice-relay pipeline.
///
/// Cloning yields another handle onto the same underlying atomics, matching
/// the shared-metrics-handle convention used throughout the pipeline.
#[derive(Clone)]
pub struct PipelineMetrics {
    pub vad_speech_segments: Arc<AtomicU64>,
    pub vad_processing_errors: Arc<AtomicU64>,

    pub stt_sessions_opened: Arc<AtomicU64>,
    pub stt_bridging_resets: Arc<AtomicU64>,
    pub stt_silence_resets: Arc<AtomicU64>,
    pub stt_session_errors: Arc<AtomicU64>,
    pub stt_drain_timeouts: Arc<AtomicU64>,

    pub llm_requests: Arc<AtomicU64>,
    pub llm_failures: Arc<AtomicU64>,
    pub llm_last_latency_ms: Arc<AtomicU64>,

    pub osc_messages_sent: Arc<AtomicU64>,
    pub osc_messages_expired: Arc<AtomicU64>,
    pub osc_send_errors: Arc<AtomicU64>,

    e2e_latency: Arc<RwLock<LatencyAccumulator>>,
}

#[derive(Default)]
struct LatencyAccumulator {
    count: u64,
    sum_ms: u64,
    last_ms: u64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            vad_speech_segments: Arc::new(AtomicU64::new(0)),
            vad_processing_errors: Arc::new(AtomicU64::new(0)),

            stt_sessions_opened: Arc::new(AtomicU64::new(0)),
            stt_bridging_resets: Arc::new(AtomicU64::new(0)),
            stt_silence_resets: Arc::new(AtomicU64::new(0)),
            stt_session_errors: Arc::new(AtomicU64::new(0)),
            stt_drain_timeouts: Arc::new(AtomicU64::new(0)),

            llm_requests: Arc::new(AtomicU64::new(0)),
            llm_failures: Arc::new(AtomicU64::new(0)),
            llm_last_latency_ms: Arc::new(AtomicU64::new(0)),

            osc_messages_sent: Arc::new(AtomicU64::new(0)),
            osc_messages_expired: Arc::new(AtomicU64::new(0)),
            osc_send_errors: Arc::new(AtomicU64::new(0)),

            e2e_latency: Arc::new(RwLock::new(LatencyAccumulator::default())),
        }
    }
}

impl PipelineMetrics {
    pub fn record_speech_segment(&self) {
        self.vad_speech_segments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bridging_reset(&self) {
        self.stt_bridging_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_silence_reset(&self) {
        self.stt_silence_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_llm_request(&self, latency_ms: u64, ok: bool) {
        self.llm_requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.llm_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.llm_last_latency_ms.store(latency_ms, Ordering::Relaxed);
    }

    pub fn record_osc_sent(&self) {
        self.osc_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_osc_expired(&self, count: u64) {
        self.osc_messages_expired.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an end-to-end (speech-end to OSC-enqueue) latency sample, in
    /// milliseconds. Average is recoverable from `e2e_latency_average_ms`.
    pub fn record_e2e_latency_ms(&self, latency_ms: u64) {
        let mut acc = self.e2e_latency.write();
        acc.count += 1;
        acc.sum_ms += latency_ms;
        acc.last_ms = latency_ms;
    }

    pub fn e2e_latency_last_ms(&self) -> u64 {
        self.e2e_latency.read().last_ms
    }

    pub fn e2e_latency_average_ms(&self) -> f64 {
        let acc = self.e2e_latency.read();
        if acc.count == 0 {
            0.0
        } else {
            acc.sum_ms as f64 / acc.count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_averages_e2e_latency() {
        let metrics = PipelineMetrics::default();
        metrics.record_e2e_latency_ms(100);
        metrics.record_e2e_latency_ms(300);
        assert_eq!(metrics.e2e_latency_last_ms(), 300);
        assert!((metrics.e2e_latency_average_ms() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn llm_failure_increments_both_counters() {
        let metrics = PipelineMetrics::default();
        metrics.record_llm_request(50, false);
        assert_eq!(metrics.llm_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.llm_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cloned_handle_shares_state() {
        let metrics = PipelineMetrics::default();
        let clone = metrics.clone();
        clone.record_speech_segment();
        assert_eq!(metrics.vad_speech_segments.load(Ordering::Relaxed), 1);
    }
}
