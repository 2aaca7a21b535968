// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/vrelay.log.
// - Default log level is INFO. Control via RUST_LOG:
//   * RUST_LOG=info                       # standard logging (default)
//   * RUST_LOG=debug                      # includes reset/cooldown decisions
//   * RUST_LOG=vrelay_app=debug,vrelay_stt=trace
// - The logs/ directory is created on startup if missing; file output uses a non-blocking writer.
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vrelay_app::config::RelayConfig;
use vrelay_app::orchestrator::{Orchestrator, OrchestratorConfig};
use vrelay_app::pipeline::AudioPipeline;
use vrelay_audio::{AudioSource, MockAudioSource, RawAudioFrame};
use vrelay_foundation::clock::system_clock;
use vrelay_llm::mock::EchoLlmProvider;
use vrelay_llm::{LlmProvider, SemaphoreLlmProvider};
use vrelay_osc::{ChatboxOscClient, SmartOscQueue, SmartOscQueueConfig, UdpOscSender};
use vrelay_stt::mock::MockSttBackend;
use vrelay_stt::{ManagedSttController, ManagedSttControllerConfig};
use vrelay_telemetry::PipelineMetrics;
use vrelay_vad::{EnergyVadEngine, VadGating, VadGatingConfig};

/// Builds the capture source until a real microphone/vendor driver is
/// registered (see [`vrelay_audio::source::AudioSource`]). Mirrors the
/// mock-stt/echo-llm stand-ins above: a short burst of loud samples
/// followed by silence, enough to exercise VAD speech-start/end gating.
fn placeholder_audio_source(sample_rate_hz: u32, channels: u32) -> Box<dyn AudioSource> {
    let frame_len = (sample_rate_hz / 20).max(1) as usize;
    let loud = vec![0.8_f32; frame_len * channels as usize];
    let silent = vec![0.0_f32; frame_len * channels as usize];
    let frames = vec![
        RawAudioFrame::new(loud.clone(), channels, sample_rate_hz),
        RawAudioFrame::new(loud, channels, sample_rate_hz),
        RawAudioFrame::new(silent.clone(), channels, sample_rate_hz),
        RawAudioFrame::new(silent, channels, sample_rate_hz),
    ];
    Box::new(MockAudioSource::new(frames))
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>>
{
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "vrelay.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Prune rotated log files in `logs/` older than `retention_days` days.
/// `Some(0)` disables pruning. Default is 7 days when `None`.
fn prune_old_logs(retention_days: Option<u64>) {
    let retention = retention_days.unwrap_or(7);
    if retention == 0 {
        tracing::debug!("log retention disabled (retention_days=0)");
        return;
    }

    let cutoff = match SystemTime::now().checked_sub(Duration::from_secs(retention * 24 * 60 * 60))
    {
        Some(t) => t,
        None => return,
    };

    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        return;
    }

    match fs::read_dir(logs_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    if name.starts_with("vrelay.log.") {
                        if let Ok(meta) = entry.metadata() {
                            if let Ok(modified) = meta.modified() {
                                if modified < cutoff {
                                    if let Err(e) = fs::remove_file(&path) {
                                        tracing::warn!(
                                            "failed to remove old log {}: {}",
                                            path.display(),
                                            e
                                        );
                                    } else {
                                        tracing::info!("removed old log file: {}", path.display());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Err(e) => tracing::warn!("failed to read logs directory for pruning: {}", e),
    }
}

#[derive(Parser, Debug)]
#[command(name = "vrelay", author, version, about = "Realtime speech-translation relay")]
struct Cli {
    /// Path to a TOML config file. Falls back to built-in defaults if absent.
    #[arg(long = "config")]
    config: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long = "print-config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_logging()?;
    let retention_days = std::env::var("VRELAY_LOG_RETENTION_DAYS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());
    prune_old_logs(retention_days);
    tracing::info!("starting relay");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            RelayConfig::from_toml_str(&contents)?
        }
        None => {
            let config = RelayConfig::default();
            config.validate()?;
            config
        }
    };

    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let clock = system_clock();
    let metrics = PipelineMetrics::default();

    // STT and LLM backends are external contracts (see the configuration
    // surface docs); no vendor adapter ships in this binary. The mock
    // backend and echo provider below stand in until one is registered.
    tracing::warn!("no vendor stt backend configured; running with the in-process mock backend");
    let stt_backend = Arc::new(MockSttBackend::new());
    let stt_config = ManagedSttControllerConfig {
        sample_rate_hz: config.audio.internal_sample_rate_hz,
        reset_deadline_s: config.stt.reset_deadline_s,
        drain_timeout_s: config.stt.drain_timeout_s,
        ..ManagedSttControllerConfig::default()
    };
    let stt = Arc::new(ManagedSttController::new(stt_backend, stt_config, Some(metrics.clone()))?);

    let llm: Option<Arc<dyn LlmProvider>> = if config.translation_enabled {
        tracing::warn!("no vendor llm provider configured; running with the echo provider");
        let inner: Arc<dyn LlmProvider> = Arc::new(EchoLlmProvider::default());
        Some(Arc::new(SemaphoreLlmProvider::new(inner, config.llm.concurrency_limit)))
    } else {
        None
    };

    let sender = Arc::new(UdpOscSender::connect(&config.osc.host, config.osc.port).await?);
    let chatbox_client = Arc::new(ChatboxOscClient::new(
        sender,
        config.osc.chatbox_address.clone(),
        config.osc.typing_address.clone(),
    ));
    let osc_queue = Arc::new(SmartOscQueue::new(
        chatbox_client,
        clock.clone(),
        SmartOscQueueConfig {
            max_chars: config.osc.chatbox_max_chars,
            cooldown_s: config.osc.cooldown_s,
            ttl_s: config.osc.ttl_s,
        },
        Some(metrics.clone()),
    ));

    let orchestrator_config = OrchestratorConfig {
        source_lang: config.languages.source_language.clone(),
        target_lang: config.languages.target_language.clone(),
        system_prompt: config.system_prompt.clone(),
        fallback_transcript_only: config.fallback_transcript_only,
        translation_enabled: config.translation_enabled,
        context_time_window_s: config.context_time_window_s,
        context_max_entries: config.context_max_entries,
        hangover_s: config.hangover_s,
    };

    let orchestrator = Arc::new(Orchestrator::new(
        stt,
        llm,
        osc_queue,
        clock,
        orchestrator_config,
        Some(metrics),
    ));
    orchestrator.start(true).await;

    tracing::warn!("no capture driver configured; running with the in-process mock audio source");
    let vad_engine = Box::new(EnergyVadEngine::default());
    let vad_config = VadGatingConfig {
        sample_rate_hz: config.audio.internal_sample_rate_hz,
        ring_buffer_ms: config.audio.ring_buffer_ms,
        speech_threshold: config.stt.vad_speech_threshold,
        hangover_ms: (config.hangover_s * 1000.0).round() as u32,
        chunk_samples: None,
    };
    let gating = VadGating::new(vad_engine, vad_config)?;
    let audio_source = placeholder_audio_source(
        config.audio.internal_sample_rate_hz,
        config.audio.internal_channels,
    );
    let mut pipeline =
        AudioPipeline::new(audio_source, gating, config.audio.internal_sample_rate_hz);

    let pipeline_orchestrator = orchestrator.clone();
    let pipeline_task: tokio::task::JoinHandle<()> = tokio::spawn(async move {
        if let Err(err) = pipeline.run(&pipeline_orchestrator).await {
            tracing::error!("audio pipeline stopped: {err}");
        }
    });

    tracing::info!("relay running, waiting for ctrl-c");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    pipeline_task.abort();
    orchestrator.stop().await;

    Ok(())
}
