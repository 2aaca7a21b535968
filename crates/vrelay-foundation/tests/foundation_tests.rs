//! Foundation crate tests: clock abstraction and error taxonomy.

use vrelay_foundation::clock::{fake_clock, system_clock, Clock, FakeClock};
use vrelay_foundation::error::{AudioError, ConfigError, RelayError, SttError, VadError};

#[test]
fn system_clock_now_is_nonnegative_and_monotonic() {
    let clock = system_clock();
    let t0 = clock.now();
    let t1 = clock.now();
    assert!(t0 >= 0.0);
    assert!(t1 >= t0);
}

#[test]
fn fake_clock_starts_at_zero() {
    let clock = FakeClock::new();
    assert_eq!(clock.now(), 0.0);
}

#[test]
fn fake_clock_advance_accumulates() {
    let clock = fake_clock();
    clock.advance(0.1);
    clock.advance(0.2);
    clock.advance(0.3);
    assert!((clock.now() - 0.6).abs() < 1e-9);
}

#[test]
fn audio_error_messages_include_context() {
    let err = AudioError::UnsupportedSampleRate { hz: 44_100 };
    assert!(format!("{err}").contains("44100"));

    let err = AudioError::ChunkSizeMismatch {
        expected: 512,
        actual: 256,
    };
    let msg = format!("{err}");
    assert!(msg.contains("512") && msg.contains("256"));
}

#[test]
fn vad_error_invalid_chunk_size_reports_both_sizes() {
    let err = VadError::InvalidChunkSize {
        expected: 512,
        actual: 128,
    };
    let msg = format!("{err}");
    assert!(msg.contains("512"));
    assert!(msg.contains("128"));
}

#[test]
fn stt_error_session_open_failed_preserves_reason() {
    let err = SttError::SessionOpenFailed("connection refused".to_string());
    assert!(format!("{err}").contains("connection refused"));
}

#[test]
fn relay_error_wraps_subsystem_errors() {
    let err: RelayError = AudioError::UnsupportedSampleRate { hz: 8001 }.into();
    assert!(matches!(err, RelayError::Audio(_)));

    let err: RelayError = SttError::NoActiveSession.into();
    assert!(matches!(err, RelayError::Stt(_)));
}

#[test]
fn relay_error_fatal_and_shutdown_messages() {
    let err = RelayError::Fatal("critical failure".to_string());
    assert!(format!("{err}").contains("critical failure"));

    let err = RelayError::ShutdownRequested;
    assert!(format!("{err}").contains("shutdown"));
}

#[test]
fn config_error_validation_reports_field() {
    let err = ConfigError::Validation {
        field: "sample_rate_hz".to_string(),
        reason: "must be 8000 or 16000".to_string(),
    };
    assert!(format!("{err}").contains("sample_rate_hz"));
}
