//! Persisted (opaque JSON or TOML) configuration surface, per §6.

use serde::{Deserialize, Serialize};

use vrelay_foundation::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub internal_sample_rate_hz: u32,
    pub internal_channels: u32,
    pub ring_buffer_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            internal_sample_rate_hz: 16_000,
            internal_channels: 1,
            ring_buffer_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    pub drain_timeout_s: f64,
    pub vad_speech_threshold: f32,
    pub reset_deadline_s: f64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            drain_timeout_s: 1.5,
            vad_speech_threshold: 0.5,
            reset_deadline_s: 180.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
    pub chatbox_address: String,
    pub typing_address: String,
    pub chatbox_max_chars: usize,
    pub cooldown_s: f64,
    pub ttl_s: f64,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            chatbox_address: "/chatbox/input".to_string(),
            typing_address: "/chatbox/typing".to_string(),
            chatbox_max_chars: 144,
            cooldown_s: 1.5,
            ttl_s: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesConfig {
    pub source_language: String,
    pub target_language: String,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "ja".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub concurrency_limit: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { concurrency_limit: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub osc: OscConfig,
    pub languages: LanguagesConfig,
    pub llm: LlmConfig,
    pub system_prompt: String,
    #[serde(default)]
    pub translation_enabled: bool,
    #[serde(default)]
    pub fallback_transcript_only: bool,
    #[serde(default = "default_context_time_window_s")]
    pub context_time_window_s: f64,
    #[serde(default = "default_context_max_entries")]
    pub context_max_entries: usize,
    #[serde(default = "default_hangover_s")]
    pub hangover_s: f64,
}

fn default_context_time_window_s() -> f64 {
    120.0
}

fn default_context_max_entries() -> usize {
    8
}

fn default_hangover_s() -> f64 {
    1.2
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            stt: SttConfig::default(),
            osc: OscConfig::default(),
            languages: LanguagesConfig::default(),
            llm: LlmConfig::default(),
            system_prompt: "Translate ${sourceName} to ${targetName}.".to_string(),
            translation_enabled: true,
            fallback_transcript_only: true,
            context_time_window_s: default_context_time_window_s(),
            context_max_entries: default_context_max_entries(),
            hangover_s: default_hangover_s(),
        }
    }
}

impl RelayConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.audio.internal_sample_rate_hz, 8_000 | 16_000) {
            return Err(ConfigError::Validation {
                field: "audio.internal_sample_rate_hz".into(),
                reason: "must be 8000 or 16000".into(),
            });
        }
        if self.audio.internal_channels != 1 {
            return Err(ConfigError::Validation {
                field: "audio.internal_channels".into(),
                reason: "must be 1".into(),
            });
        }
        if self.audio.ring_buffer_ms == 0 {
            return Err(ConfigError::Validation {
                field: "audio.ring_buffer_ms".into(),
                reason: "must be positive".into(),
            });
        }
        if self.stt.drain_timeout_s <= 0.0 {
            return Err(ConfigError::Validation {
                field: "stt.drain_timeout_s".into(),
                reason: "must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.stt.vad_speech_threshold) {
            return Err(ConfigError::Validation {
                field: "stt.vad_speech_threshold".into(),
                reason: "must be within [0, 1]".into(),
            });
        }
        if self.stt.reset_deadline_s <= 0.0 {
            return Err(ConfigError::Validation {
                field: "stt.reset_deadline_s".into(),
                reason: "must be positive".into(),
            });
        }
        if self.osc.port == 0 {
            return Err(ConfigError::Validation {
                field: "osc.port".into(),
                reason: "must be within 1..=65535".into(),
            });
        }
        if !self.osc.chatbox_address.starts_with('/') {
            return Err(ConfigError::Validation {
                field: "osc.chatbox_address".into(),
                reason: "must start with '/'".into(),
            });
        }
        if self.osc.chatbox_max_chars == 0 {
            return Err(ConfigError::Validation {
                field: "osc.chatbox_max_chars".into(),
                reason: "must be positive".into(),
            });
        }
        if self.osc.cooldown_s <= 0.0 {
            return Err(ConfigError::Validation {
                field: "osc.cooldown_s".into(),
                reason: "must be positive".into(),
            });
        }
        if self.osc.ttl_s <= 0.0 {
            return Err(ConfigError::Validation {
                field: "osc.ttl_s".into(),
                reason: "must be positive".into(),
            });
        }
        if self.llm.concurrency_limit < 1 {
            return Err(ConfigError::Validation {
                field: "llm.concurrency_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        RelayConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let mut config = RelayConfig::default();
        config.audio.internal_sample_rate_hz = 44_100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_chatbox_address_missing_leading_slash() {
        let mut config = RelayConfig::default();
        config.osc.chatbox_address = "chatbox/input".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = RelayConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = RelayConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.osc.port, config.osc.port);
    }
}
