//! Main settings module.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment, read from `VOICE_AGENT__ENVIRONMENT` or the config
/// file name passed to [`load_settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Confidence/retry/silence thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
    #[serde(default = "default_max_no_response")]
    pub max_no_response: u32,
    #[serde(default = "default_silence_window_ms")]
    pub silence_window_ms: u64,
    #[serde(default = "default_end_of_utterance_silence_ms")]
    pub end_of_utterance_silence_ms: u64,
    /// Case-insensitive triggers that force immediate escalation regardless
    /// of confidence.
    #[serde(default = "default_agent_triggers")]
    pub agent_triggers: Vec<String>,
    /// Consecutive failures for a given adapter class before the
    /// orchestrator elevates its recovery log line from `info` to `warn`.
    #[serde(default = "default_adapter_failure_warn_threshold")]
    pub adapter_failure_warn_threshold: u32,
}

fn default_confidence_threshold() -> f32 {
    0.6
}
fn default_max_retry() -> u32 {
    2
}
fn default_max_no_response() -> u32 {
    3
}
fn default_silence_window_ms() -> u64 {
    1500
}
fn default_end_of_utterance_silence_ms() -> u64 {
    1500
}
fn default_agent_triggers() -> Vec<String> {
    vec![
        "agent".to_string(),
        "executive".to_string(),
        "human".to_string(),
        "एजेंट".to_string(),
    ]
}
fn default_adapter_failure_warn_threshold() -> u32 {
    3
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_retry: default_max_retry(),
            max_no_response: default_max_no_response(),
            silence_window_ms: default_silence_window_ms(),
            end_of_utterance_silence_ms: default_end_of_utterance_silence_ms(),
            agent_triggers: default_agent_triggers(),
            adapter_failure_warn_threshold: default_adapter_failure_warn_threshold(),
        }
    }
}

impl Thresholds {
    pub fn silence_window(&self) -> Duration {
        Duration::from_millis(self.silence_window_ms)
    }

    pub fn end_of_utterance_silence(&self) -> Duration {
        Duration::from_millis(self.end_of_utterance_silence_ms)
    }
}

/// Per-adapter-class timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_understand_data_timeout_ms")]
    pub understand_ms: u64,
    #[serde(default = "default_understand_data_timeout_ms")]
    pub data_ms: u64,
    #[serde(default = "default_recognize_synthesize_timeout_ms")]
    pub recognize_ms: u64,
    #[serde(default = "default_recognize_synthesize_timeout_ms")]
    pub synthesize_ms: u64,
}

fn default_understand_data_timeout_ms() -> u64 {
    5_000
}
fn default_recognize_synthesize_timeout_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            understand_ms: default_understand_data_timeout_ms(),
            data_ms: default_understand_data_timeout_ms(),
            recognize_ms: default_recognize_synthesize_timeout_ms(),
            synthesize_ms: default_recognize_synthesize_timeout_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn understand(&self) -> Duration {
        Duration::from_millis(self.understand_ms)
    }
    pub fn data(&self) -> Duration {
        Duration::from_millis(self.data_ms)
    }
    pub fn recognize(&self) -> Duration {
        Duration::from_millis(self.recognize_ms)
    }
    pub fn synthesize(&self) -> Duration {
        Duration::from_millis(self.synthesize_ms)
    }
}

/// Which named adapter implementation to wire up per capability. This core
/// ships only stub implementations, so every selection resolves to
/// `"stub"` unless a downstream deployment registers a real provider under
/// a different name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSelection {
    #[serde(default = "default_stub")]
    pub understander: String,
    #[serde(default = "default_stub")]
    pub recognizer: String,
    #[serde(default = "default_stub")]
    pub synthesizer: String,
    #[serde(default = "default_stub")]
    pub data_client: String,
    #[serde(default = "default_stub")]
    pub handoff: String,
}

fn default_stub() -> String {
    "stub".to_string()
}

impl Default for AdapterSelection {
    fn default() -> Self {
        Self {
            understander: default_stub(),
            recognizer: default_stub(),
            synthesizer: default_stub(),
            data_client: default_stub(),
            handoff: default_stub(),
        }
    }
}

/// Backpressure policy for the turn controller's ingress buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    #[default]
    Drop,
    Queue,
}

/// Voice-activity-detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    #[serde(default = "default_silence_threshold_rms")]
    pub silence_threshold_rms: f32,
    #[serde(default = "default_min_speech_seconds")]
    pub min_speech_seconds: f32,
    #[serde(default = "default_max_silence_seconds")]
    pub max_silence_seconds: f32,
    #[serde(default = "default_zcr_speech_min")]
    pub zcr_speech_min: f32,
    #[serde(default = "default_zcr_speech_max")]
    pub zcr_speech_max: f32,
}

fn default_silence_threshold_rms() -> f32 {
    0.01
}
fn default_min_speech_seconds() -> f32 {
    0.3
}
fn default_max_silence_seconds() -> f32 {
    1.5
}
fn default_zcr_speech_min() -> f32 {
    0.02
}
fn default_zcr_speech_max() -> f32 {
    0.35
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            silence_threshold_rms: default_silence_threshold_rms(),
            min_speech_seconds: default_min_speech_seconds(),
            max_silence_seconds: default_max_silence_seconds(),
            zcr_speech_min: default_zcr_speech_min(),
            zcr_speech_max: default_zcr_speech_max(),
        }
    }
}

/// Server bind/CORS configuration, used only by `crates/server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default)]
    pub ingress_queue_depth: Option<usize>,
    #[serde(default)]
    pub backpressure_policy: BackpressurePolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: default_cors_origins(),
            ingress_queue_depth: None,
            backpressure_policy: BackpressurePolicy::default(),
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub adapters: AdapterSelection,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.thresholds.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "thresholds.confidence_threshold".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.thresholds.confidence_threshold
                ),
            });
        }
        if self.timeouts.understand_ms == 0
            || self.timeouts.data_ms == 0
            || self.timeouts.recognize_ms == 0
            || self.timeouts.synthesize_ms == 0
        {
            return Err(ConfigError::InvalidValue {
                field: "timeouts".to_string(),
                message: "adapter timeouts must be non-zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.vad.zcr_speech_min)
            || !(0.0..=1.0).contains(&self.vad.zcr_speech_max)
            || self.vad.zcr_speech_min > self.vad.zcr_speech_max
        {
            return Err(ConfigError::InvalidValue {
                field: "vad.zcr_speech_min/zcr_speech_max".to_string(),
                message: "zero-crossing-rate band must be a valid ascending range in [0, 1]"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from `config/default.{yaml}`, `config/{env}.{yaml}`, then
/// `VOICE_AGENT__*` environment variables, in that priority order (lowest
/// to highest).
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.thresholds.confidence_threshold, 0.6);
        assert_eq!(settings.thresholds.max_retry, 2);
        assert_eq!(settings.thresholds.max_no_response, 3);
        assert_eq!(settings.thresholds.silence_window_ms, 1500);
        assert_eq!(settings.thresholds.end_of_utterance_silence_ms, 1500);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_confidence_threshold_out_of_range() {
        let mut settings = Settings::default();
        settings.thresholds.confidence_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn load_settings_falls_back_to_defaults_without_files_or_env() {
        let settings = load_settings(None).expect("layered defaults alone must validate");
        assert_eq!(settings.thresholds.max_retry, 2);
    }
}
