//! Layered configuration and static prompt tables for the driver-support
//! conversation orchestrator.
//!
//! Supports loading configuration from:
//! - `config/default.yaml`
//! - `config/{environment}.yaml`
//! - environment variables (`VOICE_AGENT__` prefix, `__` nesting separator)

pub mod prompts;
pub mod settings;

pub use prompts::{PromptBucket, PromptTable};
pub use settings::{
    load_settings, AdapterSelection, BackpressurePolicy, RuntimeEnvironment, ServerConfig,
    Settings, Thresholds, TimeoutConfig, VadConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
