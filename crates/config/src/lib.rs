//! Configuration loading, validation and env substitution.
//!
//! Config files: `courier.toml`, `courier.yaml`, `courier.yml` or `courier.json`,
//! searched in `./` then in the user config directory (`~/.config/courier/`).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, find_config_file, load, load_config},
    schema::{
        AssetConfig, CourierConfig, EngineConfig, FollowupConfig, FollowupScriptConfig,
        RetryConfig, RevealConfig, ScriptConfig, StepConfig, TelegramConfig, TextFormat,
    },
    validate::{Diagnostic, Severity, validate},
};
