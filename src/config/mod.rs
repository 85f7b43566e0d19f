//! Action configuration
//!
//! Configuration is merged from four layers, last wins:
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`)
//! 3. Process environment (`MODEL_ID`, `PARAM_LIST`, `GITHUB_ENV`, ...)
//! 4. CLI flags
//!
//! The merged value is deserialized once into [`ActionConfig`]; nothing past
//! the entry point reads the process environment.

mod defaults;
mod effective;
mod env;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ActionConfig, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use env::{env_layer, EnvKind, EnvVar, ENV_VARS};
pub use merge::{deep_merge, merge_layers};
