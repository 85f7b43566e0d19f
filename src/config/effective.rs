//! Effective configuration with provenance
//!
//! [`EffectiveConfig`] is the merged [`ActionConfig`] plus the list of layers
//! that contributed to it. File layers carry a SHA-256 digest of the raw
//! bytes so the run summary records exactly which file was used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::BuiltinDefaults;
use super::env::env_layer;
use super::merge::merge_layers;
use crate::command::split_list;

/// Settings for one action run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionConfig {
    pub model_id: Option<String>,

    /// Passed to the CLI as a bare positional argument
    pub model_path: Option<String>,

    pub main_dir: Option<String>,

    /// `-P` build parameters
    #[serde(deserialize_with = "list_or_csv")]
    pub params: Vec<String>,

    /// `-E` environment variables for the build
    #[serde(deserialize_with = "list_or_csv")]
    pub env_vars: Vec<String>,

    /// `-T` tags
    #[serde(deserialize_with = "list_or_csv")]
    pub tags: Vec<String>,

    pub instance: Option<String>,

    #[serde(deserialize_with = "opt_string_or_number")]
    pub cpus: Option<String>,

    #[serde(deserialize_with = "opt_string_or_number")]
    pub memory: Option<String>,

    pub base_image: Option<String>,

    pub iam_role_arn: Option<String>,

    pub gpu_compatible: bool,

    pub environment: Option<String>,

    pub logs_as_json: bool,

    /// Deadline for the remote build, in minutes
    pub timeout_minutes: u64,

    pub poll_interval_secs: u64,

    /// Build CLI executable
    pub cli_path: String,

    /// Status query template, `{build_id}` is substituted
    ///
    /// Split on whitespace with no quoting: a program path or argument
    /// containing spaces cannot be expressed. Point it at a wrapper script
    /// instead.
    pub status_command: String,

    /// CI environment file receiving the build outputs
    pub env_file: Option<PathBuf>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            model_id: None,
            model_path: None,
            main_dir: None,
            params: Vec::new(),
            env_vars: Vec::new(),
            tags: Vec::new(),
            instance: None,
            cpus: None,
            memory: None,
            base_image: None,
            iam_role_arn: None,
            gpu_compatible: false,
            environment: None,
            logs_as_json: defaults.logs_as_json,
            timeout_minutes: defaults.timeout_minutes,
            poll_interval_secs: defaults.poll_interval_secs,
            cli_path: defaults.cli_path,
            status_command: defaults.status_command,
            env_file: None,
        }
    }
}

impl ActionConfig {
    /// Overall wait deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 || self.poll_interval_secs > 3600 {
            return Err(ConfigError::ValidationError(format!(
                "poll_interval_secs must be in (0, 3600], got {}",
                self.poll_interval_secs
            )));
        }

        if self.cli_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cli_path must not be empty".to_string(),
            ));
        }

        if !self.status_command.contains("{build_id}") {
            return Err(ConfigError::ValidationError(
                "status_command must contain the {build_id} placeholder".to_string(),
            ));
        }

        Ok(())
    }
}

/// Accepts either a TOML/JSON array or a comma-separated string
fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(s) if s.is_empty() => Vec::new(),
        ListOrCsv::Csv(s) => split_list(&s),
    })
}

/// `cpus = 2` and `cpus = "2"` are both accepted
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn layer(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
        }
    }
}

/// Merged configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    pub config: ActionConfig,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build from explicit layers
    ///
    /// `env` is the already-mapped environment layer (see [`env_layer`]).
    pub fn build(
        config_file: Option<&Path>,
        env: Option<Value>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource::layer(ConfigOrigin::Builtin)];

        if let Some(path) = config_file {
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(env) = env {
            layers.push(env);
            sources.push(ConfigSource::layer(ConfigOrigin::Env));
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource::layer(ConfigOrigin::Cli));
        }

        let merged = merge_layers(layers);
        let config: ActionConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;

        Ok(Self {
            created_at: Utc::now(),
            config,
            sources,
        })
    }

    /// Build using the current process environment as layer 3
    pub fn from_process_env(
        config_file: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let env = env_layer(|name| std::env::var(name).ok())?;
        Self::build(config_file, Some(env), cli_overrides)
    }

    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let digest = hex::encode(Sha256::digest(&bytes));

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_build_with_defaults_only() {
        let effective = EffectiveConfig::build(None, None, None).unwrap();

        assert_eq!(effective.config, ActionConfig::default());
        assert_eq!(effective.config.timeout_minutes, 30);
        assert!(effective.config.logs_as_json);
        assert_eq!(effective.sources.len(), 1);
        assert_eq!(effective.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_env_layer_overrides_defaults() {
        let env = json!({"timeout_minutes": 5, "logs_as_json": false, "tags": ["a", "b"]});
        let config = EffectiveConfig::build(None, Some(env), None).unwrap().config;

        assert_eq!(config.timeout_minutes, 5);
        assert!(!config.logs_as_json);
        assert_eq!(config.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_file_layer_with_digest() {
        let file = toml_file(
            r#"
model_id = "churn"
params = "lr=0.1,epochs=3"
tags = ["nightly"]
cpus = 2
gpu_compatible = true
"#,
        );

        let effective = EffectiveConfig::build(Some(file.path()), None, None).unwrap();
        let config = &effective.config;

        assert_eq!(config.model_id.as_deref(), Some("churn"));
        assert_eq!(config.params, vec!["lr=0.1", "epochs=3"]);
        assert_eq!(config.tags, vec!["nightly"]);
        assert_eq!(config.cpus.as_deref(), Some("2"));
        assert!(config.gpu_compatible);

        let source = &effective.sources[1];
        assert_eq!(source.origin, ConfigOrigin::File);
        assert_eq!(source.digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_precedence_file_env_cli() {
        let file = toml_file("model_id = \"from-file\"\ntimeout_minutes = 60\n");
        let env = json!({"model_id": "from-env", "timeout_minutes": 20});
        let cli = json!({"timeout_minutes": 1});

        let effective = EffectiveConfig::build(Some(file.path()), Some(env), Some(cli)).unwrap();

        assert_eq!(effective.config.model_id.as_deref(), Some("from-env"));
        assert_eq!(effective.config.timeout_minutes, 1);
        let origins: Vec<_> = effective.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::File, ConfigOrigin::Env, ConfigOrigin::Cli]
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = toml_file("model_idd = \"typo\"\n");
        let err = EffectiveConfig::build(Some(file.path()), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err =
            EffectiveConfig::build(Some(Path::new("/nonexistent/action.toml")), None, None)
                .unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let file = toml_file("model_id = \n");
        let err = EffectiveConfig::build(Some(file.path()), None, None).unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = EffectiveConfig::build(None, None, Some(json!({"poll_interval_secs": 0})))
            .unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn test_status_command_needs_placeholder() {
        let cli = json!({"status_command": "qwak models builds status"});
        let err = EffectiveConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("{build_id}"));
    }

    #[test]
    fn test_zero_timeout_allowed() {
        let config = EffectiveConfig::build(None, None, Some(json!({"timeout_minutes": 0})))
            .unwrap()
            .config;
        assert_eq!(config.timeout(), Duration::ZERO);
    }

    #[test]
    fn test_durations() {
        let config = ActionConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(1800));
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
    }
}
