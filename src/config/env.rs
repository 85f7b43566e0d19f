//! Environment layer (layer 3)
//!
//! Maps the action's environment variables onto config keys. Values are read
//! through a lookup function so the layer can be built from a fixture map in
//! tests. Empty values count as unset.

use serde_json::{Map, Value};

use super::effective::ConfigError;
use crate::command::{flag_enabled, json_logs_enabled, split_list};

/// How a variable's raw string becomes a config value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    Text,
    /// Comma-separated, one element per flag occurrence
    List,
    /// Enabled only by `"true"` (any case)
    Flag,
    /// Enabled unless `"false"` (any case)
    DefaultOnFlag,
    Minutes,
    Path,
}

/// A recognized environment variable
#[derive(Debug, Clone, Copy)]
pub struct EnvVar {
    /// Variable name
    pub name: &'static str,
    /// GitHub Actions input spelling, consulted when `name` is unset
    pub input_name: Option<&'static str>,
    /// Config key the value lands on
    pub key: &'static str,
    pub kind: EnvKind,
}

const fn env_var(
    name: &'static str,
    input_name: Option<&'static str>,
    key: &'static str,
    kind: EnvKind,
) -> EnvVar {
    EnvVar { name, input_name, key, kind }
}

/// Every variable the action reads
pub const ENV_VARS: &[EnvVar] = &[
    env_var("MODEL_ID", Some("INPUT_MODEL-ID"), "model_id", EnvKind::Text),
    env_var("MODEL_PATH", Some("INPUT_MODEL-PATH"), "model_path", EnvKind::Text),
    env_var("MAIN_DIR_NAME", Some("INPUT_MAIN-DIR"), "main_dir", EnvKind::Text),
    env_var("PARAM_LIST", Some("INPUT_PARAM-LIST"), "params", EnvKind::List),
    env_var("ENV_VARS", Some("INPUT_ENV-VARS"), "env_vars", EnvKind::List),
    env_var("TAGS", Some("INPUT_TAGS"), "tags", EnvKind::List),
    env_var("INSTANCE", Some("INPUT_INSTANCE"), "instance", EnvKind::Text),
    env_var("CPUS", Some("INPUT_CPU"), "cpus", EnvKind::Text),
    env_var("MEMORY", Some("INPUT_MEMORY"), "memory", EnvKind::Text),
    env_var("BASE_IMAGE", Some("INPUT_BASE-IMAGE"), "base_image", EnvKind::Text),
    env_var("IAM_ROLE_ARN", Some("INPUT_IAM-ROLE-ARN"), "iam_role_arn", EnvKind::Text),
    env_var("GPU_COMPATIBLE", Some("INPUT_GPU-COMPATIBLE"), "gpu_compatible", EnvKind::Flag),
    env_var("ENVIRONMENT", Some("INPUT_ENVIRONMENT"), "environment", EnvKind::Text),
    env_var("LOGS_AS_JSON", Some("INPUT_LOGS-AS-JSON"), "logs_as_json", EnvKind::DefaultOnFlag),
    env_var("INPUT_TIMEOUT_AFTER", None, "timeout_minutes", EnvKind::Minutes),
    env_var("GITHUB_ENV", None, "env_file", EnvKind::Path),
    env_var("QWAK_CLI", None, "cli_path", EnvKind::Text),
    env_var("QWAK_STATUS_COMMAND", None, "status_command", EnvKind::Text),
];

/// Build the environment layer from a variable lookup
pub fn env_layer<F>(lookup: F) -> Result<Value, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut map = Map::new();

    for var in ENV_VARS {
        let raw = lookup(var.name)
            .filter(|v| !v.is_empty())
            .or_else(|| {
                var.input_name
                    .and_then(|name| lookup(name))
                    .filter(|v| !v.is_empty())
            });

        let Some(raw) = raw else {
            continue;
        };

        let value = match var.kind {
            EnvKind::Text | EnvKind::Path => Value::String(raw),
            EnvKind::List => Value::from(split_list(&raw)),
            EnvKind::Flag => Value::Bool(flag_enabled(&raw)),
            EnvKind::DefaultOnFlag => Value::Bool(json_logs_enabled(&raw)),
            EnvKind::Minutes => {
                let minutes: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::ValidationError(format!(
                        "{} must be a whole number of minutes, got {:?}",
                        var.name, raw
                    ))
                })?;
                Value::from(minutes)
            }
        };

        map.insert(var.key.to_string(), value);
    }

    Ok(Value::Object(map))
}
