//! `qwak models build` command construction
//!
//! Turns an [`ActionConfig`] into the argument vector for the build CLI.
//! Every option is optional: an unset or empty value omits its flag entirely,
//! list options repeat their flag once per element in input order. The
//! builder never fails.

use std::fmt;

use crate::config::ActionConfig;

/// Subcommand passed to the CLI before any flags
pub const BUILD_SUBCOMMAND: [&str; 2] = ["models", "build"];

/// True when a boolean option value enables its flag (`"true"`, any case)
pub fn flag_enabled(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// JSON logs stay on unless the value is exactly `"false"` (any case)
pub fn json_logs_enabled(value: &str) -> bool {
    !value.eq_ignore_ascii_case("false")
}

/// Split a comma-separated list, keeping element order and empty elements
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// A fully assembled build invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    program: String,
    args: Vec<String>,
}

impl BuildCommand {
    /// Assemble the build command from configuration
    pub fn from_config(config: &ActionConfig) -> Self {
        let mut args: Vec<String> = BUILD_SUBCOMMAND.iter().map(|s| s.to_string()).collect();

        push_option(&mut args, "--model-id", config.model_id.as_deref());

        if let Some(path) = non_empty(config.model_path.as_deref()) {
            args.push(path.to_string());
        }

        push_option(&mut args, "--main-dir", config.main_dir.as_deref());
        push_repeated(&mut args, "-P", &config.params);
        push_repeated(&mut args, "-E", &config.env_vars);
        push_repeated(&mut args, "-T", &config.tags);
        push_option(&mut args, "--instance", config.instance.as_deref());
        push_option(&mut args, "--cpus", config.cpus.as_deref());
        push_option(&mut args, "--memory", config.memory.as_deref());
        push_option(&mut args, "--base-image", config.base_image.as_deref());
        push_option(&mut args, "--iam-role-arn", config.iam_role_arn.as_deref());

        if config.gpu_compatible {
            args.push("--gpu-compatible".to_string());
        }

        push_option(&mut args, "--environment", config.environment.as_deref());

        if config.logs_as_json {
            args.push("--json-logs".to_string());
        }

        Self {
            program: config.cli_path.clone(),
            args,
        }
    }

    /// Executable to spawn
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments following the executable
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Space-joined command line, as printed to the CI log
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn push_option(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = non_empty(value) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn push_repeated(args: &mut Vec<String>, flag: &str, values: &[String]) {
    for value in values {
        args.push(flag.to_string());
        args.push(value.clone());
    }
}
