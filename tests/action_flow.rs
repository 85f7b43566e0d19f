//! End-to-end action flow tests
//!
//! Drive the pipeline from an environment map through command construction,
//! CLI execution, id extraction, polling and env file output.

use qwak_build_action::config::env_layer;
use qwak_build_action::{
    BuildCommand, BuildStatus, CommandOutput, CommandRunner, EffectiveConfig, ExitCode, Outcome,
    Pipeline, PipelineError, RunnerError, ScriptedStatusClient,
};
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

/// Runner that records the command and returns canned output
struct RecordingRunner {
    stdout: String,
    exit_code: i32,
    commands: RefCell<Vec<BuildCommand>>,
}

impl RecordingRunner {
    fn printing_build_id(build_id: &str) -> Self {
        Self {
            stdout: format!(
                "Fetching model code\nBuild ID \x1b[4m{}\x1b[0m triggered remotely\n",
                build_id
            ),
            exit_code: 0,
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &BuildCommand) -> Result<CommandOutput, RunnerError> {
        self.commands.borrow_mut().push(command.clone());
        Ok(CommandOutput {
            exit_code: Some(self.exit_code),
            stdout: self.stdout.clone(),
            stderr: String::new(),
        })
    }
}

fn effective_config(vars: &[(&str, &str)], dir: &TempDir) -> EffectiveConfig {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert(
        "GITHUB_ENV".to_string(),
        dir.path().join("github_env").to_string_lossy().to_string(),
    );

    let env = env_layer(|name| map.get(name).cloned()).unwrap();
    let mut effective = EffectiveConfig::build(None, Some(env), None).unwrap();
    effective.config.poll_interval_secs = 0;
    effective
}

fn read_env_file(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("github_env")).unwrap()
}

// =============================================================================
// Command construction from the environment
// =============================================================================

#[test]
fn test_model_id_path_gpu_from_environment() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(
        &[
            ("MODEL_ID", "123"),
            ("MODEL_PATH", "/path/to/model"),
            ("GPU_COMPATIBLE", "true"),
        ],
        &dir,
    )
    .config;

    let rendered = BuildCommand::from_config(&config).render();

    assert_eq!(
        rendered,
        "qwak models build --model-id 123 /path/to/model --gpu-compatible --json-logs"
    );
}

#[test]
fn test_action_input_spelling() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(
        &[
            ("INPUT_MODEL-ID", "123"),
            ("INPUT_MODEL-PATH", "/path/to/model"),
            ("INPUT_CPU", "2"),
            ("INPUT_MEMORY", "4G"),
            ("INPUT_GPU-COMPATIBLE", "true"),
            ("INPUT_LOGS-AS-JSON", "true"),
        ],
        &dir,
    )
    .config;

    assert_eq!(
        BuildCommand::from_config(&config).render(),
        "qwak models build --model-id 123 /path/to/model --cpus 2 --memory 4G --gpu-compatible --json-logs"
    );
}

#[test]
fn test_every_subset_of_inputs() {
    let inputs: [(&str, &str, &str, usize); 6] = [
        ("MODEL_ID", "m-1", "--model-id", 1),
        ("MAIN_DIR_NAME", "main", "--main-dir", 1),
        ("PARAM_LIST", "a=1,b=2,c=3", "-P", 3),
        ("ENV_VARS", "X=1,Y=2", "-E", 2),
        ("TAGS", "t", "-T", 1),
        ("IAM_ROLE_ARN", "arn:aws:iam::1:role/r", "--iam-role-arn", 1),
    ];

    for mask in 0u32..(1 << inputs.len()) {
        let dir = TempDir::new().unwrap();
        let vars: Vec<(&str, &str)> = inputs
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, (name, value, _, _))| (*name, *value))
            .collect();

        let command = BuildCommand::from_config(&effective_config(&vars, &dir).config);

        for (i, (_, value, flag, count)) in inputs.iter().enumerate() {
            let occurrences = command.args().iter().filter(|a| a == flag).count();
            let expected = if mask & (1 << i) != 0 { *count } else { 0 };
            assert_eq!(occurrences, expected, "flag {} with mask {:b}", flag, mask);

            if expected > 0 {
                let values: Vec<&str> = command
                    .args()
                    .windows(2)
                    .filter(|w| w[0] == *flag)
                    .map(|w| w[1].as_str())
                    .collect();
                assert_eq!(values, value.split(',').collect::<Vec<_>>());
            }
        }
        assert_eq!(command.args().iter().filter(|a| *a == "--json-logs").count(), 1);
    }
}

#[test]
fn test_json_logs_values() {
    for (value, expected) in [("false", false), ("FALSE", false), ("true", true), ("0", true), ("", true)] {
        let dir = TempDir::new().unwrap();
        let config = effective_config(&[("LOGS_AS_JSON", value)], &dir).config;
        let has_flag = BuildCommand::from_config(&config)
            .args()
            .iter()
            .any(|a| a == "--json-logs");
        assert_eq!(has_flag, expected, "LOGS_AS_JSON={:?}", value);
    }
}

#[test]
fn test_timeout_from_environment() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(&[("INPUT_TIMEOUT_AFTER", "5")], &dir).config;
    assert_eq!(config.timeout_minutes, 5);

    let defaulted = effective_config(&[], &dir).config;
    assert_eq!(defaulted.timeout_minutes, 30);
}

// =============================================================================
// Full runs
// =============================================================================

#[test]
fn test_successful_run_exports_three_lines() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(&[("MODEL_ID", "churn")], &dir).config;
    let runner = RecordingRunner::printing_build_id("abc-123");
    let client = ScriptedStatusClient::new([
        BuildStatus::RemoteBuildInitializing,
        BuildStatus::InProgress,
        BuildStatus::InProgress,
        BuildStatus::Successful,
    ])
    .with_metrics(json!({"acc": 0.9}));

    let mut pipeline = Pipeline::new(config, &runner, &client).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.exit_code(), ExitCode::Success);
    assert_eq!(
        report.observed_statuses,
        vec![
            BuildStatus::RemoteBuildInitializing,
            BuildStatus::InProgress,
            BuildStatus::Successful
        ]
    );
    assert_eq!(client.calls(), 4);
    assert_eq!(runner.commands.borrow().len(), 1);
    assert_eq!(
        read_env_file(&dir),
        "build-id=abc-123\nbuild-status=SUCCESSFUL\nbuild-metrics={\"acc\":0.9}\n"
    );
}

#[test]
fn test_failed_build_exports_status_without_metrics() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(&[], &dir).config;
    let runner = RecordingRunner::printing_build_id("0a1b-2c3d");
    let client = ScriptedStatusClient::new([BuildStatus::InProgress, BuildStatus::Failed])
        .with_metrics(json!({"acc": 0.2}));

    let mut pipeline = Pipeline::new(config, &runner, &client).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.summary_outcome(), Outcome::BuildFailed);
    assert_eq!(report.exit_code().as_i32(), 1);
    assert_eq!(read_env_file(&dir), "build-id=0a1b-2c3d\nbuild-status=FAILED\n");
}

#[test]
fn test_timeout_exports_sentinel() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(&[("INPUT_TIMEOUT_AFTER", "0")], &dir).config;
    let runner = RecordingRunner::printing_build_id("abc-123");
    let client = ScriptedStatusClient::new([BuildStatus::InProgress]);

    let mut pipeline = Pipeline::new(config, &runner, &client).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.summary_outcome(), Outcome::TimedOut);
    assert_eq!(client.calls(), 0);
    assert_eq!(read_env_file(&dir), "build-id=abc-123\nbuild-status=TIMEOUT\n");
}

#[test]
fn test_non_zero_exit_stops_before_polling() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(&[], &dir).config;
    let mut runner = RecordingRunner::printing_build_id("abc-123");
    runner.exit_code = 1;
    let client = ScriptedStatusClient::new([BuildStatus::Successful]);

    let mut pipeline = Pipeline::new(config, &runner, &client).unwrap();
    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, PipelineError::CommandFailed { .. }));
    assert_eq!(client.calls(), 0);
    assert!(!dir.path().join("github_env").exists());
}

#[test]
fn test_query_error_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let config = effective_config(&[], &dir).config;
    let runner = RecordingRunner::printing_build_id("abc-123");
    let client = ScriptedStatusClient::new([BuildStatus::InProgress])
        .then_error("connection reset")
        .with_metrics(json!(null));

    let mut pipeline = Pipeline::new(config, &runner, &client).unwrap();
    let err = pipeline.run().unwrap_err();

    assert!(err.to_string().contains("connection reset"));
    assert_eq!(err.outcome(), Outcome::Error);
    assert_eq!(client.calls(), 2);
    assert!(!dir.path().join("github_env").exists());
}
