//! Error types for the generator.
//!
//! - [`AgentError`] covers running the external coding agent.
//! - [`PipelineError`] covers task plans that cannot be executed.
//! - [`GenError`] is the top-level error returned by the generator.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while running the external agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent command line is empty.
    #[error("Agent command is empty")]
    EmptyCommand,

    /// The agent process could not be started.
    #[error("Failed to start agent '{program}': {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The agent exited unsuccessfully.
    #[error("Agent exited with {}: {}", exit_code_label(.code), last_line(.transcript))]
    Failed {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Everything the agent printed.
        transcript: String,
    },

    /// The agent ran longer than the configured timeout and was killed.
    #[error("Agent timed out after {0} seconds")]
    TimedOut(u64),

    /// Reading agent output or preparing its working directory failed.
    #[error("Agent I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| format!("code {c}"))
}

fn last_line(transcript: &str) -> &str {
    transcript
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("<no output>")
}

/// Task plans that are rejected before anything runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Two tasks share an id.
    #[error("Duplicate task id '{0}'")]
    DuplicateTask(String),

    /// A task depends on an id that is not in the plan.
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// Task declaring the dependency.
        task: String,
        /// Missing dependency id.
        dependency: String,
    },

    /// The dependencies form a cycle through these tasks.
    #[error("Dependency cycle between tasks: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Failure of a single task attempt.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The agent failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A filesystem action failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level generator errors.
#[derive(Debug, Error)]
pub enum GenError {
    /// The OpenAPI document does not exist.
    #[error("OpenAPI spec not found: {}", .0.display())]
    SpecNotFound(PathBuf),

    /// The OpenAPI document could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML parse failure.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse or serialization failure.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but is not an OpenAPI object.
    #[error("Invalid OpenAPI document: {0}")]
    InvalidSpec(String),

    /// The task plan is invalid.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Output directory or file failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for generator operations.
pub type Result<T> = std::result::Result<T, GenError>;
