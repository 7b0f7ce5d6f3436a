//! Plans and runs the generation of one API simulator.

use std::path::PathBuf;

use tracing::info;

use crate::agent::Agent;
use crate::analysis::Analysis;
use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineOptions, RunReport, Task, TaskAction, TaskPlan};
use crate::prompts;

/// Output directory used when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "api-simulation";

/// Directories created before the agent runs.
pub const OUTPUT_DIRECTORIES: [&str; 3] = ["data", "api", "server"];

/// Task ids, in plan order.
pub mod task_ids {
    /// Create the output directories.
    pub const DIRECTORIES: &str = "directories";
    /// Generate the persistence layer.
    pub const DATABASE_SCHEMA: &str = "database-schema";
    /// Generate the HTTP server.
    pub const API_SERVER: &str = "api-server";
    /// Generate the test suites.
    pub const TEST_SUITE: &str = "test-suite";
    /// Write the README.
    pub const PROJECT_FILES: &str = "project-files";
}

/// Inputs of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// OpenAPI document.
    pub spec_path: PathBuf,
    /// Directory the simulator is generated into.
    pub output_dir: PathBuf,
    /// Retry and dry-run settings.
    pub pipeline: PipelineOptions,
}

impl GeneratorOptions {
    /// Defaults for everything but the spec path.
    pub fn new(spec_path: impl Into<PathBuf>) -> Self {
        Self {
            spec_path: spec_path.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            pipeline: PipelineOptions::default(),
        }
    }
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    /// What was extracted from the OpenAPI document.
    pub analysis: Analysis,
    /// The plan with final task statuses.
    pub plan: TaskPlan,
    /// Completed, failed and skipped task ids.
    pub report: RunReport,
}

/// The generation plan: directories, then schema, server, tests and README,
/// each depending on the previous step.
///
/// # Errors
///
/// Returns an error if the analysis cannot be embedded in a prompt.
pub fn build_plan(analysis: &Analysis, spec_file: &str) -> Result<TaskPlan> {
    use task_ids::{API_SERVER, DATABASE_SCHEMA, DIRECTORIES, PROJECT_FILES, TEST_SUITE};

    let mut plan = TaskPlan::new();
    plan.push(Task::new(
        DIRECTORIES,
        "Creating directory structure",
        TaskAction::CreateDirectories(OUTPUT_DIRECTORIES.iter().map(PathBuf::from).collect()),
    ))
    .push(
        Task::new(
            DATABASE_SCHEMA,
            "Generating database schema",
            TaskAction::AgentPrompt(prompts::database_schema_prompt(analysis)?),
        )
        .after([DIRECTORIES]),
    )
    .push(
        Task::new(
            API_SERVER,
            "Generating API server",
            TaskAction::AgentPrompt(prompts::api_server_prompt(analysis)?),
        )
        .after([DATABASE_SCHEMA]),
    )
    .push(
        Task::new(
            TEST_SUITE,
            "Generating test suite",
            TaskAction::AgentPrompt(prompts::test_suite_prompt(analysis)),
        )
        .after([API_SERVER]),
    )
    .push(
        Task::new(
            PROJECT_FILES,
            "Creating project files",
            TaskAction::WriteFile {
                path: PathBuf::from("README.md"),
                contents: prompts::readme(analysis, spec_file),
            },
        )
        .after([TEST_SUITE]),
    );
    Ok(plan)
}

/// Generates an API simulator with an [`Agent`].
pub struct Generator {
    options: GeneratorOptions,
    agent: Box<dyn Agent>,
}

impl Generator {
    /// A generator using `agent` for every prompt.
    pub fn new(options: GeneratorOptions, agent: impl Agent + 'static) -> Self {
        Self {
            options,
            agent: Box::new(agent),
        }
    }

    /// Run options.
    #[must_use]
    pub const fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Analyze the document and run the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or the plan is
    /// invalid. Task failures are reported in [`Generation::report`].
    pub async fn run(&self) -> Result<Generation> {
        let spec_path = &self.options.spec_path;
        println!("Generating API simulation from: {}", spec_path.display());
        println!("Output directory: {}", self.options.output_dir.display());
        println!("{}", "-".repeat(50));

        let analysis = Analysis::from_path(spec_path)?;
        info!(
            title = analysis.title(),
            endpoints = analysis.endpoints.len(),
            entities = analysis.entities.len(),
            "Loaded OpenAPI spec"
        );

        let spec_file = spec_path
            .file_name()
            .map_or_else(|| spec_path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mut plan = build_plan(&analysis, &spec_file)?;

        let pipeline = Pipeline::new(
            self.agent.as_ref(),
            &self.options.output_dir,
            self.options.pipeline,
        );
        let report = pipeline.run(&mut plan).await?;

        Ok(Generation {
            analysis,
            plan,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{AgentError, GenError};
    use crate::pipeline::tests::FakeAgent;
    use crate::pipeline::TaskStatus;

    /// Lets a test keep a handle on the agent it gave away.
    struct Shared(Arc<FakeAgent>);

    #[async_trait]
    impl Agent for Shared {
        async fn run(&self, prompt: &str, workdir: &std::path::Path) -> std::result::Result<String, AgentError> {
            self.0.run(prompt, workdir).await
        }
    }

    fn write_spec(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("slack.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "{}",
            json!({
                "openapi": "3.0.0",
                "info": {"title": "Slack Web API", "description": "Mock Slack"},
                "paths": {"/users.list": {"get": {"operationId": "users_list"}}},
                "components": {"schemas": {"User": {"type": "object"}}}
            })
        )
        .unwrap();
        path
    }

    #[test]
    fn test_plan_is_a_chain() {
        let analysis = Analysis::from_spec(&json!({"info": {"title": "X"}}));
        let plan = build_plan(&analysis, "x.yaml").unwrap();
        let order: Vec<_> = plan
            .execution_order()
            .unwrap()
            .into_iter()
            .map(|i| plan.tasks()[i].id.as_str())
            .collect();
        assert_eq!(
            order,
            ["directories", "database-schema", "api-server", "test-suite", "project-files"]
        );
        assert_eq!(plan.task("api-server").unwrap().depends_on, ["database-schema"]);
    }

    #[tokio::test]
    async fn test_generates_project() {
        let dir = tempfile::tempdir().unwrap();
        let spec = write_spec(dir.path());
        let output = dir.path().join("out");
        let agent = Arc::new(FakeAgent::default());

        let mut options = GeneratorOptions::new(&spec);
        options.output_dir.clone_from(&output);
        let generation = Generator::new(options, Shared(Arc::clone(&agent)))
            .run()
            .await
            .unwrap();

        assert!(generation.report.is_success());
        for name in OUTPUT_DIRECTORIES {
            assert!(output.join(name).is_dir());
        }
        let readme = std::fs::read_to_string(output.join("README.md")).unwrap();
        assert!(readme.starts_with("# Slack Web API Simulation"));
        assert!(readme.contains("`slack.json`"));

        let prompts = agent.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("\"name\": \"User\""));
        assert!(prompts[1].contains("\"operation_id\": \"users_list\""));
        assert!(prompts[2].contains("GET /users.list"));
    }

    #[tokio::test]
    async fn test_agent_failure_stops_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        let spec = write_spec(dir.path());
        let output = dir.path().join("out");
        let agent = Arc::new(FakeAgent::failing_on("HTTP server"));

        let mut options = GeneratorOptions::new(&spec);
        options.output_dir.clone_from(&output);
        let generation = Generator::new(options, Shared(Arc::clone(&agent)))
            .run()
            .await
            .unwrap();

        assert_eq!(generation.report.failed, ["api-server"]);
        assert_eq!(generation.report.skipped, ["test-suite", "project-files"]);
        assert_eq!(
            generation.plan.task("api-server").unwrap().attempts,
            crate::pipeline::DEFAULT_MAX_ATTEMPTS
        );
        assert_eq!(
            generation.plan.task("project-files").unwrap().status,
            TaskStatus::Skipped
        );
        assert!(!output.join("README.md").exists());
    }

    #[tokio::test]
    async fn test_missing_spec() {
        let dir = tempfile::tempdir().unwrap();
        let options = GeneratorOptions::new(dir.path().join("absent.yaml"));
        let err = Generator::new(options, FakeAgent::default()).run().await.unwrap_err();
        assert!(matches!(err, GenError::SpecNotFound(_)));
    }
}
