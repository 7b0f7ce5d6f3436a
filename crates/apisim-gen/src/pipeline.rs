//! Dependency-ordered task execution with retries.
//!
//! A [`TaskPlan`] is validated and ordered before anything runs: duplicate
//! ids, unknown dependencies and cycles are rejected. Tasks then run one at a
//! time in topological order, ties broken by insertion order. A failing task
//! is retried up to [`PipelineOptions::max_attempts`] times; tasks whose
//! dependencies did not complete are skipped.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::Agent;
use crate::error::{PipelineError, TaskError};

/// Default number of attempts per task.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Tasks
// ============================================================================

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not run yet.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Every attempt failed.
    Failed,
    /// Not run because a dependency did not complete.
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// What a task does. Paths are relative to the pipeline's working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskAction {
    /// Create each directory (and its parents).
    CreateDirectories(Vec<PathBuf>),
    /// Hand a prompt to the agent.
    AgentPrompt(String),
    /// Write a file, replacing any existing one.
    WriteFile {
        /// Target file.
        path: PathBuf,
        /// File contents.
        contents: String,
    },
}

/// A unit of work in a [`TaskPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id within the plan.
    pub id: String,
    /// Human-readable summary shown while running.
    pub description: String,
    /// Ids that must complete first.
    pub depends_on: Vec<String>,
    /// The work itself.
    pub action: TaskAction,
    /// Current status.
    pub status: TaskStatus,
    /// Attempts made so far.
    pub attempts: u32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl Task {
    /// A pending task with no dependencies.
    pub fn new(id: impl Into<String>, description: impl Into<String>, action: TaskAction) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            depends_on: Vec::new(),
            action,
            status: TaskStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    /// Add dependencies.
    #[must_use]
    pub fn after(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Tasks in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    tasks: Vec<Task>,
}

impl TaskPlan {
    /// An empty plan.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Append a task.
    pub fn push(&mut self, task: Task) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// All tasks in insertion order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Task by id.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Indices of the tasks in execution order.
    ///
    /// Kahn's algorithm, always taking the earliest-inserted ready task.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for duplicate ids, unknown dependencies or
    /// cycles.
    pub fn execution_order(&self) -> Result<Vec<usize>, PipelineError> {
        let mut index = HashMap::with_capacity(self.tasks.len());
        for (i, task) in self.tasks.iter().enumerate() {
            if index.insert(task.id.as_str(), i).is_some() {
                return Err(PipelineError::DuplicateTask(task.id.clone()));
            }
        }

        let mut waiting_on = vec![0_usize; self.tasks.len()];
        let mut dependents = vec![Vec::new(); self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            for dependency in &task.depends_on {
                let &d = index.get(dependency.as_str()).ok_or_else(|| {
                    PipelineError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                waiting_on[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut order = Vec::with_capacity(self.tasks.len());
        let mut done = vec![false; self.tasks.len()];
        while let Some(next) = (0..self.tasks.len()).find(|&i| !done[i] && waiting_on[i] == 0) {
            done[next] = true;
            order.push(next);
            for &dependent in &dependents[next] {
                waiting_on[dependent] -= 1;
            }
        }

        if order.len() < self.tasks.len() {
            let stuck = self
                .tasks
                .iter()
                .zip(&done)
                .filter(|&(_, &finished)| !finished)
                .map(|(task, _)| task.id.clone())
                .collect();
            return Err(PipelineError::Cycle(stuck));
        }
        Ok(order)
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Execution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Attempts per task before it is marked failed.
    pub max_attempts: u32,
    /// Mark every runnable task completed without doing anything.
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            dry_run: false,
        }
    }
}

/// Outcome of a run, listing task ids in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Tasks that completed.
    pub completed: Vec<String>,
    /// Tasks that failed every attempt.
    pub failed: Vec<String>,
    /// Tasks skipped because a dependency did not complete.
    pub skipped: Vec<String>,
}

impl RunReport {
    /// True when every task completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Runs a [`TaskPlan`] against an agent inside a working directory.
pub struct Pipeline<'a> {
    agent: &'a dyn Agent,
    workdir: PathBuf,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    /// A pipeline working in `workdir`.
    pub fn new(agent: &'a dyn Agent, workdir: impl Into<PathBuf>, options: PipelineOptions) -> Self {
        Self {
            agent,
            workdir: workdir.into(),
            options,
        }
    }

    /// Working directory that task paths are relative to.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run every task, updating statuses in `plan`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the plan is invalid; nothing runs in
    /// that case. Task failures are reported in the [`RunReport`].
    pub async fn run(&self, plan: &mut TaskPlan) -> Result<RunReport, PipelineError> {
        let order = plan.execution_order()?;
        let mut report = RunReport::default();
        let total = order.len();

        for (step, i) in order.into_iter().enumerate() {
            let blocked = plan.tasks[i]
                .depends_on
                .iter()
                .find(|dep| plan.task(dep).map(|t| t.status) != Some(TaskStatus::Completed))
                .cloned();

            let task = &mut plan.tasks[i];
            if let Some(dependency) = blocked {
                warn!(task = %task.id, dependency = %dependency, "Skipping task, dependency did not complete");
                task.status = TaskStatus::Skipped;
                report.skipped.push(task.id.clone());
                continue;
            }

            println!("{}/{total}. {}...", step + 1, task.description);
            self.run_task(task).await;
            match task.status {
                TaskStatus::Completed => {
                    println!("✓ {}", task.description);
                    report.completed.push(task.id.clone());
                }
                _ => {
                    println!("✗ {} failed", task.description);
                    report.failed.push(task.id.clone());
                }
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Pipeline finished"
        );
        Ok(report)
    }

    async fn run_task(&self, task: &mut Task) {
        task.status = TaskStatus::Running;

        if self.options.dry_run {
            info!(task = %task.id, action = ?task.action, "Dry run, not executing");
            task.status = TaskStatus::Completed;
            return;
        }

        let max_attempts = self.options.max_attempts.max(1);
        while task.attempts < max_attempts {
            task.attempts += 1;
            match self.execute(&task.action).await {
                Ok(()) => {
                    info!(task = %task.id, attempts = task.attempts, "Task completed");
                    task.status = TaskStatus::Completed;
                    task.last_error = None;
                    return;
                }
                Err(e) => {
                    warn!(
                        task = %task.id,
                        attempt = task.attempts,
                        max_attempts,
                        "Task attempt failed: {e}"
                    );
                    task.last_error = Some(e.to_string());
                }
            }
        }
        task.status = TaskStatus::Failed;
    }

    async fn execute(&self, action: &TaskAction) -> Result<(), TaskError> {
        match action {
            TaskAction::CreateDirectories(dirs) => {
                for dir in dirs {
                    tokio::fs::create_dir_all(self.workdir.join(dir)).await?;
                }
            }
            TaskAction::AgentPrompt(prompt) => {
                tokio::fs::create_dir_all(&self.workdir).await?;
                self.agent.run(prompt, &self.workdir).await?;
            }
            TaskAction::WriteFile { path, contents } => {
                let path = self.workdir.join(path);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, contents).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AgentError;

    /// Records prompts and fails the first `failures` calls, or every call
    /// whose prompt contains `fail_on`.
    #[derive(Default)]
    pub(crate) struct FakeAgent {
        pub prompts: Mutex<Vec<String>>,
        pub failures: AtomicU32,
        pub fail_on: Option<String>,
    }

    impl FakeAgent {
        pub fn failing_first(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                ..Self::default()
            }
        }

        pub fn failing_on(marker: &str) -> Self {
            Self {
                fail_on: Some(marker.to_string()),
                ..Self::default()
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Agent for FakeAgent {
        async fn run(&self, prompt: &str, _workdir: &Path) -> Result<String, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let scripted_failure = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            let marked = self.fail_on.as_deref().is_some_and(|m| prompt.contains(m));
            if scripted_failure || marked {
                return Err(AgentError::Failed {
                    code: Some(1),
                    transcript: "agent refused".into(),
                });
            }
            Ok(format!("done: {prompt}"))
        }
    }

    fn prompt(id: &str) -> Task {
        Task::new(id, format!("Run {id}"), TaskAction::AgentPrompt(id.to_string()))
    }

    fn ids(plan: &TaskPlan, order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| plan.tasks()[i].id.clone()).collect()
    }

    #[test]
    fn test_order_is_stable_by_insertion() {
        let mut plan = TaskPlan::new();
        plan.push(prompt("tests").after(["server"]))
            .push(prompt("schema"))
            .push(prompt("readme"))
            .push(prompt("server").after(["schema"]));

        let order = plan.execution_order().unwrap();
        assert_eq!(ids(&plan, &order), ["schema", "readme", "server", "tests"]);
    }

    #[test]
    fn test_invalid_plans_are_rejected() {
        let mut duplicate = TaskPlan::new();
        duplicate.push(prompt("a")).push(prompt("a"));
        assert_eq!(
            duplicate.execution_order(),
            Err(PipelineError::DuplicateTask("a".into()))
        );

        let mut unknown = TaskPlan::new();
        unknown.push(prompt("a").after(["ghost"]));
        assert_eq!(
            unknown.execution_order(),
            Err(PipelineError::UnknownDependency {
                task: "a".into(),
                dependency: "ghost".into(),
            })
        );

        let mut cycle = TaskPlan::new();
        cycle
            .push(prompt("root"))
            .push(prompt("a").after(["b"]))
            .push(prompt("b").after(["a"]));
        assert_eq!(
            cycle.execution_order(),
            Err(PipelineError::Cycle(vec!["a".into(), "b".into()]))
        );
    }

    #[tokio::test]
    async fn test_invalid_plan_runs_nothing() {
        let agent = FakeAgent::default();
        let dir = tempfile::tempdir().unwrap();
        let mut plan = TaskPlan::new();
        plan.push(prompt("a")).push(prompt("b").after(["missing"]));

        let pipeline = Pipeline::new(&agent, dir.path(), PipelineOptions::default());
        assert!(pipeline.run(&mut plan).await.is_err());
        assert!(agent.prompts().is_empty());
        assert_eq!(plan.task("a").unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let agent = FakeAgent::failing_first(2);
        let dir = tempfile::tempdir().unwrap();
        let mut plan = TaskPlan::new();
        plan.push(prompt("schema"));

        let report = Pipeline::new(&agent, dir.path(), PipelineOptions::default())
            .run(&mut plan)
            .await
            .unwrap();

        assert!(report.is_success());
        let task = plan.task("schema").unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.attempts, 3);
        assert_eq!(task.last_error, None);
    }

    #[tokio::test]
    async fn test_failure_skips_dependents_only() {
        let agent = FakeAgent::failing_on("server");
        let dir = tempfile::tempdir().unwrap();
        let mut plan = TaskPlan::new();
        plan.push(prompt("schema"))
            .push(prompt("server").after(["schema"]))
            .push(prompt("tests").after(["server"]))
            .push(prompt("docs").after(["schema"]));

        let options = PipelineOptions {
            max_attempts: 2,
            dry_run: false,
        };
        let report = Pipeline::new(&agent, dir.path(), options)
            .run(&mut plan)
            .await
            .unwrap();

        assert_eq!(report.completed, ["schema", "docs"]);
        assert_eq!(report.failed, ["server"]);
        assert_eq!(report.skipped, ["tests"]);
        assert!(!report.is_success());

        let server = plan.task("server").unwrap();
        assert_eq!(server.attempts, 2);
        assert!(server.last_error.as_deref().unwrap().contains("agent refused"));
        assert_eq!(plan.task("tests").unwrap().status, TaskStatus::Skipped);
        assert_eq!(plan.task("tests").unwrap().attempts, 0);
    }

    #[tokio::test]
    async fn test_dry_run_has_no_side_effects() {
        let agent = FakeAgent::default();
        let dir = tempfile::tempdir().unwrap();
        let mut plan = TaskPlan::new();
        plan.push(Task::new(
            "dirs",
            "Create directories",
            TaskAction::CreateDirectories(vec!["data".into()]),
        ))
        .push(prompt("schema").after(["dirs"]));

        let options = PipelineOptions {
            dry_run: true,
            ..PipelineOptions::default()
        };
        let report = Pipeline::new(&agent, dir.path(), options)
            .run(&mut plan)
            .await
            .unwrap();

        assert_eq!(report.completed, ["dirs", "schema"]);
        assert!(agent.prompts().is_empty());
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_file_actions() {
        let agent = FakeAgent::default();
        let dir = tempfile::tempdir().unwrap();
        let mut plan = TaskPlan::new();
        plan.push(Task::new(
            "dirs",
            "Create directories",
            TaskAction::CreateDirectories(vec!["data".into(), "server/routes".into()]),
        ))
        .push(Task::new(
            "readme",
            "Write README",
            TaskAction::WriteFile {
                path: "docs/README.md".into(),
                contents: "# Hello\n".into(),
            },
        ));

        let report = Pipeline::new(&agent, dir.path(), PipelineOptions::default())
            .run(&mut plan)
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(dir.path().join("server/routes").is_dir());
        let readme = std::fs::read_to_string(dir.path().join("docs/README.md")).unwrap();
        assert_eq!(readme, "# Hello\n");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::Skipped).unwrap(), "\"skipped\"");
        assert_eq!(TaskStatus::Running.to_string(), "running");
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }
}
