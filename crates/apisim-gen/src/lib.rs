//! # apisim-gen
//!
//! Generates a stateful API simulator from an OpenAPI document by handing a
//! sequence of prompts to an external coding agent.
//!
//! ## Architecture
//!
//! - [`analysis`] - Loads the document and extracts entities, endpoints and relationships
//! - [`naming`] - Table names for schemas
//! - [`prompts`] - Agent prompts and the generated README
//! - [`agent`] - The [`Agent`] trait and the subprocess-backed [`CommandAgent`]
//! - [`pipeline`] - Dependency-ordered tasks with retries
//! - [`generator`] - The generation plan and its runner
//! - [`error`] - Error types

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod agent;
pub mod analysis;
pub mod error;
pub mod generator;
pub mod naming;
pub mod pipeline;
pub mod prompts;

pub use agent::{Agent, CommandAgent, DEFAULT_AGENT_COMMAND};
pub use analysis::{Analysis, Endpoint, Entity, Relationship, RelationshipKind};
pub use error::{AgentError, GenError, PipelineError, Result};
pub use generator::{build_plan, Generation, Generator, GeneratorOptions, DEFAULT_OUTPUT_DIR};
pub use pipeline::{
    Pipeline, PipelineOptions, RunReport, Task, TaskAction, TaskPlan, TaskStatus,
    DEFAULT_MAX_ATTEMPTS,
};
