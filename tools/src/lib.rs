//! Workflow tools - named RunningHub workflows callable with JSON arguments.
//!
//! A [`WorkflowTool`] knows how to turn untyped tool arguments into a
//! [`JobSpec`]; [`invoke`] runs that spec and folds every outcome, failures
//! included, into a [`ToolOutput`] a chat model or a terminal can show.

pub mod novel;

use std::collections::HashMap;

use hubrun_client::hubrun_types::{ApiKey, JobSpec};
use hubrun_client::{CancellationToken, RunError, RunErrorKind, WorkflowRunner};
use serde_json::Value;
use tokio::time::Instant;

pub use novel::NovelToScript;

/// Error types for tool argument handling and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Bad tool args: {message}")]
    BadArgs { message: String },
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("Duplicate tool registered: {name}")]
    DuplicateTool { name: String },
}

/// What a tool call hands back to its caller. Never a panic, never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    Error(String),
}

impl ToolOutput {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) | Self::Error(text) => text,
        }
    }
}

/// Name, description and JSON schema advertised for a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub workflow_id: String,
    pub description: String,
    pub parameters: Value,
}

/// A RunningHub workflow exposed as a tool.
pub trait WorkflowTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    fn workflow_id(&self) -> &'static str;
    /// Map tool arguments onto workflow node inputs.
    fn build_spec(&self, args: &Value, api_key: ApiKey) -> Result<JobSpec, ToolError>;
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::BadArgs {
        message: e.to_string(),
    })
}

/// Registered workflow tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn WorkflowTool>>,
}

impl ToolRegistry {
    /// Registry with every built-in workflow tool.
    pub fn with_builtins() -> Result<Self, ToolError> {
        let mut registry = Self::default();
        registry.register(Box::new(NovelToScript))?;
        Ok(registry)
    }

    pub fn register(&mut self, tool: Box<dyn WorkflowTool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&dyn WorkflowTool, ToolError> {
        self.tools
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                workflow_id: tool.workflow_id().to_string(),
                description: tool.description().to_string(),
                parameters: tool.schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

/// Build the spec for `tool`, run it, and render the outcome.
pub async fn invoke(
    tool: &dyn WorkflowTool,
    runner: &WorkflowRunner,
    args: &Value,
    api_key: ApiKey,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> ToolOutput {
    tracing::debug!(tool = tool.name(), workflow_id = tool.workflow_id(), "Invoking workflow tool");
    let spec = match tool.build_spec(args, api_key) {
        Ok(spec) => spec,
        Err(e) => return ToolOutput::Error(e.to_string()),
    };

    match runner.run_workflow(&spec, deadline, cancel).await {
        Ok(text) => ToolOutput::Text(text),
        Err(e) => {
            tracing::warn!(tool = tool.name(), kind = ?e.kind(), error = %e, "Workflow tool failed");
            ToolOutput::Error(user_message(&e))
        }
    }
}

/// One-line, user-facing description of a run failure.
#[must_use]
pub fn user_message(err: &RunError) -> String {
    match err.kind() {
        RunErrorKind::Transport => format!("Could not reach RunningHub: {err}"),
        RunErrorKind::Creation => format!("Could not start the workflow: {err}"),
        RunErrorKind::StatusCheck => format!("Could not check workflow progress: {err}"),
        RunErrorKind::JobFailed => format!("The workflow failed: {err}"),
        RunErrorKind::TimeoutOrCancelled => format!("The workflow did not finish: {err}"),
        RunErrorKind::OutputFetch => format!("Could not fetch workflow outputs: {err}"),
        RunErrorKind::ArtifactDownload | RunErrorKind::NoTextOutput => {
            format!("Downloading output files failed: {err}")
        }
    }
}
