//! Workflow job data: what gets submitted, how the remote reports progress,
//! and what it hands back.

use serde::{Deserialize, Serialize};

use crate::ApiKey;

/// File type tag the remote uses for plain-text artifacts.
pub const TEXT_FILE_TYPE: &str = "txt";

/// One workflow node input override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeParam {
    pub node_id: String,
    pub field_name: String,
    pub field_value: String,
}

impl NodeParam {
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        field_name: impl Into<String>,
        field_value: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            field_name: field_name.into(),
            field_value: field_value.into(),
        }
    }
}

/// A workflow execution request.
///
/// Built by value with [`JobSpec::with_param`], then only read.
#[derive(Debug, Clone)]
pub struct JobSpec {
    api_key: ApiKey,
    workflow_id: String,
    params: Vec<NodeParam>,
}

impl JobSpec {
    #[must_use]
    pub fn new(api_key: ApiKey, workflow_id: impl Into<String>) -> Self {
        Self {
            api_key,
            workflow_id: workflow_id.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: NodeParam) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Node overrides in submission order.
    #[must_use]
    pub fn params(&self) -> &[NodeParam] {
        &self.params
    }
}

/// Normalized remote job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    /// Empty or unrecognized wire value. Polling continues.
    Unknown,
}

impl JobStatus {
    /// Map a wire value. Matching is exact; anything else is `Unknown`.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "SUCCESS" => Self::Succeeded,
            "FAILED" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Succeeded and Failed end polling; everything else keeps it going.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output descriptor from the outputs call.
///
/// Only the fields hubrun acts on are kept; billing and timing fields are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputItem {
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub file_url: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub file_type: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub node_id: String,
}

impl OutputItem {
    /// Whether this item should be downloaded as text.
    ///
    /// An empty type tag counts as text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        !self.file_url.is_empty() && (self.file_type.is_empty() || self.file_type == TEXT_FILE_TYPE)
    }
}
