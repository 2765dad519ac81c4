use std::time::Duration;

use hubrun_types::TaskId;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Network-level failure: the request never produced a status code.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    pub fn request(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Request {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// The `{code, msg, data}` envelope could not be accepted.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed response envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("remote rejected request: code={code} msg={msg}")]
    Rejected { code: i64, msg: String },
}

/// Why a run stopped before reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptCause {
    DeadlineExceeded,
    Cancelled,
}

impl std::fmt::Display for InterruptCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Which remote call a transport failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Create,
    Status,
    Outputs,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Status => f.write_str("status"),
            Self::Outputs => f.write_str("outputs"),
        }
    }
}

/// Terminal failure of a workflow run. Nothing here is retried.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{stage} request failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: TransportError,
    },
    #[error("task creation failed: {reason}: {payload}")]
    Creation { reason: String, payload: String },
    #[error("status check for task {task_id} failed: {reason}: {payload}")]
    StatusCheck {
        task_id: TaskId,
        reason: String,
        payload: String,
    },
    #[error("task {task_id} failed: {payload}")]
    JobFailed { task_id: TaskId, payload: String },
    #[error("task {task_id} stopped after {}ms: {cause}", elapsed.as_millis())]
    Interrupted {
        task_id: TaskId,
        cause: InterruptCause,
        elapsed: Duration,
    },
    #[error("fetching outputs of task {task_id} failed: {reason}: {payload}")]
    OutputFetch {
        task_id: TaskId,
        reason: String,
        payload: String,
    },
    #[error("downloading {url} failed: {reason}")]
    ArtifactDownload { url: String, reason: String },
    #[error("task produced no text output ({total} output items, none textual)")]
    NoTextOutput { total: usize },
}

/// Discriminant of [`RunError`] for callers that only classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunErrorKind {
    Transport,
    Creation,
    StatusCheck,
    JobFailed,
    TimeoutOrCancelled,
    OutputFetch,
    ArtifactDownload,
    NoTextOutput,
}

impl RunError {
    #[must_use]
    pub fn kind(&self) -> RunErrorKind {
        match self {
            Self::Transport { .. } => RunErrorKind::Transport,
            Self::Creation { .. } => RunErrorKind::Creation,
            Self::StatusCheck { .. } => RunErrorKind::StatusCheck,
            Self::JobFailed { .. } => RunErrorKind::JobFailed,
            Self::Interrupted { .. } => RunErrorKind::TimeoutOrCancelled,
            Self::OutputFetch { .. } => RunErrorKind::OutputFetch,
            Self::ArtifactDownload { .. } => RunErrorKind::ArtifactDownload,
            Self::NoTextOutput { .. } => RunErrorKind::NoTextOutput,
        }
    }

    /// Task the failure belongs to, once one exists.
    #[must_use]
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::StatusCheck { task_id, .. }
            | Self::JobFailed { task_id, .. }
            | Self::Interrupted { task_id, .. }
            | Self::OutputFetch { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}
