//! Create → poll → collect lifecycle for a single workflow run.
//!
//! # Polling
//!
//! After the task is created the runner waits one `poll_interval`, then asks
//! for the status on every tick. Ticks that fall behind (a slow status call)
//! are delayed, never bursted. At the top of every iteration the deadline and
//! the cancellation token are checked first; once either fires the run ends
//! without issuing another request. A request already in flight is allowed to
//! finish.
//!
//! # Status handling
//!
//! | Status | Action |
//! |--------|--------|
//! | `Succeeded` | fetch outputs, assemble text |
//! | `Failed` | [`RunError::JobFailed`] with the raw status payload |
//! | `Queued`, `Running`, `Unknown` | keep polling |
//!
//! A transport error on any call ends the run immediately.

use std::sync::Arc;
use std::time::Duration;

use hubrun_types::{ApiKey, JobSpec, JobStatus, OutputItem, TaskId};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::aggregate;
use crate::api;
use crate::envelope;
use crate::error::{InterruptCause, RunError, Stage};
use crate::transport::{RawResponse, Transport};
use crate::{DEFAULT_POLL_INTERVAL, DEFAULT_RUN_TIMEOUT};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Stand-in for an unrepresentable deadline; matches tokio's own far-future horizon.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + budget`, saturating to a far-future instant instead of overflowing.
#[must_use]
pub fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Timing knobs for [`WorkflowRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Fixed wait between status checks.
    pub poll_interval: Duration,
    /// Budget applied when the caller passes no deadline, measured from task creation.
    pub default_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

/// Runs workflows to completion against an injected [`Transport`].
///
/// Holds no per-run state, so one runner can serve concurrent runs.
#[derive(Clone)]
pub struct WorkflowRunner {
    transport: Arc<dyn Transport>,
    settings: RunnerSettings,
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl WorkflowRunner {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            settings: RunnerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> RunnerSettings {
        self.settings
    }

    /// Run with the default timeout and no external cancellation.
    pub async fn run(&self, spec: &JobSpec) -> Result<String, RunError> {
        self.run_workflow(spec, None, &CancellationToken::new()).await
    }

    /// Submit `spec`, wait for it to finish, and return its assembled text output.
    ///
    /// `deadline` bounds the whole run; `None` means `default_timeout` from now.
    pub async fn run_workflow(
        &self,
        spec: &JobSpec,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        let started = Instant::now();
        let deadline =
            deadline.unwrap_or_else(|| deadline_after(started, self.settings.default_timeout));

        let task_id = self.create(spec).await?;
        tracing::info!(
            %task_id,
            workflow_id = spec.workflow_id(),
            params = spec.params().len(),
            "Task created"
        );

        self.wait_for_success(spec.api_key(), &task_id, started, deadline, cancel)
            .await?;

        let items = self.fetch_outputs(spec.api_key(), &task_id).await?;
        let text = aggregate::assemble_text(self.transport.as_ref(), &items).await?;
        tracing::info!(
            %task_id,
            outputs = items.len(),
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Workflow run complete"
        );
        Ok(text)
    }

    async fn create(&self, spec: &JobSpec) -> Result<TaskId, RunError> {
        let response = api::create_task(self.transport.as_ref(), spec)
            .await
            .map_err(|source| RunError::Transport {
                stage: Stage::Create,
                source,
            })?;
        let failure = |reason: String, response: &RawResponse| {
            tracing::warn!(workflow_id = spec.workflow_id(), %reason, "Task creation failed");
            RunError::Creation {
                reason,
                payload: response.body_snippet(),
            }
        };

        if !response.is_ok() {
            return Err(failure(format!("HTTP {}", response.status), &response));
        }
        let envelope = envelope::decode_envelope(&response.body)
            .map_err(|e| failure(e.to_string(), &response))?;
        envelope::task_id_from_data(&envelope.data)
            .ok_or_else(|| failure("response carries no taskId".to_string(), &response))
    }

    async fn wait_for_success(
        &self,
        api_key: &ApiKey,
        task_id: &TaskId,
        started: Instant,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let interval = self.settings.poll_interval.max(MIN_POLL_INTERVAL);
        let mut ticker = tokio::time::interval_at(deadline_after(Instant::now(), interval), interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);

        let interrupted = |cause: InterruptCause| {
            let elapsed = started.elapsed();
            tracing::warn!(%task_id, %cause, elapsed_ms = elapsed.as_millis() as u64, "Run interrupted");
            RunError::Interrupted {
                task_id: task_id.clone(),
                cause,
                elapsed,
            }
        };

        let mut polls: u32 = 0;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(interrupted(InterruptCause::Cancelled)),
                () = &mut expiry => return Err(interrupted(InterruptCause::DeadlineExceeded)),
                _ = ticker.tick() => {}
            }
            polls += 1;

            let (status, payload) = self.check_status(api_key, task_id).await?;
            if !status.is_terminal() {
                tracing::debug!(%task_id, %status, polls, "Task not finished");
                continue;
            }
            if status == JobStatus::Failed {
                tracing::warn!(%task_id, polls, "Task reported failure");
                return Err(RunError::JobFailed {
                    task_id: task_id.clone(),
                    payload,
                });
            }
            tracing::info!(%task_id, polls, "Task succeeded");
            return Ok(());
        }
    }

    /// One status round trip. Returns the status and the raw payload for diagnostics.
    async fn check_status(
        &self,
        api_key: &ApiKey,
        task_id: &TaskId,
    ) -> Result<(JobStatus, String), RunError> {
        let response = api::task_status(self.transport.as_ref(), api_key, task_id)
            .await
            .map_err(|source| RunError::Transport {
                stage: Stage::Status,
                source,
            })?;
        let payload = response.body_snippet();
        if !response.is_ok() {
            return Err(RunError::StatusCheck {
                task_id: task_id.clone(),
                reason: format!("HTTP {}", response.status),
                payload,
            });
        }
        match envelope::decode_status(&response.body) {
            Ok(status) => Ok((status, payload)),
            Err(e) => Err(RunError::StatusCheck {
                task_id: task_id.clone(),
                reason: e.to_string(),
                payload,
            }),
        }
    }

    async fn fetch_outputs(
        &self,
        api_key: &ApiKey,
        task_id: &TaskId,
    ) -> Result<Vec<OutputItem>, RunError> {
        let response = api::task_outputs(self.transport.as_ref(), api_key, task_id)
            .await
            .map_err(|source| RunError::Transport {
                stage: Stage::Outputs,
                source,
            })?;
        let failure = |reason: String| {
            tracing::warn!(%task_id, %reason, "Output fetch failed");
            RunError::OutputFetch {
                task_id: task_id.clone(),
                reason,
                payload: response.body_snippet(),
            }
        };

        if !response.is_ok() {
            return Err(failure(format!("HTTP {}", response.status)));
        }
        let envelope = envelope::decode_envelope(&response.body).map_err(|e| failure(e.to_string()))?;
        let items = envelope::outputs_from_data(&envelope.data)
            .map_err(|e| failure(format!("undecodable output list: {e}")))?;
        if items.is_empty() {
            return Err(failure("output list is empty".to_string()));
        }
        Ok(items)
    }
}
