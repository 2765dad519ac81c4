//! RunningHub OpenAPI calls, expressed over a [`Transport`].
//!
//! Each call returns the raw exchange; the runner decides what a status code
//! or an envelope means at each step.

use hubrun_types::{ApiKey, JobSpec, NodeParam, TaskId};
use serde::Serialize;

use crate::error::TransportError;
use crate::transport::{RawResponse, Transport};

pub const CREATE_PATH: &str = "/task/openapi/create";
pub const STATUS_PATH: &str = "/task/openapi/status";
pub const OUTPUTS_PATH: &str = "/task/openapi/outputs";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    api_key: &'a str,
    workflow_id: &'a str,
    node_info_list: &'a [NodeParam],
}

/// Body shared by the status and outputs calls.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRequest<'a> {
    api_key: &'a str,
    task_id: &'a str,
}

async fn post<T: Serialize>(
    transport: &dyn Transport,
    path: &str,
    body: &T,
) -> Result<RawResponse, TransportError> {
    let body = serde_json::to_value(body)?;
    transport.post_json(path, &body).await
}

pub async fn create_task(
    transport: &dyn Transport,
    spec: &JobSpec,
) -> Result<RawResponse, TransportError> {
    let request = CreateTaskRequest {
        api_key: spec.api_key().expose_secret(),
        workflow_id: spec.workflow_id(),
        node_info_list: spec.params(),
    };
    post(transport, CREATE_PATH, &request).await
}

pub async fn task_status(
    transport: &dyn Transport,
    api_key: &ApiKey,
    task_id: &TaskId,
) -> Result<RawResponse, TransportError> {
    let request = TaskRequest {
        api_key: api_key.expose_secret(),
        task_id: task_id.as_str(),
    };
    post(transport, STATUS_PATH, &request).await
}

pub async fn task_outputs(
    transport: &dyn Transport,
    api_key: &ApiKey,
    task_id: &TaskId,
) -> Result<RawResponse, TransportError> {
    let request = TaskRequest {
        api_key: api_key.expose_secret(),
        task_id: task_id.as_str(),
    };
    post(transport, OUTPUTS_PATH, &request).await
}

pub async fn download(transport: &dyn Transport, url: &str) -> Result<RawResponse, TransportError> {
    transport.get(url).await
}
