//! Shared test utilities and fixtures
//!
//! A wiremock server standing in for the RunningHub OpenAPI and its file CDN.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hubrun_client::api::{CREATE_PATH, OUTPUTS_PATH, STATUS_PATH};
use hubrun_client::{HttpTransport, RunnerSettings, Transport, WorkflowRunner, build_http_client};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TASK_ID: &str = "1900000000000000001";

/// Poll fast enough that a test run takes milliseconds.
pub fn fast_settings() -> RunnerSettings {
    RunnerSettings {
        poll_interval: Duration::from_millis(20),
        default_timeout: Duration::from_secs(5),
    }
}

pub fn http_transport(server: &MockServer) -> Arc<dyn Transport> {
    let client = build_http_client(Duration::from_secs(5)).expect("http client");
    Arc::new(HttpTransport::new(client, server.uri()))
}

pub fn runner_for(server: &MockServer) -> WorkflowRunner {
    WorkflowRunner::new(http_transport(server)).with_settings(fast_settings())
}

pub fn envelope(data: Value) -> Value {
    json!({ "code": 0, "msg": "success", "data": data })
}

pub async fn mount_create(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "taskId": task_id, "taskStatus": "QUEUED" }))),
        )
        .mount(server)
        .await;
}

/// Answer `RUNNING` for the first `running_polls` status calls, then `terminal`.
pub async fn mount_statuses(server: &MockServer, running_polls: u64, terminal: &str) {
    if running_polls > 0 {
        Mock::given(method("POST"))
            .and(path(STATUS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!("RUNNING"))))
            .up_to_n_times(running_polls)
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(terminal))))
        .mount(server)
        .await;
}

pub async fn mount_outputs(server: &MockServer, items: Value) {
    Mock::given(method("POST"))
        .and(path(OUTPUTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(items)))
        .mount(server)
        .await;
}

/// Serve `body` at `/files/{name}` and return its absolute URL.
pub async fn mount_file(server: &MockServer, name: &str, status: u16, body: &str) -> String {
    let file_path = format!("/files/{name}");
    Mock::given(method("GET"))
        .and(path(file_path.as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
    format!("{}{file_path}", server.uri())
}

pub fn text_item(url: &str, node_id: &str) -> Value {
    json!({ "fileUrl": url, "fileType": "txt", "nodeId": node_id })
}
