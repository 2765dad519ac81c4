//! Workflow tools invoked end to end

use hubrun_client::hubrun_types::ApiKey;
use hubrun_client::{CancellationToken, WorkflowRunner};
use hubrun_tools::{ToolOutput, ToolRegistry, invoke};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    TASK_ID, envelope, mount_file, mount_outputs, mount_statuses, runner_for, text_item,
};

async fn invoke_novel(runner: &WorkflowRunner, args: serde_json::Value) -> ToolOutput {
    let registry = ToolRegistry::with_builtins().unwrap();
    let tool = registry.lookup("novel_to_script").unwrap();
    invoke(
        tool,
        runner,
        &args,
        ApiKey::new("tool-key"),
        None,
        &CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn novel_to_script_returns_screenplay_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(hubrun_client::api::CREATE_PATH))
        .and(body_partial_json(json!({
            "apiKey": "tool-key",
            "workflowId": "2014935539987783681",
            "nodeInfoList": [
                { "nodeId": "8", "fieldName": "text", "fieldValue": "He opened the door." },
                { "nodeId": "6", "fieldName": "seed", "fieldValue": "7" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!({ "taskId": TASK_ID }))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_statuses(&server, 1, "SUCCESS").await;
    let url = mount_file(&server, "script.txt", 200, "EXT. DOORWAY - DAY\n").await;
    mount_outputs(&server, json!([text_item(&url, "10")])).await;

    let output = invoke_novel(
        &runner_for(&server),
        json!({ "text": "He opened the door.", "seed": "7" }),
    )
    .await;
    assert_eq!(output, ToolOutput::Text("EXT. DOORWAY - DAY".to_string()));
}

#[tokio::test]
async fn failed_workflow_becomes_error_text() {
    let server = MockServer::start().await;
    crate::common::mount_create(&server, TASK_ID).await;
    mount_statuses(&server, 0, "FAILED").await;

    let output = invoke_novel(&runner_for(&server), json!({ "text": "x" })).await;
    assert!(output.is_error());
    assert!(output.as_str().starts_with("The workflow failed"), "{output:?}");
}

#[tokio::test]
async fn bad_arguments_never_reach_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = invoke_novel(&runner_for(&server), json!({ "seed": "1" })).await;
    assert!(output.is_error());
    assert!(output.as_str().contains("Bad tool args"), "{output:?}");
}
