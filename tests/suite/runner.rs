//! Workflow runs against a mock RunningHub over real HTTP

use std::time::Duration;

use hubrun_client::api::{CREATE_PATH, STATUS_PATH};
use hubrun_client::hubrun_types::{ApiKey, JobSpec, NodeParam};
use hubrun_client::{CancellationToken, InterruptCause, RunError, Stage, TransportError};
use serde_json::json;
use tokio::time::Instant;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    TASK_ID, envelope, http_transport, mount_create, mount_file, mount_outputs, mount_statuses,
    runner_for, text_item,
};

fn spec() -> JobSpec {
    JobSpec::new(ApiKey::new("test-key"), "2014935539987783681")
        .with_param(NodeParam::new("8", "text", "第一章 雨夜"))
        .with_param(NodeParam::new("6", "seed", "42"))
}

#[tokio::test]
async fn full_run_collects_text_artifacts_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .and(body_partial_json(json!({
            "apiKey": "test-key",
            "workflowId": "2014935539987783681",
            "nodeInfoList": [
                { "nodeId": "8", "fieldName": "text", "fieldValue": "第一章 雨夜" },
                { "nodeId": "6", "fieldName": "seed", "fieldValue": "42" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!({ "taskId": TASK_ID }))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_statuses(&server, 2, "SUCCESS").await;

    let scene = mount_file(&server, "scene.txt", 200, "  INT. ROOM - NIGHT\n").await;
    let image = mount_file(&server, "cover.png", 200, "png-bytes").await;
    let notes = mount_file(&server, "notes.txt", 200, "FADE OUT.").await;
    mount_outputs(
        &server,
        json!([
            text_item(&scene, "12"),
            { "fileUrl": image, "fileType": "png", "nodeId": "13" },
            text_item(&notes, "14"),
        ]),
    )
    .await;

    let text = runner_for(&server).run(&spec()).await.unwrap();
    assert_eq!(text, "INT. ROOM - NIGHT\n\nFADE OUT.");

    let requests = server.received_requests().await.unwrap();
    let status_polls = requests
        .iter()
        .filter(|r| r.url.path() == STATUS_PATH)
        .count();
    assert_eq!(status_polls, 3);
    assert!(
        !requests.iter().any(|r| r.url.path() == "/files/cover.png"),
        "non-text artifacts are never downloaded"
    );
}

#[tokio::test]
async fn status_body_carries_key_and_task_id() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .and(body_partial_json(json!({ "apiKey": "test-key", "taskId": TASK_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!("SUCCESS"))))
        .expect(1)
        .mount(&server)
        .await;
    let url = mount_file(&server, "out.txt", 200, "done").await;
    mount_outputs(&server, json!([text_item(&url, "9")])).await;

    assert_eq!(runner_for(&server).run(&spec()).await.unwrap(), "done");
}

#[tokio::test]
async fn failed_job_reports_status_payload() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    mount_statuses(&server, 1, "FAILED").await;

    let err = runner_for(&server).run(&spec()).await.unwrap_err();
    match err {
        RunError::JobFailed { task_id, payload } => {
            assert_eq!(task_id.as_str(), TASK_ID);
            assert!(payload.contains("FAILED"), "{payload}");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_creation_stops_before_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": 380, "msg": "workflow not exists", "data": null })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = runner_for(&server).run(&spec()).await.unwrap_err();
    match err {
        RunError::Creation { payload, .. } => assert!(payload.contains("workflow not exists")),
        other => panic!("expected Creation, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_on_status_is_terminal() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let err = runner_for(&server).run(&spec()).await.unwrap_err();
    match err {
        RunError::StatusCheck { reason, payload, .. } => {
            assert!(reason.contains("502"), "{reason}");
            assert_eq!(payload, "bad gateway");
        }
        other => panic!("expected StatusCheck, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_artifact_is_a_download_error() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    mount_statuses(&server, 0, "SUCCESS").await;
    let good = mount_file(&server, "a.txt", 200, "first").await;
    let gone = mount_file(&server, "b.txt", 404, "not found").await;
    mount_outputs(&server, json!([text_item(&good, "1"), text_item(&gone, "2")])).await;

    let err = runner_for(&server).run(&spec()).await.unwrap_err();
    match err {
        RunError::ArtifactDownload { url, reason } => {
            assert_eq!(url, gone);
            assert!(reason.contains("404"), "{reason}");
        }
        other => panic!("expected ArtifactDownload, got {other:?}"),
    }
}

#[tokio::test]
async fn only_image_outputs_is_no_text_output() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    mount_statuses(&server, 0, "SUCCESS").await;
    mount_outputs(
        &server,
        json!([{ "fileUrl": "https://cdn.example/x.png", "fileType": "png", "nodeId": "3" }]),
    )
    .await;

    let err = runner_for(&server).run(&spec()).await.unwrap_err();
    assert!(matches!(err, RunError::NoTextOutput { total: 1 }), "{err:?}");
}

#[tokio::test]
async fn deadline_interrupts_a_stuck_job() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    mount_statuses(&server, 0, "RUNNING").await;

    let deadline = Instant::now() + Duration::from_millis(150);
    let err = runner_for(&server)
        .run_workflow(&spec(), Some(deadline), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        RunError::Interrupted { cause, elapsed, .. } => {
            assert_eq!(cause, InterruptCause::DeadlineExceeded);
            assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
        }
        other => panic!("expected Interrupted, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_interrupts_polling() {
    let server = MockServer::start().await;
    mount_create(&server, TASK_ID).await;
    mount_statuses(&server, 0, "RUNNING").await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        trigger.cancel();
    });

    let err = runner_for(&server)
        .run_workflow(&spec(), None, &cancel)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            RunError::Interrupted {
                cause: InterruptCause::Cancelled,
                ..
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn unreachable_service_is_a_create_transport_error() {
    let server = MockServer::start().await;
    let runner = runner_for(&server);
    drop(server);

    let err = runner.run(&spec()).await.unwrap_err();
    match err {
        RunError::Transport { stage, source } => {
            assert_eq!(stage, Stage::Create);
            assert!(matches!(source, TransportError::Request { .. }));
        }
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[tokio::test]
async fn http_transport_passes_non_200_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nowhere"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "ping": true })))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let transport = http_transport(&server);
    let response = transport
        .post_json("/nowhere", &json!({ "ping": true }))
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_ok());
    assert_eq!(response.body, b"missing");
}
