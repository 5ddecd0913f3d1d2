//! Integration tests for asynchronous copy submission and polling
//!
//! The copy state machine: Submitted -> Polling -> {Succeeded, Failed}.

use std::time::Duration;

use drivefs_core::domain::ItemId;
use drivefs_graph::models::ItemReference;
use drivefs_graph::operation::{AsyncOperation, FailureReason, OperationStatus, PollPolicy};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts,
        timeout: Duration::from_secs(10),
    }
}

async fn mount_copy_accepted(server: &MockServer, source: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/drive/items/{source}/action.copy")))
        .and(header("prefer", "respond-async"))
        .respond_with(
            ResponseTemplate::new(202)
                .append_header("Location", format!("{}/monitor/op-1", server.uri())),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_copy_pending_twice_then_succeeds() {
    let (server, client) = common::setup().await;
    mount_copy_accepted(&server, "S").await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "operation": "ItemCopy",
            "status": "inProgress",
            "percentageComplete": 40.0
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("X", "b.txt", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let op = client
        .submit_copy(
            &ItemId::new("S").unwrap(),
            "b.txt",
            &ItemReference::to_folder(&ItemId::new("T").unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(op.status(), &OperationStatus::Pending);
    assert_eq!(
        op.monitor_url(),
        Some(format!("{}/monitor/op-1", server.uri()).as_str())
    );

    let done = client
        .poll(op, &fast_policy(10), &CancellationToken::new())
        .await;

    assert_eq!(done.result_id(), Some("X"));
    assert_eq!(done.attempts(), 3);
}

#[tokio::test]
async fn test_copy_body_targets_root_by_path() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/drive/items/S/action.copy"))
        .and(body_json(json!({
            "name": "copy.txt",
            "parentReference": { "path": "/drive/root:" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("Y", "copy.txt", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let op = client
        .submit_copy(
            &ItemId::new("S").unwrap(),
            "copy.txt",
            &ItemReference::to_folder(&ItemId::root()),
        )
        .await
        .unwrap();

    // Answered directly with the new item: already terminal
    assert!(op.is_terminal());
    assert_eq!(op.result_id(), Some("Y"));
}

#[tokio::test]
async fn test_copy_failed_status_is_terminal() {
    let (server, client) = common::setup().await;
    mount_copy_accepted(&server, "S").await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "failed" })))
        .expect(1)
        .mount(&server)
        .await;

    let op = client
        .submit_copy(
            &ItemId::new("S").unwrap(),
            "b.txt",
            &ItemReference::to_folder(&ItemId::root()),
        )
        .await
        .unwrap();
    let done = client
        .poll(op, &fast_policy(10), &CancellationToken::new())
        .await;

    assert!(matches!(
        done.status(),
        OperationStatus::Failed(FailureReason::Remote(_))
    ));

    // Polling again is a no-op: the monitor mock expects exactly one hit
    let again = client
        .poll(done.clone(), &fast_policy(10), &CancellationToken::new())
        .await;
    assert_eq!(again, done);
}

#[tokio::test]
async fn test_copy_completed_with_resource_id() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "resourceId": "R"
        })))
        .mount(&server)
        .await;

    let op = AsyncOperation::pending(format!("{}/monitor/op-2", server.uri()));
    let done = client
        .poll(op, &fast_policy(10), &CancellationToken::new())
        .await;

    assert_eq!(done.result_id(), Some("R"));
}

#[tokio::test]
async fn test_copy_exceeding_attempts_times_out() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/monitor/slow"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "status": "inProgress" })))
        .expect(3)
        .mount(&server)
        .await;

    let op = AsyncOperation::pending(format!("{}/monitor/slow", server.uri()));
    let done = client
        .poll(op, &fast_policy(3), &CancellationToken::new())
        .await;

    assert_eq!(
        done.status(),
        &OperationStatus::Failed(FailureReason::TimedOut)
    );
    assert_eq!(done.attempts(), 3);
}

#[tokio::test]
async fn test_copy_exceeding_total_timeout() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/monitor/slow"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "status": "inProgress" })))
        .mount(&server)
        .await;

    let policy = PollPolicy {
        interval: Duration::from_millis(20),
        max_attempts: 1000,
        timeout: Duration::from_millis(150),
    };
    let op = AsyncOperation::pending(format!("{}/monitor/slow", server.uri()));
    let done = client.poll(op, &policy, &CancellationToken::new()).await;

    assert_eq!(
        done.status(),
        &OperationStatus::Failed(FailureReason::TimedOut)
    );
}

#[tokio::test]
async fn test_copy_cancelled_while_polling() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/monitor/slow"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "status": "inProgress" })))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let op = AsyncOperation::pending(format!("{}/monitor/slow", server.uri()));
    let done = client.poll(op, &fast_policy(1000), &cancel).await;

    assert_eq!(
        done.status(),
        &OperationStatus::Failed(FailureReason::Cancelled)
    );
}

#[tokio::test]
async fn test_copy_survives_monitor_server_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/monitor/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/monitor/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "X" })))
        .expect(1)
        .mount(&server)
        .await;

    let op = AsyncOperation::pending(format!("{}/monitor/flaky", server.uri()));
    let done = client
        .poll(op, &fast_policy(10), &CancellationToken::new())
        .await;

    assert_eq!(
        done.status(),
        &OperationStatus::Succeeded {
            resource_id: "X".to_string()
        }
    );
    assert_eq!(done.attempts(), 2);
}

#[tokio::test]
async fn test_copy_monitor_client_error_is_terminal() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/monitor/gone"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": "accessDenied", "message": "no access" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let op = AsyncOperation::pending(format!("{}/monitor/gone", server.uri()));
    let done = client
        .poll(op, &fast_policy(10), &CancellationToken::new())
        .await;

    assert!(matches!(
        done.status(),
        OperationStatus::Failed(FailureReason::Remote(msg)) if msg.contains("accessDenied")
    ));
    assert_eq!(done.attempts(), 1);
}
