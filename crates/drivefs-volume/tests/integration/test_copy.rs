//! Integration tests for server-side copies

use std::time::Duration;

use drivefs_core::domain::{FsErrorKind, VirtualPath};
use drivefs_core::ports::VolumeDriver;
use serde_json::json;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

async fn mount_no_existing_destination(server: &MockServer, dir: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/drive/items/{dir}/children/{name}")))
        .respond_with(common::not_found())
        .mount(server)
        .await;
}

async fn mount_copy_accepted(server: &MockServer, source: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/drive/items/{source}/action.copy")))
        .respond_with(
            ResponseTemplate::new(202)
                .append_header("Location", format!("{}/monitor/copy-1", server.uri())),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_monitor_pending(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/monitor/copy-1"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "operation": "ItemCopy",
            "status": "pending"
        })))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_copy_polls_until_new_item() {
    let (server, volume) = common::setup().await;
    mount_no_existing_destination(&server, "B", "b.txt").await;

    Mock::given(method("POST"))
        .and(path("/drive/items/S/action.copy"))
        .and(body_json(json!({
            "name": "b.txt",
            "parentReference": { "id": "B" }
        })))
        .respond_with(
            ResponseTemplate::new(202)
                .append_header("Location", format!("{}/monitor/copy-1", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_monitor_pending(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/monitor/copy-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("X", "b.txt", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let copied = volume
        .copy(&VirtualPath::new("/A/S"), &VirtualPath::new("/B"), "b.txt")
        .await
        .unwrap();
    assert_eq!(copied, VirtualPath::new("/B/X"));
}

#[tokio::test]
async fn test_copy_join_replaces_existing_destination() {
    let (server, volume) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/B/children/b.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "OLD" })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/drive/items/OLD"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mount_copy_accepted(&server, "S").await;
    Mock::given(method("GET"))
        .and(path("/monitor/copy-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "resourceId": "NEW"
        })))
        .mount(&server)
        .await;

    let copied = volume
        .copy(&VirtualPath::new("/A/S"), &VirtualPath::new("/B"), "b.txt")
        .await
        .unwrap();
    assert_eq!(copied, VirtualPath::new("/B/NEW"));
}

#[tokio::test]
async fn test_copy_join_evicts_replaced_thumbnail() {
    let server = MockServer::start().await;
    let tmb = tempdir().unwrap();
    let config = common::builder(&server)
        .tmb_dir(tmb.path().to_path_buf())
        .build();
    let volume = common::mount_with(&server, config).await;

    common::mount_children(&server, "B", vec![common::image_json("OLD", "b.png")], 1).await;
    Mock::given(method("GET"))
        .and(path("/drive/items/OLD/thumbnails/0/medium/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/drive/items/OLD"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mount_copy_accepted(&server, "S").await;
    Mock::given(method("GET"))
        .and(path("/monitor/copy-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "resourceId": "NEW"
        })))
        .mount(&server)
        .await;

    let dir = VirtualPath::new("/B");
    volume.list(&dir).await.unwrap();
    let thumb = volume
        .thumbnail(&VirtualPath::new("/B/OLD"))
        .await
        .unwrap()
        .expect("thumbnail");
    assert!(tmb.path().join(&thumb).exists());

    let copied = volume
        .copy(&VirtualPath::new("/A/S"), &dir, "b.png")
        .await
        .unwrap();
    assert_eq!(copied, VirtualPath::new("/B/NEW"));
    assert!(!tmb.path().join(&thumb).exists());
}

#[tokio::test]
async fn test_copy_without_join_keeps_existing_destination() {
    let server = MockServer::start().await;
    let config = common::builder(&server).copy_join(false).build();
    let volume = common::mount_with(&server, config).await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/items/S/action.copy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("C", "b 1.txt", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let copied = volume
        .copy(&VirtualPath::new("/A/S"), &VirtualPath::new("/B"), "b.txt")
        .await
        .unwrap();
    assert_eq!(copied, VirtualPath::new("/B/C"));
}

#[tokio::test]
async fn test_copy_into_root_and_failed_status() {
    let (server, volume) = common::setup().await;
    mount_no_existing_destination(&server, "root", "b.txt").await;

    Mock::given(method("POST"))
        .and(path("/drive/items/S/action.copy"))
        .and(body_json(json!({
            "name": "b.txt",
            "parentReference": { "path": "/drive/root:" }
        })))
        .respond_with(
            ResponseTemplate::new(202)
                .append_header("Location", format!("{}/monitor/copy-1", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/monitor/copy-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "failed" })))
        .mount(&server)
        .await;

    let err = volume
        .copy(&VirtualPath::new("/A/S"), &VirtualPath::root(), "b.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::AsyncOpFailed);
}

#[tokio::test]
async fn test_copy_exceeding_poll_budget_fails() {
    let server = MockServer::start().await;
    let config = common::builder(&server).polling_max_attempts(3).build();
    let volume = common::mount_with(&server, config).await;

    mount_no_existing_destination(&server, "B", "b.txt").await;
    mount_copy_accepted(&server, "S").await;
    mount_monitor_pending(&server, 100).await;

    let err = volume
        .copy(&VirtualPath::new("/A/S"), &VirtualPath::new("/B"), "b.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::AsyncOpFailed);
    assert!(err.message.contains("timed out"), "{}", err.message);
}

#[tokio::test]
async fn test_copy_cancelled_by_caller() {
    let server = MockServer::start().await;
    let config = common::builder(&server).polling_max_attempts(10_000).build();
    let volume = common::mount_with(&server, config).await;

    mount_no_existing_destination(&server, "B", "b.txt").await;
    mount_copy_accepted(&server, "S").await;
    mount_monitor_pending(&server, 10_000).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = volume
        .copy_cancellable(
            &VirtualPath::new("/A/S"),
            &VirtualPath::new("/B"),
            "b.txt",
            &cancel,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::AsyncOpFailed);
    assert!(err.message.contains("cancelled"), "{}", err.message);
}

#[tokio::test]
async fn test_copy_onto_itself_is_rejected() {
    let (server, volume) = common::setup().await;
    common::mount_children(&server, "A", vec![common::file_json("S", "s.txt", 1)], 1).await;

    let dir = VirtualPath::new("/A");
    volume.list(&dir).await.unwrap();

    let err = volume
        .copy(&VirtualPath::new("/A/S"), &dir, "s.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::InvalidInput);
}
