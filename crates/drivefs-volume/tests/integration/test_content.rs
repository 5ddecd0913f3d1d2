//! Integration tests for file content, share links and thumbnails

use drivefs_core::domain::VirtualPath;
use drivefs_core::ports::VolumeDriver;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_bytes, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_content_url_rewrites_share_link() {
    let (server, volume) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("F", "f.txt", 4)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/items/F/action.createLink"))
        .and(body_json(json!({ "type": "embed", "scope": "anonymous" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "link": { "type": "embed", "webUrl": "https://host/item?foo=bar" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = volume
        .content_url(&VirtualPath::new("/A/F"))
        .await
        .unwrap();
    assert_eq!(
        url.as_deref(),
        Some("https://onedrive.live.com/download.aspx?foo=bar")
    );
}

#[tokio::test]
async fn test_content_url_of_directory_is_none() {
    let (server, volume) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_json("D", "Docs", 1)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(volume.content_url(&VirtualPath::new("/D")).await.unwrap(), None);
}

#[tokio::test]
async fn test_get_contents_downloads_whole_file() {
    let (server, volume) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/F/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let content = volume.get_contents(&VirtualPath::new("/A/F")).await.unwrap();
    assert_eq!(content, b"hello world");
}

#[tokio::test]
async fn test_read_missing_file_is_not_found() {
    let (server, volume) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/GONE/content"))
        .respond_with(common::not_found())
        .mount(&server)
        .await;

    let err = volume
        .read(&VirtualPath::new("/A/GONE"))
        .await
        .err()
        .expect("read must fail");
    assert!(err.is_not_found());
    assert_eq!(err.message, "file not found");
}

#[tokio::test]
async fn test_put_contents_returns_new_stat() {
    let (server, volume) = common::setup().await;
    common::mount_children(&server, "A", vec![common::file_json("F", "f.txt", 1)], 2).await;

    Mock::given(method("PUT"))
        .and(path("/drive/items/F/content"))
        .and(body_bytes(b"updated".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("F", "f.txt", 7)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = VirtualPath::new("/A");
    volume.list(&dir).await.unwrap();

    let stat = volume
        .put_contents(&VirtualPath::new("/A/F"), b"updated".to_vec())
        .await
        .unwrap();
    assert_eq!(stat.size, Some(7));
    assert_eq!(stat.name, "f.txt");

    // The parent listing was invalidated and is fetched again
    assert!(volume.cache().cached(&dir).is_none());
    volume.list(&dir).await.unwrap();
}

#[tokio::test]
async fn test_thumbnails_created_once_and_purged_on_unmount() {
    let server = MockServer::start().await;
    let tmb = tempdir().unwrap();
    let config = common::builder(&server)
        .tmb_dir(tmb.path().to_path_buf())
        .build();
    let volume = common::mount_with(&server, config).await;

    Mock::given(method("GET"))
        .and(path("/drive/items/P"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::image_json("P", "p.png")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/items/P/thumbnails/0/medium/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let path = VirtualPath::new("/A/P");
    let first = volume.thumbnail(&path).await.unwrap().expect("thumbnail");
    assert!(first.starts_with("od"));
    assert!(first.ends_with(".png"));
    assert_eq!(std::fs::read(tmb.path().join(&first)).unwrap(), b"png");

    // The existing file is reused without another download
    let second = volume.thumbnail(&path).await.unwrap();
    assert_eq!(second.as_deref(), Some(first.as_str()));

    // Files of other mounts are left alone
    std::fs::write(tmb.path().join("other.png"), b"x").unwrap();

    assert_eq!(volume.unmount(), 1);
    assert!(!tmb.path().join(&first).exists());
    assert!(tmb.path().join("other.png").exists());
}

#[tokio::test]
async fn test_thumbnail_of_non_image_is_none() {
    let server = MockServer::start().await;
    let tmb = tempdir().unwrap();
    let config = common::builder(&server)
        .tmb_dir(tmb.path().to_path_buf())
        .build();
    let volume = common::mount_with(&server, config).await;

    Mock::given(method("GET"))
        .and(path("/drive/items/F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("F", "f.txt", 1)))
        .mount(&server)
        .await;

    assert_eq!(volume.thumbnail(&VirtualPath::new("/A/F")).await.unwrap(), None);
}

#[tokio::test]
async fn test_thumbnails_disabled_without_directory() {
    let (server, volume) = common::setup().await;

    assert_eq!(volume.thumbnail(&VirtualPath::new("/A/P")).await.unwrap(), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_evicts_thumbnail() {
    let server = MockServer::start().await;
    let tmb = tempdir().unwrap();
    let config = common::builder(&server)
        .tmb_dir(tmb.path().to_path_buf())
        .build();
    let volume = common::mount_with(&server, config).await;

    Mock::given(method("GET"))
        .and(path("/drive/items/P"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::image_json("P", "p.png")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/items/P/thumbnails/0/medium/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/drive/items/P"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let path = VirtualPath::new("/A/P");
    let name = volume.thumbnail(&path).await.unwrap().expect("thumbnail");
    assert!(tmb.path().join(&name).exists());

    assert!(volume.remove(&path, false).await.unwrap());
    assert!(!tmb.path().join(&name).exists());
}
