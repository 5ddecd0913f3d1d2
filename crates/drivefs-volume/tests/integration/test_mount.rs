//! Integration tests for mounting and volume identity

use drivefs_core::domain::{FsErrorKind, FsOp, VirtualPath};
use drivefs_core::ports::VolumeDriver;
use drivefs_volume::{Collaborators, Volume};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_mount_drive_root() {
    let (_server, volume) = common::setup().await;

    assert_eq!(volume.driver_id(), "od");
    assert!(volume.root().is_root());
    assert_eq!(volume.root_name(), "OneDrive.com");
    assert_eq!(volume.disabled_commands(), &["archive", "extract"]);
}

#[tokio::test]
async fn test_mount_root_alias_spelling() {
    let server = MockServer::start().await;
    let config = common::builder(&server)
        .volume_path("root")
        .root_name("Cloud")
        .build();
    let volume = common::mount_with(&server, config).await;

    assert_eq!(volume.root(), &VirtualPath::root());
    assert_eq!(volume.root_name(), "Cloud");
}

#[tokio::test]
async fn test_mount_subfolder_named_after_folder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/items/PH"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::folder_json("PH", "Photos", 12)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = common::builder(&server).volume_path("/PH").build();
    let volume = common::mount_with(&server, config).await;

    assert_eq!(volume.root(), &VirtualPath::new("/PH"));
    assert_eq!(volume.root_name(), "Photos@OneDrive");
}

#[tokio::test]
async fn test_mount_configured_alias_wins() {
    let server = MockServer::start().await;
    let config = common::builder(&server)
        .volume_path("/PH")
        .alias("Holiday")
        .build();
    let volume = common::mount_with(&server, config).await;

    assert_eq!(volume.root_name(), "Holiday");
}

#[tokio::test]
async fn test_mount_without_usable_token_is_fatal() {
    let server = MockServer::start().await;
    let config = common::builder(&server).build();
    let client = common::client(&server, &config, common::expired_token_without_refresh());

    let err = Volume::mount(client, &config, Collaborators::default())
        .await
        .err()
        .expect("mount must fail");

    assert_eq!(err.kind(), FsErrorKind::Auth);
    assert_eq!(err.op, FsOp::Mount);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_operations() {
    let (_server, volume) = common::setup().await;
    let dir = VirtualPath::new("/A");

    let archive = volume
        .archive(&dir, &[VirtualPath::new("/A/F")], "a.zip")
        .await
        .unwrap_err();
    assert_eq!(archive.kind(), FsErrorKind::Unsupported);

    let extract = volume
        .extract(&VirtualPath::new("/A/a.zip"))
        .await
        .unwrap_err();
    assert_eq!(extract.kind(), FsErrorKind::Unsupported);

    let chmod = volume.chmod(&dir, 0o644).await.unwrap_err();
    assert_eq!(chmod.kind(), FsErrorKind::Unsupported);

    let symlink = volume
        .symlink(&VirtualPath::new("/A/F"), &dir, "link")
        .await
        .unwrap_err();
    assert_eq!(symlink.kind(), FsErrorKind::Unsupported);
}

#[tokio::test]
async fn test_path_helpers() {
    let (_server, volume) = common::setup().await;
    let path = volume.normalize_path("//A///B/");

    assert_eq!(path.as_str(), "/A/B");
    assert_eq!(volume.dirname(&path).as_str(), "/A");
    assert_eq!(volume.basename(&path).as_str(), "B");
    assert_eq!(
        volume
            .join_path(&VirtualPath::root(), &volume.basename(&path))
            .as_str(),
        "/B"
    );
}
